//! Transaction-cost models over order book snapshots.
//!
//! - [`BookFeatures`]: one feature extraction per snapshot and quantity
//! - [`MarketImpactModel`]: Almgren-Chriss style impact, stateless
//! - [`SlippageModel`]: linear regression with a heuristic fallback
//! - [`MakerTakerModel`]: logistic classifier with a heuristic fallback
//!
//! Trainable models publish fitted parameters atomically through
//! [`ModelCell`], so `calculate` may run concurrently with `train`.

pub mod error;
pub mod features;
pub mod linalg;
pub mod maker_taker;
pub mod market_impact;
pub mod scaler;
pub mod slippage;
pub mod state;
pub mod training;

pub use error::{DomainError, TrainingError};
pub use features::{BookFeatures, MAKER_TAKER_FEATURES, SLIPPAGE_FEATURES};
pub use maker_taker::{ExecutionType, MakerTakerModel, MakerTakerParams, MakerTakerSplit};
pub use market_impact::{ImpactBreakdown, MarketImpactModel};
pub use scaler::StandardScaler;
pub use slippage::{SlippageModel, SlippageParams};
pub use state::ModelCell;
pub use training::{ExecutionSample, SlippageSample};
