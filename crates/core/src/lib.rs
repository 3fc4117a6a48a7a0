pub mod config;
pub mod config_loader;
pub mod config_watcher;
pub mod fee_schedule;
pub mod order;
pub mod snapshot;
pub mod traits;

pub use config::{AppConfig, FeedConfig, DEFAULT_FEED_URL};
pub use config_loader::ConfigLoader;
pub use config_watcher::ConfigWatcher;
pub use fee_schedule::FeeSchedule;
pub use order::{OrderParams, OrderParamsError, MAX_ORDER_QUANTITY, MIN_ORDER_QUANTITY};
pub use snapshot::{BookSide, PriceLevel, Snapshot, SnapshotError};
pub use traits::SnapshotSubscriber;
