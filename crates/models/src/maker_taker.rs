//! Probability that an order executes as maker versus taker.
//!
//! Untrained, a heuristic favours maker execution for wide spreads and
//! small orders:
//!
//! ```text
//! maker = clamp(50 + 2 * spread_pct - 100 * quantity_ratio, 0, 100)
//! taker = 100 - maker
//! ```
//!
//! Trained, a binary logistic regression over the standardised maker/taker
//! feature vector gives `P(taker)`; maker is the complement. Any failure
//! yields an even 50/50 split.

use crate::error::TrainingError;
use crate::features::{BookFeatures, MAKER_TAKER_FEATURES};
use crate::scaler::StandardScaler;
use crate::state::ModelCell;
use crate::training::ExecutionSample;
use algo_cost_core::Snapshot;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Inverse L2 regularisation strength.
const C: f64 = 1.0;
/// Gradient descent stops once every gradient component is below this.
const GRADIENT_TOLERANCE: f64 = 1e-6;
/// Gradient descent iteration cap.
const MAX_ITERATIONS: usize = 5_000;

/// How an order executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionType {
    /// Rested on the book and added liquidity.
    Maker,
    /// Crossed the spread and removed liquidity.
    Taker,
}

impl ExecutionType {
    /// Class label: 0 for maker, 1 for taker.
    #[must_use]
    pub fn label(self) -> f64 {
        match self {
            Self::Maker => 0.0,
            Self::Taker => 1.0,
        }
    }
}

/// Execution split in percent. `maker_pct + taker_pct == 100`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MakerTakerSplit {
    /// Chance of maker execution
    pub maker_pct: f64,
    /// Chance of taker execution
    pub taker_pct: f64,
}

impl MakerTakerSplit {
    /// Even split used when no estimate is possible.
    pub const NEUTRAL: Self = Self {
        maker_pct: 50.0,
        taker_pct: 50.0,
    };

    /// Builds a split from a maker percentage, clamped to [0, 100].
    ///
    /// Non-finite input gives [`MakerTakerSplit::NEUTRAL`].
    #[must_use]
    pub fn from_maker_pct(maker_pct: f64) -> Self {
        if !maker_pct.is_finite() {
            return Self::NEUTRAL;
        }
        let maker_pct = maker_pct.clamp(0.0, 100.0);
        Self {
            maker_pct,
            taker_pct: 100.0 - maker_pct,
        }
    }
}

impl Default for MakerTakerSplit {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// Fitted logistic regression.
#[derive(Debug, Clone, PartialEq)]
pub struct MakerTakerParams {
    scaler: StandardScaler<MAKER_TAKER_FEATURES>,
    intercept: f64,
    weights: [f64; MAKER_TAKER_FEATURES],
    iterations: usize,
}

impl MakerTakerParams {
    /// `P(taker)` for one feature vector.
    #[must_use]
    pub fn taker_probability(&self, features: &[f64; MAKER_TAKER_FEATURES]) -> f64 {
        let x = self.scaler.transform(features);
        sigmoid(self.intercept + dot(&self.weights, &x))
    }

    /// Gradient descent iterations used by the fit.
    #[must_use]
    pub fn iterations(&self) -> usize {
        self.iterations
    }
}

/// Maker/taker model with a heuristic fallback.
#[derive(Debug, Default)]
pub struct MakerTakerModel {
    state: ModelCell<MakerTakerParams>,
}

impl MakerTakerModel {
    /// Creates an untrained model.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Execution split, 50/50 for a degenerate book.
    #[must_use]
    pub fn calculate(&self, snapshot: &Snapshot, quantity: f64) -> MakerTakerSplit {
        match BookFeatures::extract(snapshot, quantity) {
            Ok(features) => self.calculate_from_features(&features),
            Err(e) => {
                warn!(error = %e, quantity, "Maker/taker unavailable, using 50/50");
                MakerTakerSplit::NEUTRAL
            }
        }
    }

    /// Execution split from pre-extracted features.
    #[must_use]
    pub fn calculate_from_features(&self, features: &BookFeatures) -> MakerTakerSplit {
        let maker_pct = match self.state.load() {
            Some(params) => {
                let taker = params.taker_probability(&features.maker_taker_vector());
                (1.0 - taker) * 100.0
            }
            None => 50.0 + features.spread_pct * 2.0 - features.quantity_ratio * 100.0,
        };

        if !maker_pct.is_finite() {
            warn!("Maker/taker produced a non-finite value, using 50/50");
        }
        MakerTakerSplit::from_maker_pct(maker_pct)
    }

    /// Fits the classifier and publishes it.
    ///
    /// On any failure the model reverts to untrained and the error is
    /// logged. Returns whether the model is trained afterwards.
    pub fn train(&self, samples: &[ExecutionSample]) -> bool {
        let _writer = self.state.lock_writer();

        match Self::fit(samples) {
            Ok(params) => {
                debug!(
                    intercept = params.intercept,
                    weights = ?params.weights,
                    iterations = params.iterations,
                    "Maker/taker fit"
                );
                self.state.publish(params);
                info!(samples = samples.len(), "Maker/taker model trained");
                true
            }
            Err(e) => {
                self.state.clear();
                error!(error = %e, samples = samples.len(), "Maker/taker training failed, using heuristic");
                false
            }
        }
    }

    /// Fits scaler and logistic weights without touching model state.
    ///
    /// Minimises mean log-loss plus `||w||^2 / (2 C n)` by batch gradient
    /// descent. The intercept is not penalised.
    ///
    /// # Errors
    /// Returns [`TrainingError`] for empty input, unusable samples, a single
    /// class, or a diverged fit.
    pub fn fit(samples: &[ExecutionSample]) -> Result<MakerTakerParams, TrainingError> {
        if samples.is_empty() {
            return Err(TrainingError::Empty);
        }

        let mut rows = Vec::with_capacity(samples.len());
        let mut labels = Vec::with_capacity(samples.len());
        for (index, sample) in samples.iter().enumerate() {
            let features = BookFeatures::extract(&sample.snapshot, sample.quantity)
                .map_err(|source| TrainingError::Sample { index, source })?;
            rows.push(features.maker_taker_vector());
            labels.push(sample.execution.label());
        }

        let takers = labels.iter().filter(|&&y| y > 0.5).count();
        if takers == 0 || takers == labels.len() {
            return Err(TrainingError::SingleClass);
        }

        let scaler = StandardScaler::fit(&rows).ok_or(TrainingError::Empty)?;
        if !scaler.is_finite() {
            return Err(TrainingError::Diverged);
        }
        let x: Vec<_> = rows.iter().map(|row| scaler.transform(row)).collect();

        let n = x.len() as f64;
        let penalty = 1.0 / (C * n);
        // Lipschitz bound of the gradient for standardised inputs.
        let step = 1.0 / (0.25 * (MAKER_TAKER_FEATURES as f64 + 1.0) + penalty);

        let mut intercept = 0.0;
        let mut weights = [0.0; MAKER_TAKER_FEATURES];
        let mut iterations = 0;

        while iterations < MAX_ITERATIONS {
            iterations += 1;

            let mut grad_b = 0.0;
            let mut grad_w = [0.0; MAKER_TAKER_FEATURES];
            for (row, &y) in x.iter().zip(&labels) {
                let residual = sigmoid(intercept + dot(&weights, row)) - y;
                grad_b += residual;
                for (g, v) in grad_w.iter_mut().zip(row) {
                    *g += residual * v;
                }
            }
            grad_b /= n;
            for (g, w) in grad_w.iter_mut().zip(&weights) {
                *g = *g / n + penalty * w;
            }

            let max_grad = grad_w.iter().fold(grad_b.abs(), |m, g| m.max(g.abs()));
            if !max_grad.is_finite() {
                return Err(TrainingError::Diverged);
            }
            if max_grad < GRADIENT_TOLERANCE {
                break;
            }

            intercept -= step * grad_b;
            for (w, g) in weights.iter_mut().zip(&grad_w) {
                *w -= step * g;
            }
        }

        if !intercept.is_finite() || weights.iter().any(|w| !w.is_finite()) {
            return Err(TrainingError::Diverged);
        }
        if iterations == MAX_ITERATIONS {
            debug!(iterations, "Maker/taker fit hit the iteration cap");
        }

        Ok(MakerTakerParams {
            scaler,
            intercept,
            weights,
            iterations,
        })
    }

    /// Returns true if a fitted classifier is in use.
    #[must_use]
    pub fn is_trained(&self) -> bool {
        self.state.is_set()
    }

    /// Current fitted parameters, if any.
    #[must_use]
    pub fn params(&self) -> Option<Arc<MakerTakerParams>> {
        self.state.load()
    }

    /// Discards the fit and returns to the heuristic.
    pub fn reset(&self) {
        let _writer = self.state.lock_writer();
        self.state.clear();
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn dot(a: &[f64; MAKER_TAKER_FEATURES], b: &[f64; MAKER_TAKER_FEATURES]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
