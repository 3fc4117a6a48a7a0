//! Expected slippage for an order against the current book.
//!
//! Untrained, the model uses a heuristic that weighs the spread and the
//! order's share of visible depth equally:
//!
//! ```text
//! slippage = 0.5 * spread_pct + 0.5 * (quantity / total_depth * 100)
//! ```
//!
//! Once trained it standardises the slippage feature vector and applies a
//! least-squares linear fit. Both modes clamp the result at zero.

use crate::error::TrainingError;
use crate::features::{BookFeatures, SLIPPAGE_FEATURES};
use crate::linalg::least_squares;
use crate::scaler::StandardScaler;
use crate::state::ModelCell;
use crate::training::SlippageSample;
use algo_cost_core::Snapshot;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Fitted slippage regression.
#[derive(Debug, Clone, PartialEq)]
pub struct SlippageParams {
    scaler: StandardScaler<SLIPPAGE_FEATURES>,
    intercept: f64,
    weights: [f64; SLIPPAGE_FEATURES],
}

impl SlippageParams {
    /// Raw (unclamped) prediction for one feature vector.
    #[must_use]
    pub fn predict(&self, features: &[f64; SLIPPAGE_FEATURES]) -> f64 {
        let x = self.scaler.transform(features);
        self.intercept + self.weights.iter().zip(&x).map(|(w, v)| w * v).sum::<f64>()
    }

    /// Regression intercept in standardised space.
    #[must_use]
    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Regression weights in standardised space.
    #[must_use]
    pub fn weights(&self) -> &[f64; SLIPPAGE_FEATURES] {
        &self.weights
    }
}

/// Slippage model with a heuristic fallback.
#[derive(Debug, Default)]
pub struct SlippageModel {
    state: ModelCell<SlippageParams>,
}

impl SlippageModel {
    /// Creates an untrained model.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Expected slippage in percent, `0.0` for a degenerate book.
    #[must_use]
    pub fn calculate(&self, snapshot: &Snapshot, quantity: f64) -> f64 {
        match BookFeatures::extract(snapshot, quantity) {
            Ok(features) => self.calculate_from_features(&features),
            Err(e) => {
                warn!(error = %e, quantity, "Slippage unavailable, using 0");
                0.0
            }
        }
    }

    /// Expected slippage in percent from pre-extracted features.
    #[must_use]
    pub fn calculate_from_features(&self, features: &BookFeatures) -> f64 {
        let slippage = match self.state.load() {
            Some(params) => {
                let predicted = params.predict(&features.slippage_vector());
                if predicted.is_finite() {
                    predicted
                } else {
                    warn!("Slippage regression produced a non-finite value, using heuristic");
                    heuristic(features)
                }
            }
            None => heuristic(features),
        };

        if slippage.is_finite() {
            slippage.max(0.0)
        } else {
            0.0
        }
    }

    /// Fits the regression and publishes it.
    ///
    /// On any failure the model reverts to untrained and the error is
    /// logged. Returns whether the model is trained afterwards.
    pub fn train(&self, samples: &[SlippageSample]) -> bool {
        let _writer = self.state.lock_writer();

        match Self::fit(samples) {
            Ok(params) => {
                debug!(intercept = params.intercept, weights = ?params.weights, "Slippage fit");
                self.state.publish(params);
                info!(samples = samples.len(), "Slippage model trained");
                true
            }
            Err(e) => {
                self.state.clear();
                error!(error = %e, samples = samples.len(), "Slippage training failed, using heuristic");
                false
            }
        }
    }

    /// Fits scaler and regression weights without touching model state.
    ///
    /// # Errors
    /// Returns [`TrainingError`] for empty input, unusable samples, or a
    /// numerically failed fit.
    pub fn fit(samples: &[SlippageSample]) -> Result<SlippageParams, TrainingError> {
        if samples.is_empty() {
            return Err(TrainingError::Empty);
        }

        let mut rows = Vec::with_capacity(samples.len());
        let mut targets = Vec::with_capacity(samples.len());
        for (index, sample) in samples.iter().enumerate() {
            let features = BookFeatures::extract(&sample.snapshot, sample.quantity)
                .map_err(|source| TrainingError::Sample { index, source })?;
            if !sample.actual_slippage.is_finite() {
                return Err(TrainingError::NonFiniteTarget(index));
            }
            rows.push(features.slippage_vector());
            targets.push(sample.actual_slippage);
        }

        let scaler = StandardScaler::fit(&rows).ok_or(TrainingError::Empty)?;
        if !scaler.is_finite() {
            return Err(TrainingError::Diverged);
        }
        let standardised: Vec<_> = rows.iter().map(|row| scaler.transform(row)).collect();
        let (intercept, weights) = least_squares(&standardised, &targets)?;

        Ok(SlippageParams {
            scaler,
            intercept,
            weights,
        })
    }

    /// Returns true if a fitted regression is in use.
    #[must_use]
    pub fn is_trained(&self) -> bool {
        self.state.is_set()
    }

    /// Current fitted parameters, if any.
    #[must_use]
    pub fn params(&self) -> Option<Arc<SlippageParams>> {
        self.state.load()
    }

    /// Discards the fit and returns to the heuristic.
    pub fn reset(&self) {
        let _writer = self.state.lock_writer();
        self.state.clear();
    }
}

fn heuristic(features: &BookFeatures) -> f64 {
    0.5 * features.spread_pct + 0.5 * (features.quantity_ratio * 100.0)
}
