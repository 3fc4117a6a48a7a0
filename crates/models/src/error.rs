//! Errors raised inside the cost models.
//!
//! Neither kind escapes the public `calculate`/`train` entry points: a
//! [`DomainError`] turns into the model's safe default and a
//! [`TrainingError`] leaves the model untrained. Both are returned by the
//! lower-level `estimate`/`fit` functions for callers that want the reason.

use thiserror::Error;

/// Degenerate input for feature extraction or a model formula.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// One side of the book has no levels.
    #[error("order book has an empty side")]
    EmptyBook,

    /// Total notional depth is zero.
    #[error("total book depth is zero")]
    ZeroDepth,

    /// Quantity is zero, negative, or not finite.
    #[error("quantity must be positive and finite, got {0}")]
    NonPositiveQuantity(f64),

    /// Volatility outside [0, 1].
    #[error("volatility {0} outside [0, 1]")]
    Volatility(f64),

    /// Execution horizon is not positive.
    #[error("execution horizon {0} is not positive")]
    Horizon(f64),

    /// A formula produced NaN or infinity.
    #[error("non-finite result in {0}")]
    NonFinite(&'static str),
}

/// Training data that cannot produce a usable model.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TrainingError {
    /// No samples were provided.
    #[error("no training samples")]
    Empty,

    /// A sample could not be turned into features.
    #[error("sample {index}: {source}")]
    Sample {
        /// Sample position in the batch
        index: usize,
        /// Why feature extraction failed
        #[source]
        source: DomainError,
    },

    /// A target value is NaN or infinite.
    #[error("sample {0} has a non-finite target")]
    NonFiniteTarget(usize),

    /// All samples carry the same execution label.
    #[error("training samples contain a single class")]
    SingleClass,

    /// The normal equations could not be solved.
    #[error("least squares system is singular")]
    Singular,

    /// Fitted parameters contain NaN or infinity.
    #[error("fit diverged")]
    Diverged,
}
