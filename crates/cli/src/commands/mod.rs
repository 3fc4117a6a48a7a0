//! CLI commands for the cost estimator.

pub mod estimate;
pub mod run;
pub mod samples;

pub use estimate::{run_estimate, EstimateArgs};
pub use run::{run_stream, RunArgs};
