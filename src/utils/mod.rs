//! Utility functions shared by the pipeline stages.

pub mod cross_validation;
pub mod metrics;
pub mod stats;

pub use cross_validation::{cross_validate, CrossValOutcome, RepeatedKFold};
pub use metrics::{calculate_metrics, mae, r_squared, rmse, RegressionMetrics};
pub use stats::{mean, median, quantile, std_dev, variance};
