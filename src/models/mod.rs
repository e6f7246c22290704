//! Regression models for the stacked ensemble.
//!
//! Two base learners (elastic net, k-nearest-neighbor) produce out-of-fold
//! predictions under repeated cross-validation; a shallow gradient-boosted
//! stacker combines them. Every model implements the same [`Regressor`]
//! trait so the cross-validation driver stays model-agnostic.

pub mod elastic_net;
pub mod ensemble;
pub mod gbt;
pub mod knn;

pub use elastic_net::{ElasticNet, ElasticNetConfig};
pub use ensemble::{EnsembleModel, TrainerConfig};
pub use gbt::{GradientBoosting, GradientBoostingConfig};
pub use knn::KnnRegressor;

use crate::error::Result;

/// Common interface for trainable regression models.
pub trait Regressor {
    /// Fit the model on a design matrix and outcome vector.
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()>;

    /// Predict outcomes for new rows. Fails with `FitRequired` before `fit`.
    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>>;

    /// Short model name for logs and reports.
    fn name(&self) -> &str;
}
