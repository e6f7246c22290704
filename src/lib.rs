//! # merchant-forecast
//!
//! Forecasts per-merchant monthly transaction volume (TPV) several months
//! ahead from each merchant's own gappy monthly history plus static
//! registration attributes.
//!
//! The pipeline runs in explicit stages, each consuming only the previous
//! stage's immutable output: registration-based segmentation, two-estimator
//! missing-value imputation, per-horizon dataset assembly, automated
//! predictor selection, and a stacked two-base-learner ensemble trained
//! independently for every (segment, horizon) pair.

#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]
#![allow(clippy::needless_range_loop)]

pub mod core;
pub mod dataset;
pub mod error;
pub mod features;
pub mod impute;
pub mod models;
pub mod pipeline;
pub mod segment;
pub mod transform;
pub mod utils;

pub use error::{PipelineError, Result};

pub mod prelude {
    pub use crate::core::{
        CompletedPanel, Frame, MerchantAttributes, MerchantId, MonthlySeries, SeriesPanel,
        TrainingFrame,
    };
    pub use crate::error::{PipelineError, Result};
    pub use crate::models::{EnsembleModel, Regressor};
    pub use crate::pipeline::{ForecastTable, Pipeline, PipelineConfig, PipelineOutcome};
    pub use crate::segment::{SegmentAssignment, Segmenter, SegmenterConfig};
}
