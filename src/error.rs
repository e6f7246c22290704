//! Error types for the merchant-forecast pipeline.

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that can occur while running the forecasting pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Input data is empty.
    #[error("empty input data")]
    EmptyData,

    /// Insufficient data points for the operation.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Dimension mismatch between data structures.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// A merchant id is present in one input table but missing from the other.
    #[error("coverage violation: merchant {id} missing from {missing_from} table")]
    CoverageViolation { id: u64, missing_from: &'static str },

    /// Both imputation estimators failed for a cell of a merchant's series.
    #[error("imputation failed for merchant {id} at month {month}")]
    ImputationFailure { id: u64, month: usize },

    /// Clustering produced an empty segment or a degenerate cluster-count search.
    #[error("segmentation failure: {0}")]
    SegmentationFailure(String),

    /// Feature selection kept zero predictors for a (segment, horizon) job.
    #[error("no qualifying predictors for segment {segment}, horizon {horizon}")]
    NoQualifyingPredictors { segment: usize, horizon: usize },

    /// A single (segment, horizon) training job failed; siblings are unaffected.
    #[error("training failed for segment {segment}, horizon {horizon}: {cause}")]
    TrainingFailure {
        segment: usize,
        horizon: usize,
        cause: String,
    },

    /// One or more (segment, horizon) jobs failed; no partial table is emitted.
    #[error("{} (segment, horizon) jobs failed", pairs.len())]
    JobFailures { pairs: Vec<(usize, usize)> },

    /// Model has not been fitted yet.
    #[error("model must be fitted before prediction")]
    FitRequired,

    /// Computation error (e.g. numerical issues or singular fits).
    #[error("computation error: {0}")]
    ComputationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_descriptive() {
        let err = PipelineError::EmptyData;
        assert_eq!(err.to_string(), "empty input data");

        let err = PipelineError::CoverageViolation {
            id: 42,
            missing_from: "registration",
        };
        assert_eq!(
            err.to_string(),
            "coverage violation: merchant 42 missing from registration table"
        );

        let err = PipelineError::ImputationFailure { id: 7, month: 13 };
        assert_eq!(err.to_string(), "imputation failed for merchant 7 at month 13");

        let err = PipelineError::NoQualifyingPredictors {
            segment: 2,
            horizon: 3,
        };
        assert_eq!(
            err.to_string(),
            "no qualifying predictors for segment 2, horizon 3"
        );

        let err = PipelineError::JobFailures {
            pairs: vec![(0, 1), (1, 2)],
        };
        assert_eq!(err.to_string(), "2 (segment, horizon) jobs failed");
    }

    #[test]
    fn errors_are_clonable_and_comparable() {
        let err1 = PipelineError::FitRequired;
        let err2 = err1.clone();
        assert_eq!(err1, err2);
    }
}
