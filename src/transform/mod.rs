//! Feature scaling transforms.
//!
//! The ensemble trainer fits a [`MinMaxScaler`] on each (segment, horizon)
//! training frame and persists it inside the trained model, so prediction
//! applies the exact training-time parameters and never refits.

use crate::core::Frame;
use crate::error::{PipelineError, Result};

/// Per-column min-max scaling parameters fitted on a training frame.
///
/// Maps each column linearly onto [0, 1] using the training minimum and
/// range. Constant columns use a unit range and map to 0.
#[derive(Debug, Clone, PartialEq)]
pub struct MinMaxScaler {
    columns: Vec<ColumnBounds>,
}

#[derive(Debug, Clone, PartialEq)]
struct ColumnBounds {
    name: String,
    min: f64,
    range: f64,
}

impl MinMaxScaler {
    /// Fit scaling bounds on every column of the frame.
    pub fn fit(frame: &Frame) -> Result<Self> {
        if frame.n_rows() == 0 || frame.n_cols() == 0 {
            return Err(PipelineError::EmptyData);
        }
        let columns = frame
            .names()
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let values = frame.column_at(i).unwrap_or(&[]);
                let min = values.iter().copied().fold(f64::INFINITY, f64::min);
                let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let range = max - min;
                ColumnBounds {
                    name: name.clone(),
                    min,
                    range: if range < 1e-10 { 1.0 } else { range },
                }
            })
            .collect();
        Ok(Self { columns })
    }

    /// Transform a frame with the fitted bounds. The frame must contain
    /// every fitted column; extra columns are an error so training and
    /// prediction layouts cannot drift apart silently.
    pub fn transform(&self, frame: &Frame) -> Result<Frame> {
        if frame.n_cols() != self.columns.len() {
            return Err(PipelineError::DimensionMismatch {
                expected: self.columns.len(),
                got: frame.n_cols(),
            });
        }
        let mut out = Frame::new(frame.ids().to_vec());
        for bounds in &self.columns {
            let values = frame.column(&bounds.name).ok_or_else(|| {
                PipelineError::InvalidParameter(format!(
                    "column '{}' missing from frame to transform",
                    bounds.name
                ))
            })?;
            let scaled: Vec<f64> = values
                .iter()
                .map(|&x| (x - bounds.min) / bounds.range)
                .collect();
            out.push_column(bounds.name.clone(), scaled)?;
        }
        Ok(out)
    }

    /// Names of the fitted columns, in fit order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}
