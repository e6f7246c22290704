//! Column-oriented feature frames keyed by merchant id.

use crate::core::MerchantId;
use crate::error::{PipelineError, Result};

/// A column-oriented table of named f64 feature columns, with one row per
/// merchant. Row order is fixed at construction and shared by every column.
#[derive(Debug, Clone)]
pub struct Frame {
    ids: Vec<MerchantId>,
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl Frame {
    /// Create an empty frame over the given row keys.
    pub fn new(ids: Vec<MerchantId>) -> Self {
        Self {
            ids,
            names: Vec::new(),
            columns: Vec::new(),
        }
    }

    /// Append a named column; its length must match the row count.
    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        if values.len() != self.ids.len() {
            return Err(PipelineError::DimensionMismatch {
                expected: self.ids.len(),
                got: values.len(),
            });
        }
        let name = name.into();
        if self.names.contains(&name) {
            return Err(PipelineError::InvalidParameter(format!(
                "duplicate column name '{name}'"
            )));
        }
        self.names.push(name);
        self.columns.push(values);
        Ok(())
    }

    pub fn n_rows(&self) -> usize {
        self.ids.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// Row keys in frame order.
    pub fn ids(&self) -> &[MerchantId] {
        &self.ids
    }

    /// Column names in frame order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// A column by name.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.columns[i].as_slice())
    }

    /// A column by position.
    pub fn column_at(&self, index: usize) -> Option<&[f64]> {
        self.columns.get(index).map(|c| c.as_slice())
    }

    /// One row as a dense vector, in column order.
    pub fn row(&self, index: usize) -> Vec<f64> {
        self.columns.iter().map(|c| c[index]).collect()
    }

    /// All rows as dense vectors, in column order.
    pub fn rows(&self) -> Vec<Vec<f64>> {
        (0..self.n_rows()).map(|i| self.row(i)).collect()
    }

    /// A new frame containing only the named columns, in the given order.
    pub fn select(&self, names: &[String]) -> Result<Frame> {
        let mut out = Frame::new(self.ids.clone());
        for name in names {
            let column = self.column(name).ok_or_else(|| {
                PipelineError::InvalidParameter(format!("unknown column '{name}'"))
            })?;
            out.push_column(name.clone(), column.to_vec())?;
        }
        Ok(out)
    }
}

/// A feature frame plus the outcome column, for one (segment, horizon) pair.
/// Built fresh per pair and never shared across jobs.
#[derive(Debug, Clone)]
pub struct TrainingFrame {
    pub features: Frame,
    pub outcome: Vec<f64>,
}

impl TrainingFrame {
    pub fn new(features: Frame, outcome: Vec<f64>) -> Result<Self> {
        if outcome.len() != features.n_rows() {
            return Err(PipelineError::DimensionMismatch {
                expected: features.n_rows(),
                got: outcome.len(),
            });
        }
        Ok(Self { features, outcome })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: u64) -> Vec<MerchantId> {
        (1..=n).map(MerchantId).collect()
    }

    #[test]
    fn push_and_read_columns() {
        let mut frame = Frame::new(ids(3));
        frame.push_column("a", vec![1.0, 2.0, 3.0]).unwrap();
        frame.push_column("b", vec![4.0, 5.0, 6.0]).unwrap();

        assert_eq!(frame.n_rows(), 3);
        assert_eq!(frame.n_cols(), 2);
        assert_eq!(frame.column("a"), Some(&[1.0, 2.0, 3.0][..]));
        assert_eq!(frame.row(1), vec![2.0, 5.0]);
    }

    #[test]
    fn rejects_wrong_length_column() {
        let mut frame = Frame::new(ids(3));
        assert!(frame.push_column("a", vec![1.0]).is_err());
    }

    #[test]
    fn rejects_duplicate_names() {
        let mut frame = Frame::new(ids(2));
        frame.push_column("a", vec![1.0, 2.0]).unwrap();
        assert!(frame.push_column("a", vec![3.0, 4.0]).is_err());
    }

    #[test]
    fn select_preserves_order_and_ids() {
        let mut frame = Frame::new(ids(2));
        frame.push_column("a", vec![1.0, 2.0]).unwrap();
        frame.push_column("b", vec![3.0, 4.0]).unwrap();
        frame.push_column("c", vec![5.0, 6.0]).unwrap();

        let picked = frame.select(&["c".to_string(), "a".to_string()]).unwrap();
        assert_eq!(picked.names(), &["c".to_string(), "a".to_string()]);
        assert_eq!(picked.row(0), vec![5.0, 1.0]);
        assert_eq!(picked.ids(), frame.ids());

        assert!(frame.select(&["missing".to_string()]).is_err());
    }

    #[test]
    fn training_frame_checks_outcome_length() {
        let mut frame = Frame::new(ids(2));
        frame.push_column("a", vec![1.0, 2.0]).unwrap();

        assert!(TrainingFrame::new(frame.clone(), vec![1.0]).is_err());
        assert!(TrainingFrame::new(frame, vec![1.0, 2.0]).is_ok());
    }
}
