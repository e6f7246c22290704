//! K-nearest-neighbor regression with inverse-distance weighting.

use crate::error::{PipelineError, Result};
use crate::models::Regressor;
use crate::segment::kmeans::euclidean_distance;

/// Memorizes the training set and predicts the inverse-distance weighted
/// average of the `k` nearest training outcomes. An exact match (distance
/// zero) returns the matching outcomes directly.
#[derive(Debug, Clone)]
pub struct KnnRegressor {
    k: usize,
    train_x: Option<Vec<Vec<f64>>>,
    train_y: Vec<f64>,
}

impl KnnRegressor {
    pub fn new(k: usize) -> Self {
        Self {
            k: k.max(1),
            train_x: None,
            train_y: Vec::new(),
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }
}

impl Regressor for KnnRegressor {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        if x.is_empty() {
            return Err(PipelineError::EmptyData);
        }
        if y.len() != x.len() {
            return Err(PipelineError::DimensionMismatch {
                expected: x.len(),
                got: y.len(),
            });
        }
        self.train_x = Some(x.to_vec());
        self.train_y = y.to_vec();
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        let train_x = self.train_x.as_ref().ok_or(PipelineError::FitRequired)?;
        let k = self.k.min(train_x.len());

        x.iter()
            .map(|row| {
                if row.len() != train_x[0].len() {
                    return Err(PipelineError::DimensionMismatch {
                        expected: train_x[0].len(),
                        got: row.len(),
                    });
                }
                let mut distances: Vec<(f64, f64)> = train_x
                    .iter()
                    .zip(self.train_y.iter())
                    .map(|(t, &y)| (euclidean_distance(row, t), y))
                    .collect();
                distances.sort_by(|a, b| {
                    a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal)
                });
                distances.truncate(k);

                // Exact matches short-circuit the weighting
                let exact: Vec<f64> = distances
                    .iter()
                    .filter(|(d, _)| *d < 1e-12)
                    .map(|&(_, y)| y)
                    .collect();
                if !exact.is_empty() {
                    return Ok(exact.iter().sum::<f64>() / exact.len() as f64);
                }

                let mut weight_sum = 0.0;
                let mut value_sum = 0.0;
                for &(d, y) in &distances {
                    let w = 1.0 / (d + 1e-10);
                    weight_sum += w;
                    value_sum += w * y;
                }
                Ok(value_sum / weight_sum)
            })
            .collect()
    }

    fn name(&self) -> &str {
        "knn"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn exact_match_returns_training_outcome() {
        let x = vec![vec![1.0, 1.0], vec![5.0, 5.0], vec![9.0, 9.0]];
        let y = vec![10.0, 50.0, 90.0];
        let mut model = KnnRegressor::new(2);
        model.fit(&x, &y).unwrap();

        let predictions = model.predict(&[vec![5.0, 5.0]]).unwrap();
        assert_relative_eq!(predictions[0], 50.0, epsilon = 1e-9);
    }

    #[test]
    fn nearby_query_stays_between_neighbors() {
        let x = vec![vec![0.0], vec![10.0]];
        let y = vec![0.0, 100.0];
        let mut model = KnnRegressor::new(2);
        model.fit(&x, &y).unwrap();

        let predictions = model.predict(&[vec![2.0]]).unwrap();
        assert!(predictions[0] > 0.0 && predictions[0] < 100.0);
        // Closer to the left neighbor, so below the midpoint
        assert!(predictions[0] < 50.0);
    }

    #[test]
    fn k_clamps_to_training_size() {
        let x = vec![vec![1.0], vec![2.0]];
        let y = vec![1.0, 2.0];
        let mut model = KnnRegressor::new(9);
        model.fit(&x, &y).unwrap();
        assert!(model.predict(&[vec![1.5]]).is_ok());
    }

    #[test]
    fn predict_before_fit_fails() {
        let model = KnnRegressor::new(3);
        assert!(matches!(
            model.predict(&[vec![1.0]]),
            Err(PipelineError::FitRequired)
        ));
    }
}
