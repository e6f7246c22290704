//! Elastic net linear regression by cyclic coordinate descent.
//!
//! Standardizes predictors internally, fits on the standardized scale, and
//! folds the scaling back into the coefficients so prediction is a plain
//! dot product. The L1/L2 mix and overall penalty are grid-tunable by the
//! ensemble trainer.

use crate::error::{PipelineError, Result};
use crate::models::Regressor;

/// Elastic net hyperparameters.
#[derive(Debug, Clone)]
pub struct ElasticNetConfig {
    /// Overall penalty strength.
    pub alpha: f64,
    /// L1 share of the penalty; 0 is ridge, 1 is lasso.
    pub l1_ratio: f64,
    /// Coordinate descent sweep cap.
    pub max_iter: usize,
    /// Convergence tolerance on the largest coefficient update.
    pub tolerance: f64,
}

impl Default for ElasticNetConfig {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            l1_ratio: 0.5,
            max_iter: 1000,
            tolerance: 1e-6,
        }
    }
}

impl ElasticNetConfig {
    /// Set the penalty strength.
    pub fn alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha.max(0.0);
        self
    }

    /// Set the L1 share of the penalty.
    pub fn l1_ratio(mut self, l1_ratio: f64) -> Self {
        self.l1_ratio = l1_ratio.clamp(0.0, 1.0);
        self
    }
}

/// Elastic net regressor.
#[derive(Debug, Clone)]
pub struct ElasticNet {
    config: ElasticNetConfig,
    coefficients: Option<Vec<f64>>,
    intercept: f64,
}

impl ElasticNet {
    pub fn new(config: ElasticNetConfig) -> Self {
        Self {
            config,
            coefficients: None,
            intercept: 0.0,
        }
    }

    /// Fitted coefficients on the original predictor scale.
    pub fn coefficients(&self) -> Option<&[f64]> {
        self.coefficients.as_deref()
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

impl Default for ElasticNet {
    fn default() -> Self {
        Self::new(ElasticNetConfig::default())
    }
}

fn soft_threshold(z: f64, gamma: f64) -> f64 {
    if z > gamma {
        z - gamma
    } else if z < -gamma {
        z + gamma
    } else {
        0.0
    }
}

impl Regressor for ElasticNet {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        let n = x.len();
        if n == 0 {
            return Err(PipelineError::EmptyData);
        }
        if y.len() != n {
            return Err(PipelineError::DimensionMismatch {
                expected: n,
                got: y.len(),
            });
        }
        let p = x[0].len();
        if x.iter().any(|row| row.len() != p) {
            return Err(PipelineError::DimensionMismatch {
                expected: p,
                got: x.iter().map(|r| r.len()).find(|&l| l != p).unwrap_or(p),
            });
        }

        // Standardize each predictor; a constant column stays at zero weight
        let nf = n as f64;
        let means: Vec<f64> = (0..p).map(|j| x.iter().map(|r| r[j]).sum::<f64>() / nf).collect();
        let stds: Vec<f64> = (0..p)
            .map(|j| {
                let v = x.iter().map(|r| (r[j] - means[j]).powi(2)).sum::<f64>() / nf;
                v.sqrt()
            })
            .collect();
        let y_mean = y.iter().sum::<f64>() / nf;

        let z: Vec<Vec<f64>> = x
            .iter()
            .map(|row| {
                (0..p)
                    .map(|j| {
                        if stds[j] > 1e-12 {
                            (row[j] - means[j]) / stds[j]
                        } else {
                            0.0
                        }
                    })
                    .collect()
            })
            .collect();
        let yc: Vec<f64> = y.iter().map(|&v| v - y_mean).collect();

        let alpha = self.config.alpha;
        let l1 = alpha * self.config.l1_ratio;
        let l2 = alpha * (1.0 - self.config.l1_ratio);

        let mut beta = vec![0.0; p];
        let mut residuals = yc.clone();

        for _ in 0..self.config.max_iter {
            let mut max_delta: f64 = 0.0;
            for j in 0..p {
                if stds[j] <= 1e-12 {
                    continue;
                }
                let old = beta[j];
                // Partial residual correlation with standardized column j
                let rho: f64 = z
                    .iter()
                    .zip(residuals.iter())
                    .map(|(row, &r)| row[j] * (r + row[j] * old))
                    .sum::<f64>()
                    / nf;
                let updated = soft_threshold(rho, l1) / (1.0 + l2);
                if updated != old {
                    let delta = updated - old;
                    for (row, r) in z.iter().zip(residuals.iter_mut()) {
                        *r -= row[j] * delta;
                    }
                    max_delta = max_delta.max(delta.abs());
                    beta[j] = updated;
                }
            }
            if max_delta < self.config.tolerance {
                break;
            }
        }

        // Fold the standardization back into original-scale coefficients
        let coefficients: Vec<f64> = (0..p)
            .map(|j| if stds[j] > 1e-12 { beta[j] / stds[j] } else { 0.0 })
            .collect();
        self.intercept = y_mean
            - coefficients
                .iter()
                .zip(means.iter())
                .map(|(&c, &m)| c * m)
                .sum::<f64>();
        self.coefficients = Some(coefficients);
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        let coefficients = self.coefficients.as_ref().ok_or(PipelineError::FitRequired)?;
        x.iter()
            .map(|row| {
                if row.len() != coefficients.len() {
                    return Err(PipelineError::DimensionMismatch {
                        expected: coefficients.len(),
                        got: row.len(),
                    });
                }
                Ok(self.intercept
                    + row
                        .iter()
                        .zip(coefficients.iter())
                        .map(|(&v, &c)| v * c)
                        .sum::<f64>())
            })
            .collect()
    }

    fn name(&self) -> &str {
        "elastic_net"
    }
}
