//! Repeated k-fold cross-validation for the ensemble base and meta learners.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{PipelineError, Result};
use crate::models::Regressor;
use crate::utils::metrics::{calculate_metrics, RegressionMetrics};

/// Repeated k-fold scheme. Fold assignment is shuffled with a seed derived
/// from `seed` and the repeat number, so the same seed always produces the
/// same folds.
#[derive(Debug, Clone)]
pub struct RepeatedKFold {
    /// Number of folds per repeat.
    pub n_folds: usize,
    /// Number of independent repeats.
    pub n_repeats: usize,
    /// Base seed for fold shuffling.
    pub seed: u64,
}

impl Default for RepeatedKFold {
    fn default() -> Self {
        Self {
            n_folds: 10,
            n_repeats: 3,
            seed: 0,
        }
    }
}

impl RepeatedKFold {
    pub fn new(n_folds: usize, n_repeats: usize, seed: u64) -> Self {
        Self {
            n_folds,
            n_repeats,
            seed,
        }
    }

    /// Set the base seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Fold index sets for one repeat: `(train_indices, test_indices)` per
    /// fold. The fold count is clamped to the sample count.
    pub fn folds(&self, n: usize, repeat: usize) -> Vec<(Vec<usize>, Vec<usize>)> {
        let k = self.n_folds.clamp(2, n.max(2)).min(n);
        let mut indices: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(repeat as u64));
        indices.shuffle(&mut rng);

        let mut folds = Vec::with_capacity(k);
        for fold in 0..k {
            let test: Vec<usize> = indices
                .iter()
                .enumerate()
                .filter(|(i, _)| i % k == fold)
                .map(|(_, &idx)| idx)
                .collect();
            let train: Vec<usize> = indices
                .iter()
                .enumerate()
                .filter(|(i, _)| i % k != fold)
                .map(|(_, &idx)| idx)
                .collect();
            folds.push((train, test));
        }
        folds
    }
}

/// Result of cross-validating one model.
#[derive(Debug, Clone)]
pub struct CrossValOutcome {
    /// Out-of-fold predictions per sample, averaged across repeats.
    pub oof: Vec<f64>,
    /// Metrics of the averaged out-of-fold predictions against the outcome.
    pub metrics: RegressionMetrics,
}

/// Cross-validate a regressor under the repeated k-fold scheme.
///
/// Every sample is predicted exactly once per repeat by a model that never
/// saw it; predictions are averaged across repeats. The factory must return
/// a fresh unfitted model for each fold.
pub fn cross_validate<R, F>(
    x: &[Vec<f64>],
    y: &[f64],
    cv: &RepeatedKFold,
    factory: F,
) -> Result<CrossValOutcome>
where
    R: Regressor,
    F: Fn() -> R,
{
    let n = y.len();
    if n < 2 {
        return Err(PipelineError::InsufficientData { needed: 2, got: n });
    }
    if x.len() != n {
        return Err(PipelineError::DimensionMismatch {
            expected: n,
            got: x.len(),
        });
    }

    let mut oof_sum = vec![0.0; n];
    for repeat in 0..cv.n_repeats.max(1) {
        for (train_idx, test_idx) in cv.folds(n, repeat) {
            let train_x: Vec<Vec<f64>> = train_idx.iter().map(|&i| x[i].clone()).collect();
            let train_y: Vec<f64> = train_idx.iter().map(|&i| y[i]).collect();
            let test_x: Vec<Vec<f64>> = test_idx.iter().map(|&i| x[i].clone()).collect();

            let mut model = factory();
            model.fit(&train_x, &train_y)?;
            let predictions = model.predict(&test_x)?;

            for (&i, &p) in test_idx.iter().zip(predictions.iter()) {
                oof_sum[i] += p;
            }
        }
    }

    let repeats = cv.n_repeats.max(1) as f64;
    let oof: Vec<f64> = oof_sum.into_iter().map(|s| s / repeats).collect();
    let metrics = calculate_metrics(y, &oof)?;

    Ok(CrossValOutcome { oof, metrics })
}
