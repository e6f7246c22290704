//! Stacked ensemble training for one (segment, horizon) pair.
//!
//! The trainer scales the training frame, selects predictors, grid-tunes an
//! elastic net and cross-validates a k-nearest-neighbor learner, and fits a
//! gradient-boosted stacker on the two out-of-fold prediction columns. The
//! fitted [`EnsembleModel`] carries everything needed to score a live frame
//! built with the identical column layout.

use crate::core::{Frame, TrainingFrame};
use crate::error::{PipelineError, Result};
use crate::features::{select, SelectorConfig};
use crate::models::elastic_net::{ElasticNet, ElasticNetConfig};
use crate::models::gbt::{GradientBoosting, GradientBoostingConfig};
use crate::models::knn::KnnRegressor;
use crate::models::Regressor;
use crate::transform::MinMaxScaler;
use crate::utils::cross_validation::{cross_validate, RepeatedKFold};
use crate::utils::metrics::RegressionMetrics;

/// Configuration of the per-pair ensemble trainer.
#[derive(Debug, Clone)]
pub struct TrainerConfig {
    /// Candidate penalty strengths for the elastic net grid.
    pub enet_alphas: Vec<f64>,
    /// Candidate L1 shares for the elastic net grid.
    pub enet_l1_ratios: Vec<f64>,
    /// Neighbor count of the k-NN base learner.
    pub knn_k: usize,
    /// Cross-validation scheme shared by both base learners.
    pub cv: RepeatedKFold,
    /// Stacker hyperparameters.
    pub stacker: GradientBoostingConfig,
    /// Predictor selection parameters.
    pub selector: SelectorConfig,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            enet_alphas: vec![0.001, 0.01, 0.1, 1.0],
            enet_l1_ratios: vec![0.1, 0.5, 0.9],
            knn_k: 9,
            cv: RepeatedKFold::default(),
            stacker: GradientBoostingConfig::default(),
            selector: SelectorConfig::default(),
        }
    }
}

impl TrainerConfig {
    /// Set the seed for fold shuffling.
    pub fn seed(mut self, seed: u64) -> Self {
        self.cv.seed = seed;
        self
    }
}

/// Diagnostics from one training run.
#[derive(Debug, Clone)]
pub struct TrainingReport {
    /// Predictors kept by the selector, best first.
    pub selected: Vec<String>,
    /// Winning elastic net penalty.
    pub enet_alpha: f64,
    /// Winning elastic net L1 share.
    pub enet_l1_ratio: f64,
    /// Out-of-fold metrics of the elastic net.
    pub enet_metrics: RegressionMetrics,
    /// Out-of-fold metrics of the k-NN learner.
    pub knn_metrics: RegressionMetrics,
    /// Cross-validated metrics of the stacker over the out-of-fold
    /// prediction matrix.
    pub stacked_metrics: RegressionMetrics,
}

/// A fitted stacked ensemble for one (segment, horizon) pair.
#[derive(Debug, Clone)]
pub struct EnsembleModel {
    segment: usize,
    horizon: usize,
    scaler: MinMaxScaler,
    enet: ElasticNet,
    knn: KnnRegressor,
    stacker: GradientBoosting,
    report: TrainingReport,
}

impl EnsembleModel {
    /// Train the full stack on one training frame.
    ///
    /// The frame must be on the raw (unscaled) feature scale; the scaler is
    /// fitted here once and reused verbatim at prediction time.
    pub fn train(
        frame: &TrainingFrame,
        config: &TrainerConfig,
        segment: usize,
        horizon: usize,
    ) -> Result<Self> {
        let fail = |e: PipelineError| PipelineError::TrainingFailure {
            segment,
            horizon,
            cause: e.to_string(),
        };

        let scaler = MinMaxScaler::fit(&frame.features).map_err(fail)?;
        let scaled = scaler.transform(&frame.features).map_err(fail)?;

        let selection = select(&scaled, &frame.outcome, &config.selector).map_err(fail)?;
        if selection.kept.is_empty() {
            return Err(PipelineError::NoQualifyingPredictors { segment, horizon });
        }
        let design = scaled.select(&selection.kept).map_err(fail)?;
        let x = design.rows();
        let y = &frame.outcome;

        // Elastic net grid search under the shared CV scheme
        let mut best: Option<(f64, f64, f64, Vec<f64>, RegressionMetrics)> = None;
        for &alpha in &config.enet_alphas {
            for &l1_ratio in &config.enet_l1_ratios {
                let enet_config = ElasticNetConfig::default().alpha(alpha).l1_ratio(l1_ratio);
                let outcome = cross_validate(&x, y, &config.cv, || {
                    ElasticNet::new(enet_config.clone())
                })
                .map_err(fail)?;
                let better = match &best {
                    None => true,
                    Some((_, _, best_r2, _, _)) => outcome.metrics.r_squared > *best_r2,
                };
                if better {
                    best = Some((
                        alpha,
                        l1_ratio,
                        outcome.metrics.r_squared,
                        outcome.oof,
                        outcome.metrics,
                    ));
                }
            }
        }
        let (enet_alpha, enet_l1_ratio, _, enet_oof, enet_metrics) =
            best.ok_or_else(|| PipelineError::TrainingFailure {
                segment,
                horizon,
                cause: "empty elastic net grid".to_string(),
            })?;

        let knn_outcome =
            cross_validate(&x, y, &config.cv, || KnnRegressor::new(config.knn_k)).map_err(fail)?;

        // Stacker trains on out-of-fold columns so it never sees a base
        // learner's in-sample optimism
        let stack_x: Vec<Vec<f64>> = enet_oof
            .iter()
            .zip(knn_outcome.oof.iter())
            .map(|(&e, &k)| vec![e, k])
            .collect();
        let stacked_outcome = cross_validate(&stack_x, y, &config.cv, || {
            GradientBoosting::new(config.stacker.clone())
        })
        .map_err(fail)?;
        let mut stacker = GradientBoosting::new(config.stacker.clone());
        stacker.fit(&stack_x, y).map_err(fail)?;

        // Refit both base learners on the full design for live scoring
        let mut enet = ElasticNet::new(
            ElasticNetConfig::default()
                .alpha(enet_alpha)
                .l1_ratio(enet_l1_ratio),
        );
        enet.fit(&x, y).map_err(fail)?;
        let mut knn = KnnRegressor::new(config.knn_k);
        knn.fit(&x, y).map_err(fail)?;

        Ok(Self {
            segment,
            horizon,
            scaler,
            enet,
            knn,
            stacker,
            report: TrainingReport {
                selected: selection.kept,
                enet_alpha,
                enet_l1_ratio,
                enet_metrics,
                knn_metrics: knn_outcome.metrics,
                stacked_metrics: stacked_outcome.metrics,
            },
        })
    }

    /// Score a live frame with the identical raw column layout as training.
    /// The fitted scaler and selection are applied as-is, never refitted.
    pub fn predict(&self, frame: &Frame) -> Result<Vec<f64>> {
        let scaled = self.scaler.transform(frame)?;
        let design = scaled.select(&self.report.selected)?;
        let x = design.rows();

        let enet_predictions = self.enet.predict(&x)?;
        let knn_predictions = self.knn.predict(&x)?;
        let stack_x: Vec<Vec<f64>> = enet_predictions
            .iter()
            .zip(knn_predictions.iter())
            .map(|(&e, &k)| vec![e, k])
            .collect();
        self.stacker.predict(&stack_x)
    }

    pub fn segment(&self) -> usize {
        self.segment
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Training diagnostics.
    pub fn report(&self) -> &TrainingReport {
        &self.report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MerchantId;

    fn noisy(i: usize) -> f64 {
        ((i as f64 * 12.9898).sin() * 43758.5453).fract()
    }

    fn training_frame(n: usize) -> TrainingFrame {
        let mut frame = Frame::new((1..=n as u64).map(MerchantId).collect());
        let base: Vec<f64> = (0..n).map(|i| 100.0 + i as f64 * 10.0).collect();
        let drift: Vec<f64> = (0..n).map(|i| 50.0 + noisy(i) * 20.0).collect();
        frame.push_column("hist_01", base.clone()).unwrap();
        frame.push_column("hist_02", drift).unwrap();
        frame
            .push_column("noise", (0..n).map(|i| noisy(i + 3)).collect())
            .unwrap();

        let outcome: Vec<f64> = base.iter().map(|&b| 1.1 * b + 5.0).collect();
        TrainingFrame::new(frame, outcome).unwrap()
    }

    fn fast_config() -> TrainerConfig {
        let mut config = TrainerConfig::default();
        config.cv = RepeatedKFold::new(5, 1, 42);
        config.enet_alphas = vec![0.001, 0.1];
        config.enet_l1_ratios = vec![0.5];
        config.stacker.n_trees = 50;
        config
    }

    #[test]
    fn trains_and_predicts_on_same_layout() {
        let frame = training_frame(40);
        let model = EnsembleModel::train(&frame, &fast_config(), 0, 1).unwrap();

        let predictions = model.predict(&frame.features).unwrap();
        assert_eq!(predictions.len(), 40);
        // Predictions land on the outcome scale
        let mean: f64 = predictions.iter().sum::<f64>() / 40.0;
        let target_mean: f64 = frame.outcome.iter().sum::<f64>() / 40.0;
        assert!((mean - target_mean).abs() / target_mean < 0.5);
    }

    #[test]
    fn report_names_kept_predictors() {
        let frame = training_frame(40);
        let model = EnsembleModel::train(&frame, &fast_config(), 2, 3).unwrap();

        assert_eq!(model.segment(), 2);
        assert_eq!(model.horizon(), 3);
        let report = model.report();
        assert!(!report.selected.is_empty());
        assert!(report.selected.iter().all(|n| {
            frame.features.names().contains(n)
        }));
    }

    #[test]
    fn same_seed_same_model() {
        let frame = training_frame(30);
        let a = EnsembleModel::train(&frame, &fast_config(), 0, 1).unwrap();
        let b = EnsembleModel::train(&frame, &fast_config(), 0, 1).unwrap();

        let pa = a.predict(&frame.features).unwrap();
        let pb = b.predict(&frame.features).unwrap();
        assert_eq!(pa, pb);
    }

    #[test]
    fn stacker_metrics_come_from_held_out_folds() {
        // Outcome unrelated to every predictor: a booster scored on its own
        // training rows would still report a high R² here, held-out folds
        // cannot
        let n = 40;
        let mut frame = Frame::new((1..=n as u64).map(MerchantId).collect());
        frame
            .push_column("a", (0..n).map(noisy).collect())
            .unwrap();
        frame
            .push_column("b", (0..n).map(|i| noisy(i + 11)).collect())
            .unwrap();
        let outcome: Vec<f64> = (0..n).map(|i| noisy(i + 101) * 100.0).collect();
        let frame = TrainingFrame::new(frame, outcome).unwrap();

        let model = EnsembleModel::train(&frame, &fast_config(), 0, 1).unwrap();
        let report = model.report();
        assert!(report.stacked_metrics.mae >= 0.0);
        assert!(
            report.stacked_metrics.r_squared < 0.5,
            "held-out R² is optimistic: {}",
            report.stacked_metrics.r_squared
        );
    }

    #[test]
    fn training_failure_carries_pair() {
        let mut frame = Frame::new(vec![MerchantId(1)]);
        frame.push_column("hist_01", vec![1.0]).unwrap();
        let frame = TrainingFrame::new(frame, vec![1.0]).unwrap();

        let result = EnsembleModel::train(&frame, &fast_config(), 4, 2);
        match result {
            Err(PipelineError::TrainingFailure { segment, horizon, .. }) => {
                assert_eq!(segment, 4);
                assert_eq!(horizon, 2);
            }
            other => panic!("expected training failure, got {other:?}"),
        }
    }
}
