//! Per-horizon training and live frame assembly.
//!
//! For a panel of length N and horizon h the training frame predicts month N
//! from the first N-h months, while the live frame carries the most recent
//! N-h months under the identical column names so a model fitted on one
//! scores the other unchanged. The trend projection column is re-fitted per
//! frame on exactly the history that frame exposes.

use std::collections::BTreeMap;

use crate::core::{CompletedPanel, Frame, MerchantAttributes, MerchantId, TrainingFrame};
use crate::error::{PipelineError, Result};
use crate::impute::trend::TrendModel;
use crate::segment::OneHotEncoder;

/// Matched training and live frames for one (segment, horizon) pair.
#[derive(Debug, Clone)]
pub struct HorizonFrames {
    /// Features plus outcome (month N per merchant).
    pub train: TrainingFrame,
    /// Same column layout as `train.features`, shifted to the most recent
    /// history, no outcome.
    pub live: Frame,
    /// Forecast distance in months.
    pub horizon: usize,
    /// 1-based month offset the live frame predicts (N + horizon).
    pub target_month: usize,
}

/// Builds horizon frames over completed series and registration attributes.
///
/// The one-hot encoder is fitted once on the full registration table, so
/// dummy columns agree across segments and horizons.
#[derive(Debug, Clone)]
pub struct HorizonDatasetBuilder {
    encoder: OneHotEncoder,
    attrs: BTreeMap<MerchantId, MerchantAttributes>,
}

impl HorizonDatasetBuilder {
    pub fn new(attrs: &[MerchantAttributes]) -> Result<Self> {
        let encoder = OneHotEncoder::fit(attrs)?;
        let attrs = attrs.iter().map(|a| (a.id, a.clone())).collect();
        Ok(Self { encoder, attrs })
    }

    /// Build the frame pair for one merchant subset and horizon.
    ///
    /// The training history is months `1..=N-h` with month N as outcome; the
    /// live history is months `h+1..=N` projecting to month `N+h`. Each
    /// frame's trend column is fitted only on that frame's own history.
    pub fn build(
        &self,
        members: &[MerchantId],
        panel: &CompletedPanel,
        horizon: usize,
    ) -> Result<HorizonFrames> {
        if members.is_empty() {
            return Err(PipelineError::EmptyData);
        }
        if horizon == 0 {
            return Err(PipelineError::InvalidParameter(
                "horizon must be at least 1".to_string(),
            ));
        }
        let n = panel.series_len();
        if n <= horizon {
            return Err(PipelineError::InsufficientData {
                needed: horizon + 1,
                got: n,
            });
        }
        let n_history = n - horizon;

        let mut member_attrs = Vec::with_capacity(members.len());
        for &id in members {
            let attrs = self.attrs.get(&id).ok_or(PipelineError::CoverageViolation {
                id: id.0,
                missing_from: "registration",
            })?;
            member_attrs.push(attrs.clone());
        }

        let mut train_history: Vec<Vec<f64>> = vec![Vec::with_capacity(members.len()); n_history];
        let mut live_history: Vec<Vec<f64>> = vec![Vec::with_capacity(members.len()); n_history];
        let mut train_trend = Vec::with_capacity(members.len());
        let mut live_trend = Vec::with_capacity(members.len());
        let mut outcome = Vec::with_capacity(members.len());

        for &id in members {
            let series = panel.get(id).ok_or(PipelineError::CoverageViolation {
                id: id.0,
                missing_from: "series",
            })?;
            let values = series.values();

            for (slot, &v) in train_history.iter_mut().zip(values[..n_history].iter()) {
                slot.push(v);
            }
            for (slot, &v) in live_history.iter_mut().zip(values[horizon..].iter()) {
                slot.push(v);
            }
            outcome.push(values[n - 1]);

            let train_model = TrendModel::fit_complete(&values[..n_history]).ok_or_else(|| {
                PipelineError::ComputationError(format!("no trend for merchant {id}"))
            })?;
            train_trend.push(train_model.value_at(n));

            let live_model = TrendModel::fit_complete(&values[horizon..]).ok_or_else(|| {
                PipelineError::ComputationError(format!("no trend for merchant {id}"))
            })?;
            live_trend.push(live_model.value_at(n_history + horizon));
        }

        let registration = self.encoder.encode(&member_attrs)?;

        let assemble = |history: Vec<Vec<f64>>, trend: Vec<f64>| -> Result<Frame> {
            let mut frame = Frame::new(members.to_vec());
            for (i, column) in history.into_iter().enumerate() {
                frame.push_column(format!("hist_{:02}", i + 1), column)?;
            }
            frame.push_column("trend_projection", trend)?;
            for (i, name) in registration.names().iter().enumerate() {
                let column = registration
                    .column_at(i)
                    .ok_or_else(|| PipelineError::ComputationError("missing column".to_string()))?;
                frame.push_column(name.clone(), column.to_vec())?;
            }
            Ok(frame)
        };

        let train_features = assemble(train_history, train_trend)?;
        let live = assemble(live_history, live_trend)?;
        let train = TrainingFrame::new(train_features, outcome)?;

        Ok(HorizonFrames {
            train,
            live,
            horizon,
            target_month: n + horizon,
        })
    }
}
