//! Missing-value imputation for merchant monthly series.
//!
//! Two independent estimators are blended per cell: a log-linear trend fit
//! on the merchant's own observed months, and a nearest-neighbor average
//! over fully observed merchants of the same segment. Cells neither
//! estimator can fill surface as imputation failures instead of being
//! zero-filled.

pub mod neighbor;
pub mod trend;

use std::collections::BTreeMap;

use crate::core::{CompletedPanel, CompletedSeries, MerchantId, SeriesPanel};
use crate::error::{PipelineError, Result};
use crate::segment::SegmentAssignment;

pub use neighbor::{impute_rows, masked_distance, NeighborConfig};
pub use trend::{fill_missing, TrendModel};

/// Configuration for the blended series imputer.
#[derive(Debug, Clone)]
pub struct ImputerConfig {
    /// Neighbors consulted by the nearest-neighbor estimator.
    pub neighbors: usize,
    /// Blend weight of the neighbor estimate.
    pub neighbor_weight: f64,
    /// Blend weight of the trend estimate.
    pub trend_weight: f64,
}

impl Default for ImputerConfig {
    fn default() -> Self {
        Self {
            neighbors: 5,
            neighbor_weight: 0.7,
            trend_weight: 0.3,
        }
    }
}

/// Fills every missing monthly value, scoping neighbor search to each
/// merchant's segment.
#[derive(Debug, Clone, Default)]
pub struct SeriesImputer {
    config: ImputerConfig,
}

impl SeriesImputer {
    pub fn new(config: ImputerConfig) -> Self {
        Self { config }
    }

    /// Impute the whole panel. Neighbor candidates for a merchant come only
    /// from its own segment; the trend estimate comes from the merchant's
    /// own history. Series already complete are returned bit-identical.
    pub fn impute_panel(
        &self,
        panel: &SeriesPanel,
        assignment: &SegmentAssignment,
    ) -> Result<CompletedPanel> {
        let mut completed: BTreeMap<MerchantId, CompletedSeries> = BTreeMap::new();

        for segment in 0..assignment.k() {
            let members = assignment.members(segment);
            let group = self.impute_group(&members, panel)?;
            completed.extend(group);
        }

        if completed.len() != panel.n_merchants() {
            // A merchant outside every segment would otherwise vanish here.
            return Err(PipelineError::SegmentationFailure(format!(
                "segment assignment covers {} of {} merchants",
                completed.len(),
                panel.n_merchants()
            )));
        }

        CompletedPanel::new(completed)
    }

    /// Impute one segment's members against each other.
    pub fn impute_group(
        &self,
        members: &[MerchantId],
        panel: &SeriesPanel,
    ) -> Result<BTreeMap<MerchantId, CompletedSeries>> {
        let rows: Vec<Vec<Option<f64>>> = members
            .iter()
            .map(|id| {
                panel
                    .get(*id)
                    .map(|s| s.values().to_vec())
                    .ok_or(PipelineError::CoverageViolation {
                        id: id.0,
                        missing_from: "series",
                    })
            })
            .collect::<Result<_>>()?;

        let neighbor_filled = impute_rows(
            &rows,
            &NeighborConfig {
                k: self.config.neighbors,
            },
        );

        let mut out = BTreeMap::new();
        for (idx, id) in members.iter().enumerate() {
            let series = panel.get(*id).ok_or(PipelineError::CoverageViolation {
                id: id.0,
                missing_from: "series",
            })?;
            let trend_filled = fill_missing(series);

            let mut values = Vec::with_capacity(series.len());
            for month in 1..=series.len() {
                let original = series.get(month);
                let value = match original {
                    Some(observed) => observed,
                    None => self.blend(
                        neighbor_filled[idx][month - 1],
                        trend_filled[month - 1],
                        *id,
                        month,
                    )?,
                };
                values.push(value);
            }
            out.insert(*id, CompletedSeries::new(values)?);
        }
        Ok(out)
    }

    /// Blend the two estimates for one missing cell. The neighbor estimate
    /// is the required component: a defined trend alone cannot save a cell.
    fn blend(
        &self,
        neighbor: Option<f64>,
        trend: Option<f64>,
        id: MerchantId,
        month: usize,
    ) -> Result<f64> {
        match (neighbor, trend) {
            (Some(n), Some(t)) => {
                Ok(self.config.neighbor_weight * n + self.config.trend_weight * t)
            }
            (Some(n), None) => Ok(n),
            (None, _) => Err(PipelineError::ImputationFailure { id: id.0, month }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MonthlySeries;
    use approx::assert_relative_eq;

    fn panel_of(entries: Vec<(u64, Vec<Option<f64>>)>) -> SeriesPanel {
        let series = entries
            .into_iter()
            .map(|(id, v)| (MerchantId(id), MonthlySeries::new(v).unwrap()))
            .collect();
        SeriesPanel::new(series).unwrap()
    }

    fn single_segment(ids: &[u64]) -> SegmentAssignment {
        SegmentAssignment::new(ids.iter().map(|&id| (MerchantId(id), 0)).collect(), 1).unwrap()
    }

    #[test]
    fn complete_panel_round_trips_identically() {
        let panel = panel_of(vec![
            (1, vec![Some(1.0), Some(2.0), Some(3.0)]),
            (2, vec![Some(4.0), Some(5.0), Some(6.0)]),
        ]);
        let assignment = single_segment(&[1, 2]);

        let completed = SeriesImputer::default()
            .impute_panel(&panel, &assignment)
            .unwrap();

        assert_eq!(completed.get(MerchantId(1)).unwrap().values(), &[1.0, 2.0, 3.0]);
        assert_eq!(completed.get(MerchantId(2)).unwrap().values(), &[4.0, 5.0, 6.0]);
    }

    #[test]
    fn observed_values_never_change() {
        let panel = panel_of(vec![
            (1, vec![Some(10.0), Some(11.0), Some(12.0), Some(13.0)]),
            (2, vec![Some(10.5), Some(11.5), Some(12.5), Some(13.5)]),
            (3, vec![Some(10.2), None, Some(12.2), Some(13.2)]),
        ]);
        let assignment = single_segment(&[1, 2, 3]);

        let completed = SeriesImputer::default()
            .impute_panel(&panel, &assignment)
            .unwrap();

        let s3 = completed.get(MerchantId(3)).unwrap();
        assert_relative_eq!(s3.get(1).unwrap(), 10.2, epsilon = 1e-12);
        assert_relative_eq!(s3.get(3).unwrap(), 12.2, epsilon = 1e-12);
        assert_relative_eq!(s3.get(4).unwrap(), 13.2, epsilon = 1e-12);
        // Filled cell lands between the neighbor values, trend-adjusted
        let filled = s3.get(2).unwrap();
        assert!(filled > 10.0 && filled < 13.0, "got {filled}");
    }

    #[test]
    fn blend_weights_are_applied() {
        let imputer = SeriesImputer::default();
        let blended = imputer
            .blend(Some(10.0), Some(20.0), MerchantId(1), 1)
            .unwrap();
        assert_relative_eq!(blended, 0.7 * 10.0 + 0.3 * 20.0, epsilon = 1e-12);

        let neighbor_only = imputer.blend(Some(10.0), None, MerchantId(1), 1).unwrap();
        assert_relative_eq!(neighbor_only, 10.0, epsilon = 1e-12);
    }

    #[test]
    fn unfillable_cell_is_a_reported_failure() {
        // Merchant 2's row is entirely missing: neighbor distances are
        // undefined and the failure names the merchant and month.
        let panel = panel_of(vec![
            (1, vec![Some(1.0), Some(2.0)]),
            (2, vec![None, None]),
        ]);
        let assignment = single_segment(&[1, 2]);

        let result = SeriesImputer::default().impute_panel(&panel, &assignment);
        assert_eq!(
            result.unwrap_err(),
            PipelineError::ImputationFailure { id: 2, month: 1 }
        );
    }

    #[test]
    fn neighbor_search_is_scoped_to_segment() {
        // Merchant 3's only gap can be filled from segment peers 1 and 2,
        // not from the far-away merchant 4 in another segment.
        let panel = panel_of(vec![
            (1, vec![Some(1.0), Some(2.0)]),
            (2, vec![Some(1.2), Some(2.2)]),
            (3, vec![Some(1.1), None]),
            (4, vec![Some(1000.0), Some(2000.0)]),
        ]);
        let assignment = SegmentAssignment::new(
            vec![
                (MerchantId(1), 0),
                (MerchantId(2), 0),
                (MerchantId(3), 0),
                (MerchantId(4), 1),
            ],
            2,
        )
        .unwrap();

        let completed = SeriesImputer::default()
            .impute_panel(&panel, &assignment)
            .unwrap();
        let filled = completed.get(MerchantId(3)).unwrap().get(2).unwrap();
        assert!(filled < 10.0, "leaked across segments: {filled}");
    }
}
