//! Monthly volume series with explicit missing values, and the fixed-width
//! panels that hold one series per merchant.

use std::collections::BTreeMap;

use crate::core::MerchantId;
use crate::error::{PipelineError, Result};

/// One merchant's monthly volume series, indexed by month offset 1..=N.
/// Missing observations are explicit `None`s; every series in a panel has
/// the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlySeries {
    values: Vec<Option<f64>>,
}

impl MonthlySeries {
    /// Create a series from month-indexed values.
    pub fn new(values: Vec<Option<f64>>) -> Result<Self> {
        if values.is_empty() {
            return Err(PipelineError::EmptyData);
        }
        Ok(Self { values })
    }

    /// Series length N.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at 1-based month offset, `None` when out of range or missing.
    pub fn get(&self, month: usize) -> Option<f64> {
        if month == 0 {
            return None;
        }
        self.values.get(month - 1).copied().flatten()
    }

    /// All values in month order.
    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    /// Number of observed (non-missing) months.
    pub fn observed_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    /// True when no month is missing.
    pub fn is_complete(&self) -> bool {
        self.values.iter().all(|v| v.is_some())
    }

    /// Observed (month, value) pairs, months 1-based.
    pub fn observed(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.map(|x| (i + 1, x)))
    }
}

/// A fully observed series produced by the imputer. Derived artifact, not
/// mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedSeries {
    values: Vec<f64>,
}

impl CompletedSeries {
    pub fn new(values: Vec<f64>) -> Result<Self> {
        if values.is_empty() {
            return Err(PipelineError::EmptyData);
        }
        Ok(Self { values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at 1-based month offset.
    pub fn get(&self, month: usize) -> Option<f64> {
        if month == 0 {
            return None;
        }
        self.values.get(month - 1).copied()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// Fixed-width panel of gappy series, one per merchant, all of length N.
/// Iteration order is merchant-id order.
#[derive(Debug, Clone)]
pub struct SeriesPanel {
    len: usize,
    series: BTreeMap<MerchantId, MonthlySeries>,
}

impl SeriesPanel {
    /// Build a panel from per-merchant series, enforcing equal length.
    pub fn new(series: BTreeMap<MerchantId, MonthlySeries>) -> Result<Self> {
        let mut iter = series.values();
        let len = match iter.next() {
            Some(first) => first.len(),
            None => return Err(PipelineError::EmptyData),
        };
        for s in iter {
            if s.len() != len {
                return Err(PipelineError::DimensionMismatch {
                    expected: len,
                    got: s.len(),
                });
            }
        }
        Ok(Self { len, series })
    }

    /// Build a panel from long-format rows (merchant id, 1-based month
    /// offset, value). Months absent from the input stay missing; months
    /// outside 1..=len are rejected.
    pub fn from_long(rows: &[(MerchantId, usize, f64)], len: usize) -> Result<Self> {
        if len == 0 || rows.is_empty() {
            return Err(PipelineError::EmptyData);
        }
        let mut values: BTreeMap<MerchantId, Vec<Option<f64>>> = BTreeMap::new();
        for &(id, month, value) in rows {
            if month == 0 || month > len {
                return Err(PipelineError::InvalidParameter(format!(
                    "month offset {month} outside 1..={len} for merchant {id}"
                )));
            }
            values.entry(id).or_insert_with(|| vec![None; len])[month - 1] = Some(value);
        }
        let series = values
            .into_iter()
            .map(|(id, v)| MonthlySeries::new(v).map(|s| (id, s)))
            .collect::<Result<BTreeMap<_, _>>>()?;
        Self::new(series)
    }

    /// Common series length N.
    pub fn series_len(&self) -> usize {
        self.len
    }

    /// Number of merchants.
    pub fn n_merchants(&self) -> usize {
        self.series.len()
    }

    pub fn get(&self, id: MerchantId) -> Option<&MonthlySeries> {
        self.series.get(&id)
    }

    /// Merchant ids in ascending order.
    pub fn ids(&self) -> Vec<MerchantId> {
        self.series.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MerchantId, &MonthlySeries)> {
        self.series.iter().map(|(&id, s)| (id, s))
    }
}

/// Fixed-width panel of completed series, same shape as the source panel.
#[derive(Debug, Clone)]
pub struct CompletedPanel {
    len: usize,
    series: BTreeMap<MerchantId, CompletedSeries>,
}

impl CompletedPanel {
    pub fn new(series: BTreeMap<MerchantId, CompletedSeries>) -> Result<Self> {
        let mut iter = series.values();
        let len = match iter.next() {
            Some(first) => first.len(),
            None => return Err(PipelineError::EmptyData),
        };
        for s in iter {
            if s.len() != len {
                return Err(PipelineError::DimensionMismatch {
                    expected: len,
                    got: s.len(),
                });
            }
        }
        Ok(Self { len, series })
    }

    pub fn series_len(&self) -> usize {
        self.len
    }

    pub fn n_merchants(&self) -> usize {
        self.series.len()
    }

    pub fn get(&self, id: MerchantId) -> Option<&CompletedSeries> {
        self.series.get(&id)
    }

    pub fn ids(&self) -> Vec<MerchantId> {
        self.series.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MerchantId, &CompletedSeries)> {
        self.series.iter().map(|(&id, s)| (id, s))
    }
}

/// Verify that the registration table and the series panel cover exactly the
/// same merchant ids. A violation is fatal before imputation starts; the
/// pipeline never silently drops merchants.
pub fn check_coverage(registration_ids: &[MerchantId], panel: &SeriesPanel) -> Result<()> {
    for id in registration_ids {
        if panel.get(*id).is_none() {
            return Err(PipelineError::CoverageViolation {
                id: id.0,
                missing_from: "series",
            });
        }
    }
    let registered: std::collections::BTreeSet<MerchantId> =
        registration_ids.iter().copied().collect();
    for id in panel.ids() {
        if !registered.contains(&id) {
            return Err(PipelineError::CoverageViolation {
                id: id.0,
                missing_from: "registration",
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn panel_of(entries: &[(u64, Vec<Option<f64>>)]) -> SeriesPanel {
        let series = entries
            .iter()
            .map(|(id, v)| (MerchantId(*id), MonthlySeries::new(v.clone()).unwrap()))
            .collect();
        SeriesPanel::new(series).unwrap()
    }

    #[test]
    fn monthly_series_basic_accessors() {
        let s = MonthlySeries::new(vec![Some(1.0), None, Some(3.0)]).unwrap();
        assert_eq!(s.len(), 3);
        assert_eq!(s.get(1), Some(1.0));
        assert_eq!(s.get(2), None);
        assert_eq!(s.get(4), None);
        assert_eq!(s.observed_count(), 2);
        assert!(!s.is_complete());

        let observed: Vec<_> = s.observed().collect();
        assert_eq!(observed, vec![(1, 1.0), (3, 3.0)]);
    }

    #[test]
    fn panel_rejects_unequal_lengths() {
        let mut series = BTreeMap::new();
        series.insert(
            MerchantId(1),
            MonthlySeries::new(vec![Some(1.0), Some(2.0)]).unwrap(),
        );
        series.insert(MerchantId(2), MonthlySeries::new(vec![Some(1.0)]).unwrap());

        assert!(matches!(
            SeriesPanel::new(series),
            Err(PipelineError::DimensionMismatch { expected: 2, got: 1 })
        ));
    }

    #[test]
    fn from_long_builds_fixed_width() {
        let rows = vec![
            (MerchantId(1), 1, 10.0),
            (MerchantId(1), 3, 30.0),
            (MerchantId(2), 2, 20.0),
        ];
        let panel = SeriesPanel::from_long(&rows, 3).unwrap();

        assert_eq!(panel.series_len(), 3);
        assert_eq!(panel.n_merchants(), 2);
        let s1 = panel.get(MerchantId(1)).unwrap();
        assert_eq!(s1.get(1), Some(10.0));
        assert_eq!(s1.get(2), None);
        assert_eq!(s1.get(3), Some(30.0));
    }

    #[test]
    fn from_long_rejects_out_of_range_month() {
        let rows = vec![(MerchantId(1), 4, 10.0)];
        assert!(SeriesPanel::from_long(&rows, 3).is_err());
    }

    #[test]
    fn coverage_check_symmetric() {
        let panel = panel_of(&[(1, vec![Some(1.0)]), (2, vec![Some(2.0)])]);

        let ids = vec![MerchantId(1), MerchantId(2)];
        assert!(check_coverage(&ids, &panel).is_ok());

        // Merchant registered but without a series
        let extra = vec![MerchantId(1), MerchantId(2), MerchantId(3)];
        assert_eq!(
            check_coverage(&extra, &panel),
            Err(PipelineError::CoverageViolation {
                id: 3,
                missing_from: "series",
            })
        );

        // Merchant with a series but no registration
        let fewer = vec![MerchantId(1)];
        assert_eq!(
            check_coverage(&fewer, &panel),
            Err(PipelineError::CoverageViolation {
                id: 2,
                missing_from: "registration",
            })
        );
    }

    #[test]
    fn ids_are_ordered() {
        let panel = panel_of(&[(9, vec![Some(1.0)]), (3, vec![Some(2.0)]), (5, vec![Some(0.5)])]);
        assert_eq!(
            panel.ids(),
            vec![MerchantId(3), MerchantId(5), MerchantId(9)]
        );
    }
}
