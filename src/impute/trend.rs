//! Log-linear trend estimator for gappy monthly series.
//!
//! Fits ordinary least squares on the transformed series
//! `y' = ln(y - min(y) + 1)` against the 1-based month index; the shift
//! keeps the logarithm defined for zero and negative volumes. Estimates are
//! inverted with `exp(a x + b) + min(y) - 1`.

use crate::core::MonthlySeries;

/// A fitted log-linear trend. `None` from the fitters is the typed unknown
/// marker: a series with zero observed values has no trend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendModel {
    slope: f64,
    intercept: f64,
    shift: f64,
}

impl TrendModel {
    /// Fit on the observed months of a gappy series. Returns `None` when no
    /// month is observed.
    pub fn fit(series: &MonthlySeries) -> Option<Self> {
        let points: Vec<(f64, f64)> = series.observed().map(|(m, v)| (m as f64, v)).collect();
        Self::fit_points(&points)
    }

    /// Fit on a fully observed prefix of a series, months `1..=values.len()`.
    pub fn fit_complete(values: &[f64]) -> Option<Self> {
        let points: Vec<(f64, f64)> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| ((i + 1) as f64, v))
            .collect();
        Self::fit_points(&points)
    }

    fn fit_points(points: &[(f64, f64)]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let shift = points.iter().map(|&(_, y)| y).fold(f64::INFINITY, f64::min);

        let transformed: Vec<(f64, f64)> = points
            .iter()
            .map(|&(x, y)| (x, (y - shift + 1.0).ln()))
            .collect();

        let n = transformed.len() as f64;
        let mean_x = transformed.iter().map(|&(x, _)| x).sum::<f64>() / n;
        let mean_y = transformed.iter().map(|&(_, y)| y).sum::<f64>() / n;

        let ss_xx: f64 = transformed.iter().map(|&(x, _)| (x - mean_x).powi(2)).sum();
        let ss_xy: f64 = transformed
            .iter()
            .map(|&(x, y)| (x - mean_x) * (y - mean_y))
            .sum();

        // Single observed month, or all observations in one month: flat trend
        let slope = if ss_xx < 1e-12 { 0.0 } else { ss_xy / ss_xx };
        let intercept = mean_y - slope * mean_x;

        Some(Self {
            slope,
            intercept,
            shift,
        })
    }

    /// Trend estimate at a 1-based month index.
    pub fn value_at(&self, month: usize) -> f64 {
        (self.slope * month as f64 + self.intercept).exp() + self.shift - 1.0
    }

    /// Project `steps` months past the end of a series of length `len`.
    pub fn project(&self, len: usize, steps: usize) -> Vec<f64> {
        (1..=steps).map(|s| self.value_at(len + s)).collect()
    }
}

/// Fill only the missing positions of a series with trend estimates,
/// leaving every observed value untouched. All-missing positions stay
/// `None` when no trend can be fitted.
pub fn fill_missing(series: &MonthlySeries) -> Vec<Option<f64>> {
    let model = TrendModel::fit(series);
    series
        .values()
        .iter()
        .enumerate()
        .map(|(i, v)| match v {
            Some(observed) => Some(*observed),
            None => model.map(|m| m.value_at(i + 1)),
        })
        .collect()
}
