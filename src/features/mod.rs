//! Automated predictor selection.
//!
//! Ranks every candidate predictor against the outcome with three
//! independent univariate scores, keeps the columns whose average score
//! reaches the 75th percentile of the score distribution, and truncates to
//! a fixed top-15 bound so wide dummy expansions cannot overfit a segment.

use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::core::Frame;
use crate::error::{PipelineError, Result};
use crate::utils::stats::quantile;

/// Configuration for the feature selector.
#[derive(Debug, Clone)]
pub struct SelectorConfig {
    /// Hard cap on the number of kept predictors.
    pub max_features: usize,
    /// Percentile of the average-score distribution used as the threshold.
    pub percentile: f64,
    /// Bins used to discretize columns for the entropy and association scores.
    pub bins: usize,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            max_features: 15,
            percentile: 0.75,
            bins: 4,
        }
    }
}

/// Per-predictor scores.
#[derive(Debug, Clone)]
pub struct FeatureScore {
    pub name: String,
    /// Normalized information gain of the binned predictor about the binned outcome.
    pub info_gain: f64,
    /// Chi-squared association on the same binning, as a CDF value in [0, 1].
    pub association: f64,
    /// Absolute Spearman rank correlation.
    pub rank_corr: f64,
    /// Mean of the three scores.
    pub average: f64,
}

/// Result of one selection run.
#[derive(Debug, Clone)]
pub struct SelectionResult {
    /// Kept predictor names, best first.
    pub kept: Vec<String>,
    /// All scores in original column order.
    pub scores: Vec<FeatureScore>,
}

/// Rank predictors and keep the bounded top subset.
///
/// Deterministic for identical input: scores are exact functions of the
/// data and ties keep original column order.
pub fn select(frame: &Frame, outcome: &[f64], config: &SelectorConfig) -> Result<SelectionResult> {
    if frame.n_rows() == 0 || frame.n_cols() == 0 {
        return Err(PipelineError::EmptyData);
    }
    if outcome.len() != frame.n_rows() {
        return Err(PipelineError::DimensionMismatch {
            expected: frame.n_rows(),
            got: outcome.len(),
        });
    }

    let outcome_bins = bin_indices(outcome, config.bins);
    let outcome_entropy = entropy_of(&outcome_bins, config.bins);

    let scores: Vec<FeatureScore> = frame
        .names()
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let column = frame.column_at(i).unwrap_or(&[]);
            let column_bins = bin_indices(column, config.bins);

            let info_gain = zero_if_nan(information_gain(
                &outcome_bins,
                &column_bins,
                config.bins,
                outcome_entropy,
            ));
            let association = zero_if_nan(chi_squared_association(
                &column_bins,
                &outcome_bins,
                config.bins,
            ));
            let rank_corr = zero_if_nan(spearman(column, outcome).abs());

            let average = (info_gain + association + rank_corr) / 3.0;
            FeatureScore {
                name: name.clone(),
                info_gain,
                association,
                rank_corr,
                average,
            }
        })
        .collect();

    let averages: Vec<f64> = scores.iter().map(|s| s.average).collect();
    let threshold = quantile(&averages, config.percentile);

    let mut kept: Vec<(usize, &FeatureScore)> = scores
        .iter()
        .enumerate()
        .filter(|(_, s)| s.average >= threshold)
        .collect();
    // Stable sort: ties keep original column order
    kept.sort_by(|a, b| {
        b.1.average
            .partial_cmp(&a.1.average)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    kept.truncate(config.max_features);

    Ok(SelectionResult {
        kept: kept.into_iter().map(|(_, s)| s.name.clone()).collect(),
        scores,
    })
}

fn zero_if_nan(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x
    }
}

/// Discretize values into quantile bins `0..n_bins`.
fn bin_indices(values: &[f64], n_bins: usize) -> Vec<usize> {
    let thresholds: Vec<f64> = (1..n_bins)
        .map(|i| quantile(values, i as f64 / n_bins as f64))
        .collect();
    values
        .iter()
        .map(|&v| thresholds.iter().filter(|&&t| v > t).count())
        .collect()
}

fn entropy_of(bins: &[usize], n_bins: usize) -> f64 {
    crate::utils::stats::entropy(bins, n_bins)
}

/// Information gain of the predictor about the outcome, normalized by the
/// outcome entropy so it lands in [0, 1].
fn information_gain(
    outcome_bins: &[usize],
    predictor_bins: &[usize],
    n_bins: usize,
    outcome_entropy: f64,
) -> f64 {
    if outcome_entropy <= 0.0 {
        return 0.0;
    }
    let n = outcome_bins.len() as f64;
    let mut conditional = 0.0;
    for bin in 0..n_bins {
        let subset: Vec<usize> = outcome_bins
            .iter()
            .zip(predictor_bins.iter())
            .filter(|(_, &p)| p == bin)
            .map(|(&o, _)| o)
            .collect();
        if subset.is_empty() {
            continue;
        }
        conditional += (subset.len() as f64 / n) * entropy_of(&subset, n_bins);
    }
    ((outcome_entropy - conditional) / outcome_entropy).clamp(0.0, 1.0)
}

/// Chi-squared statistic of the binned contingency table, mapped through the
/// chi-squared CDF so strong association scores near 1.
fn chi_squared_association(
    predictor_bins: &[usize],
    outcome_bins: &[usize],
    n_bins: usize,
) -> f64 {
    let n = predictor_bins.len() as f64;
    let mut observed = vec![vec![0.0; n_bins]; n_bins];
    for (&p, &o) in predictor_bins.iter().zip(outcome_bins.iter()) {
        observed[p][o] += 1.0;
    }

    let row_totals: Vec<f64> = observed.iter().map(|r| r.iter().sum()).collect();
    let col_totals: Vec<f64> = (0..n_bins).map(|c| observed.iter().map(|r| r[c]).sum()).collect();

    let rows_used = row_totals.iter().filter(|&&t| t > 0.0).count();
    let cols_used = col_totals.iter().filter(|&&t| t > 0.0).count();
    if rows_used < 2 || cols_used < 2 {
        return 0.0;
    }

    let mut stat = 0.0;
    for r in 0..n_bins {
        for c in 0..n_bins {
            let expected = row_totals[r] * col_totals[c] / n;
            if expected > 0.0 {
                stat += (observed[r][c] - expected).powi(2) / expected;
            }
        }
    }

    let df = ((rows_used - 1) * (cols_used - 1)) as f64;
    ChiSquared::new(df).map(|d| d.cdf(stat)).unwrap_or(0.0)
}

/// Spearman rank correlation.
fn spearman(a: &[f64], b: &[f64]) -> f64 {
    let ra = ranks(a);
    let rb = ranks(b);
    pearson(&ra, &rb)
}

/// Average ranks with tie correction.
fn ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| {
        values[i]
            .partial_cmp(&values[j])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut result = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            result[idx] = avg_rank;
        }
        i = j + 1;
    }
    result
}

fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len() as f64;
    if n == 0.0 {
        return f64::NAN;
    }
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;
    let cov: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (x - mean_a) * (y - mean_b))
        .sum();
    let var_a: f64 = a.iter().map(|x| (x - mean_a).powi(2)).sum();
    let var_b: f64 = b.iter().map(|y| (y - mean_b).powi(2)).sum();
    if var_a <= 0.0 || var_b <= 0.0 {
        return f64::NAN;
    }
    cov / (var_a.sqrt() * var_b.sqrt())
}
