//! Nearest-neighbor imputation over rows of the same segment.
//!
//! For each row with missing values, the k nearest fully observed rows by
//! missing-aware Euclidean distance supply inverse-distance-weighted column
//! averages for the gaps. Complete rows pass through unchanged.

/// Configuration for the neighbor estimator.
#[derive(Debug, Clone)]
pub struct NeighborConfig {
    /// Number of fully observed neighbors to average.
    pub k: usize,
}

impl Default for NeighborConfig {
    fn default() -> Self {
        Self { k: 5 }
    }
}

/// Euclidean distance over the intersection of observed dimensions.
/// `None` when the rows share no observed dimension.
pub fn masked_distance(a: &[Option<f64>], b: &[Option<f64>]) -> Option<f64> {
    let mut sum = 0.0;
    let mut common = 0usize;
    for (x, y) in a.iter().zip(b.iter()) {
        if let (Some(x), Some(y)) = (x, y) {
            sum += (x - y).powi(2);
            common += 1;
        }
    }
    if common == 0 {
        None
    } else {
        Some(sum.sqrt())
    }
}

/// Impute missing cells of each row from its k nearest fully observed rows.
///
/// Rows without any observed dimension have undefined distances and are
/// returned unchanged; their cells stay `None` for the blend layer to
/// surface. Likewise, when no fully observed row exists, nothing can be
/// filled.
pub fn impute_rows(rows: &[Vec<Option<f64>>], config: &NeighborConfig) -> Vec<Vec<Option<f64>>> {
    let complete_idx: Vec<usize> = rows
        .iter()
        .enumerate()
        .filter(|(_, r)| r.iter().all(|v| v.is_some()))
        .map(|(i, _)| i)
        .collect();

    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            if row.iter().all(|v| v.is_some()) {
                return row.clone();
            }
            let mut candidates: Vec<(f64, usize)> = complete_idx
                .iter()
                .filter(|&&j| j != i)
                .filter_map(|&j| masked_distance(row, &rows[j]).map(|d| (d, j)))
                .collect();
            if candidates.is_empty() {
                return row.clone();
            }
            candidates
                .sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            candidates.truncate(config.k.max(1));

            let weights: Vec<f64> = candidates.iter().map(|&(d, _)| 1.0 / (d + 1e-10)).collect();
            let weight_sum: f64 = weights.iter().sum();

            row.iter()
                .enumerate()
                .map(|(col, v)| match v {
                    Some(observed) => Some(*observed),
                    None => {
                        let estimate: f64 = candidates
                            .iter()
                            .zip(weights.iter())
                            .filter_map(|(&(_, j), &w)| rows[j][col].map(|x| x * w))
                            .sum::<f64>()
                            / weight_sum;
                        Some(estimate)
                    }
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn masked_distance_over_common_dims() {
        let a = vec![Some(0.0), None, Some(3.0)];
        let b = vec![Some(4.0), Some(1.0), Some(0.0)];
        // Common dims: 0 and 2 -> sqrt(16 + 9) = 5
        assert_relative_eq!(masked_distance(&a, &b).unwrap(), 5.0, epsilon = 1e-10);
    }

    #[test]
    fn masked_distance_undefined_without_overlap() {
        let a = vec![None, None];
        let b = vec![Some(1.0), Some(2.0)];
        assert!(masked_distance(&a, &b).is_none());
    }

    #[test]
    fn complete_rows_pass_through_unchanged() {
        let rows = vec![
            vec![Some(1.0), Some(2.0)],
            vec![Some(1.1), Some(2.1)],
            vec![Some(1.2), None],
        ];
        let imputed = impute_rows(&rows, &NeighborConfig::default());

        assert_eq!(imputed[0], rows[0]);
        assert_eq!(imputed[1], rows[1]);
        assert!(imputed[2][1].is_some());
    }

    #[test]
    fn fills_from_nearest_neighbors() {
        // Two tight groups; the gappy row sits in the low group
        let rows = vec![
            vec![Some(1.0), Some(2.0), Some(3.0)],
            vec![Some(1.1), Some(2.1), Some(3.1)],
            vec![Some(100.0), Some(200.0), Some(300.0)],
            vec![Some(1.05), None, Some(3.05)],
        ];
        let imputed = impute_rows(&rows, &NeighborConfig { k: 2 });

        let filled = imputed[3][1].unwrap();
        // Should be near the low group's second column, far from 200
        assert!(filled > 1.9 && filled < 2.3, "got {filled}");
    }

    #[test]
    fn all_missing_row_stays_missing() {
        let rows = vec![
            vec![Some(1.0), Some(2.0)],
            vec![Some(3.0), Some(4.0)],
            vec![None, None],
        ];
        let imputed = impute_rows(&rows, &NeighborConfig::default());
        assert!(imputed[2].iter().all(|v| v.is_none()));
    }

    #[test]
    fn no_complete_rows_leaves_gaps() {
        let rows = vec![vec![Some(1.0), None], vec![None, Some(2.0)]];
        let imputed = impute_rows(&rows, &NeighborConfig::default());
        assert!(imputed[0][1].is_none());
        assert!(imputed[1][0].is_none());
    }
}
