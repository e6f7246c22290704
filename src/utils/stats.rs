//! Statistical helper functions.

/// Calculate the mean of a slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Calculate the sample variance (n-1 denominator).
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|x| (x - m).powi(2)).sum();
    sum_sq / (values.len() - 1) as f64
}

/// Calculate the sample standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Calculate the median of a slice.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

/// Calculate the q-quantile of a slice with linear interpolation.
pub fn quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let n = sorted.len();
    let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;

    if lower == upper || upper >= n {
        sorted[lower.min(n - 1)]
    } else {
        sorted[lower] * (1.0 - frac) + sorted[upper] * frac
    }
}

/// Shannon entropy (nats) of a discrete label assignment.
pub fn entropy(labels: &[usize], n_levels: usize) -> f64 {
    if labels.is_empty() || n_levels == 0 {
        return 0.0;
    }
    let mut counts = vec![0usize; n_levels];
    for &l in labels {
        if l < n_levels {
            counts[l] += 1;
        }
    }
    let n = labels.len() as f64;
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / n;
            -p * p.ln()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn mean_and_variance() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert_relative_eq!(mean(&values), 3.0, epsilon = 1e-10);
        assert_relative_eq!(variance(&values), 2.5, epsilon = 1e-10);
        assert_relative_eq!(std_dev(&values), 2.5_f64.sqrt(), epsilon = 1e-10);
    }

    #[test]
    fn median_even_and_odd() {
        assert_relative_eq!(median(&[3.0, 1.0, 2.0]), 2.0, epsilon = 1e-10);
        assert_relative_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5, epsilon = 1e-10);
    }

    #[test]
    fn quantile_interpolates() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert_relative_eq!(quantile(&values, 0.0), 1.0, epsilon = 1e-10);
        assert_relative_eq!(quantile(&values, 0.5), 3.0, epsilon = 1e-10);
        assert_relative_eq!(quantile(&values, 0.75), 4.0, epsilon = 1e-10);
        assert_relative_eq!(quantile(&values, 1.0), 5.0, epsilon = 1e-10);
    }

    #[test]
    fn entropy_uniform_and_pure() {
        // Pure assignment has zero entropy
        assert_relative_eq!(entropy(&[0, 0, 0, 0], 2), 0.0, epsilon = 1e-10);
        // Uniform over two levels has ln(2) entropy
        assert_relative_eq!(entropy(&[0, 1, 0, 1], 2), 2.0_f64.ln(), epsilon = 1e-10);
    }

    #[test]
    fn empty_slices_are_nan() {
        assert!(mean(&[]).is_nan());
        assert!(median(&[]).is_nan());
        assert!(quantile(&[], 0.5).is_nan());
    }
}
