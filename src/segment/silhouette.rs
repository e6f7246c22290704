//! Silhouette scoring and the sampled cluster-count search.
//!
//! Full-dataset silhouette computation is quadratic in merchant count, so
//! the search scores candidate counts on fixed-size samples and takes the
//! modal arg-max across independent samples.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{PipelineError, Result};
use crate::segment::kmeans::{euclidean_distance, kmeans, KMeansConfig};

/// Mean silhouette width of a clustering. `NaN` when the clustering is
/// degenerate (fewer than two non-empty clusters).
pub fn mean_silhouette(rows: &[Vec<f64>], labels: &[usize], k: usize) -> f64 {
    let n = rows.len();
    if n == 0 || labels.len() != n || k < 2 {
        return f64::NAN;
    }

    let mut cluster_sizes = vec![0usize; k];
    for &l in labels {
        if l >= k {
            return f64::NAN;
        }
        cluster_sizes[l] += 1;
    }
    if cluster_sizes.iter().filter(|&&s| s > 0).count() < 2 {
        return f64::NAN;
    }

    let mut total = 0.0;
    for i in 0..n {
        let own = labels[i];
        if cluster_sizes[own] <= 1 {
            // Singleton clusters contribute zero by convention
            continue;
        }

        let mut dist_sums = vec![0.0; k];
        for j in 0..n {
            if i == j {
                continue;
            }
            dist_sums[labels[j]] += euclidean_distance(&rows[i], &rows[j]);
        }

        let a = dist_sums[own] / (cluster_sizes[own] - 1) as f64;
        let b = (0..k)
            .filter(|&c| c != own && cluster_sizes[c] > 0)
            .map(|c| dist_sums[c] / cluster_sizes[c] as f64)
            .fold(f64::INFINITY, f64::min);

        let denom = a.max(b);
        if denom > 0.0 {
            total += (b - a) / denom;
        }
    }

    total / n as f64
}

/// Configuration for the sampled cluster-count search.
#[derive(Debug, Clone)]
pub struct ClusterCountConfig {
    /// Smallest candidate count.
    pub min_k: usize,
    /// Largest candidate count.
    pub max_k: usize,
    /// Rows sampled per trial.
    pub sample_size: usize,
    /// Independent sampled trials.
    pub n_trials: usize,
    /// Base seed for sampling and the per-candidate k-means runs.
    pub seed: u64,
}

impl Default for ClusterCountConfig {
    fn default() -> Self {
        Self {
            min_k: 2,
            max_k: 12,
            sample_size: 200,
            n_trials: 10,
            seed: 0,
        }
    }
}

impl ClusterCountConfig {
    /// Set the candidate range.
    pub fn range(mut self, min_k: usize, max_k: usize) -> Self {
        self.min_k = min_k.max(2);
        self.max_k = max_k.max(self.min_k);
        self
    }

    /// Set the sample size per trial.
    pub fn sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size.max(4);
        self
    }

    /// Set the trial count.
    pub fn n_trials(mut self, n_trials: usize) -> Self {
        self.n_trials = n_trials.max(1);
        self
    }

    /// Set the base seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Choose the cluster count by repeated sampled silhouette search.
///
/// Each trial samples rows without replacement, clusters them for every
/// candidate count, and records the count with the best mean silhouette.
/// The modal arg-max across trials wins; ties break toward the smaller
/// count. A search with no valid trial is a segmentation failure.
pub fn select_cluster_count(rows: &[Vec<f64>], config: &ClusterCountConfig) -> Result<usize> {
    let n = rows.len();
    if n < config.min_k + 1 {
        return Err(PipelineError::InsufficientData {
            needed: config.min_k + 1,
            got: n,
        });
    }

    let mut votes: Vec<usize> = Vec::with_capacity(config.n_trials);
    for trial in 0..config.n_trials {
        let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(trial as u64));
        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(&mut rng);
        indices.truncate(config.sample_size.min(n));

        let sample: Vec<Vec<f64>> = indices.iter().map(|&i| rows[i].clone()).collect();
        let max_k = config.max_k.min(sample.len() - 1);

        let mut best: Option<(f64, usize)> = None;
        for k in config.min_k..=max_k {
            let km_config = KMeansConfig::default()
                .k(k)
                .seed(config.seed.wrapping_add((trial * 1000 + k) as u64));
            let result = kmeans(&sample, &km_config);
            let score = mean_silhouette(&sample, &result.labels, k);
            if score.is_nan() {
                continue;
            }
            let better = match best {
                None => true,
                Some((best_score, _)) => score > best_score,
            };
            if better {
                best = Some((score, k));
            }
        }
        if let Some((_, k)) = best {
            votes.push(k);
        }
    }

    if votes.is_empty() {
        return Err(PipelineError::SegmentationFailure(
            "cluster-count search produced no valid silhouette in any trial".to_string(),
        ));
    }

    // Modal vote, ties toward the smaller count
    let mut counts: Vec<(usize, usize)> = Vec::new();
    for &k in &votes {
        match counts.iter_mut().find(|(candidate, _)| *candidate == k) {
            Some((_, c)) => *c += 1,
            None => counts.push((k, 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    Ok(counts[0].0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_blob_data(per_blob: usize) -> Vec<Vec<f64>> {
        let mut rows = Vec::new();
        for i in 0..per_blob {
            let jitter = (i % 5) as f64 * 0.01;
            rows.push(vec![0.0 + jitter, 0.0 + jitter]);
            rows.push(vec![10.0 + jitter, 10.0 + jitter]);
        }
        rows
    }

    #[test]
    fn silhouette_high_for_separated_clusters() {
        let rows = two_blob_data(5);
        let labels: Vec<usize> = (0..rows.len()).map(|i| i % 2).collect();
        let score = mean_silhouette(&rows, &labels, 2);

        assert!(score > 0.9, "got {score}");
    }

    #[test]
    fn silhouette_low_for_shuffled_labels() {
        let rows = two_blob_data(5);
        // Half of each blob mislabeled
        let labels: Vec<usize> = (0..rows.len()).map(|i| (i / 2) % 2).collect();
        let good: Vec<usize> = (0..rows.len()).map(|i| i % 2).collect();

        assert!(mean_silhouette(&rows, &labels, 2) < mean_silhouette(&rows, &good, 2));
    }

    #[test]
    fn silhouette_nan_for_single_cluster() {
        let rows = two_blob_data(3);
        let labels = vec![0; rows.len()];
        assert!(mean_silhouette(&rows, &labels, 1).is_nan());
        assert!(mean_silhouette(&rows, &labels, 2).is_nan());
    }

    #[test]
    fn count_search_finds_two_blobs() {
        let rows = two_blob_data(20);
        let config = ClusterCountConfig::default()
            .range(2, 6)
            .sample_size(20)
            .n_trials(5)
            .seed(42);

        let k = select_cluster_count(&rows, &config).unwrap();
        assert_eq!(k, 2);
    }

    #[test]
    fn count_search_is_seed_reproducible() {
        let rows = two_blob_data(15);
        let config = ClusterCountConfig::default().range(2, 5).sample_size(16).seed(9);

        let a = select_cluster_count(&rows, &config).unwrap();
        let b = select_cluster_count(&rows, &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn count_search_rejects_tiny_input() {
        let rows = vec![vec![1.0], vec![2.0]];
        let config = ClusterCountConfig::default();
        assert!(matches!(
            select_cluster_count(&rows, &config),
            Err(PipelineError::InsufficientData { .. })
        ));
    }
}
