//! K-means clustering over one-hot encoded merchant attributes.
//!
//! Euclidean metric, k-means++ initialization, and multiple seeded restarts
//! with a lowest-inertia tie-break so segment labels are stable across runs.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// K-means configuration.
#[derive(Debug, Clone)]
pub struct KMeansConfig {
    /// Number of clusters
    pub k: usize,
    /// Maximum iterations per run
    pub max_iter: usize,
    /// Independent restarts; the run with the lowest inertia wins
    pub n_restarts: usize,
    /// Random seed for initialization
    pub seed: u64,
    /// Convergence tolerance on inertia
    pub tolerance: f64,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            k: 3,
            max_iter: 100,
            n_restarts: 5,
            seed: 0,
            tolerance: 1e-4,
        }
    }
}

impl KMeansConfig {
    /// Set number of clusters.
    pub fn k(mut self, k: usize) -> Self {
        self.k = k.max(1);
        self
    }

    /// Set maximum iterations.
    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set restart count.
    pub fn n_restarts(mut self, n_restarts: usize) -> Self {
        self.n_restarts = n_restarts.max(1);
        self
    }

    /// Set random seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// K-means clustering result.
#[derive(Debug, Clone)]
pub struct KMeansResult {
    /// Cluster assignments for each row (0-indexed)
    pub labels: Vec<usize>,
    /// Cluster centroids
    pub centroids: Vec<Vec<f64>>,
    /// Sum of squared distances to nearest centroid
    pub inertia: f64,
    /// Iterations performed by the winning run
    pub n_iter: usize,
}

impl KMeansResult {
    /// Indices of rows in a specific cluster.
    pub fn cluster_members(&self, cluster: usize) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, &l)| l == cluster)
            .map(|(i, _)| i)
            .collect()
    }

    /// Size of each cluster.
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let k = self.centroids.len();
        let mut sizes = vec![0; k];
        for &label in &self.labels {
            if label < k {
                sizes[label] += 1;
            }
        }
        sizes
    }
}

/// Squared Euclidean distance between two rows.
pub fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Euclidean distance between two rows.
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    squared_distance(a, b).sqrt()
}

/// Perform k-means clustering with seeded restarts.
pub fn kmeans(rows: &[Vec<f64>], config: &KMeansConfig) -> KMeansResult {
    let n = rows.len();
    let k = config.k.min(n);

    if n == 0 || k == 0 {
        return KMeansResult {
            labels: Vec::new(),
            centroids: Vec::new(),
            inertia: 0.0,
            n_iter: 0,
        };
    }

    let mut best: Option<KMeansResult> = None;
    for restart in 0..config.n_restarts.max(1) {
        let result = kmeans_single(rows, k, config, config.seed.wrapping_add(restart as u64));
        let better = match &best {
            None => true,
            Some(b) => result.inertia < b.inertia,
        };
        if better {
            best = Some(result);
        }
    }
    best.unwrap_or(KMeansResult {
        labels: Vec::new(),
        centroids: Vec::new(),
        inertia: 0.0,
        n_iter: 0,
    })
}

fn kmeans_single(rows: &[Vec<f64>], k: usize, config: &KMeansConfig, seed: u64) -> KMeansResult {
    let n = rows.len();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut centroids = initialize_centroids(rows, k, &mut rng);

    let mut labels = vec![0; n];
    let mut prev_inertia = f64::INFINITY;
    let mut n_iter = 0;

    for iter in 0..config.max_iter {
        n_iter = iter + 1;

        // Assignment step
        let mut inertia = 0.0;
        for (i, row) in rows.iter().enumerate() {
            let (nearest, dist) = find_nearest_centroid(row, &centroids);
            labels[i] = nearest;
            inertia += dist;
        }

        if (prev_inertia - inertia).abs() < config.tolerance {
            break;
        }
        prev_inertia = inertia;

        // Update step; a cluster that lost every member keeps its centroid
        centroids = update_centroids(rows, &labels, &centroids, k);
    }

    let inertia = rows
        .iter()
        .zip(labels.iter())
        .map(|(row, &l)| squared_distance(row, &centroids[l]))
        .sum();

    KMeansResult {
        labels,
        centroids,
        inertia,
        n_iter,
    }
}

/// K-means++ initialization: later centroids are drawn proportional to the
/// squared distance from the nearest existing centroid.
fn initialize_centroids(rows: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let n = rows.len();
    let mut centroids = Vec::with_capacity(k);
    centroids.push(rows[rng.gen_range(0..n)].clone());

    while centroids.len() < k {
        let distances: Vec<f64> = rows
            .iter()
            .map(|row| {
                centroids
                    .iter()
                    .map(|c| squared_distance(row, c))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();

        let total: f64 = distances.iter().sum();
        let selected = if total > 0.0 {
            let mut threshold = rng.gen::<f64>() * total;
            let mut pick = n - 1;
            for (i, &d) in distances.iter().enumerate() {
                threshold -= d;
                if threshold <= 0.0 {
                    pick = i;
                    break;
                }
            }
            pick
        } else {
            // All rows coincide with a centroid already
            rng.gen_range(0..n)
        };

        centroids.push(rows[selected].clone());
    }

    centroids
}

fn find_nearest_centroid(row: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    let mut min_dist = f64::INFINITY;
    let mut nearest = 0;

    for (i, centroid) in centroids.iter().enumerate() {
        let dist = squared_distance(row, centroid);
        if dist < min_dist {
            min_dist = dist;
            nearest = i;
        }
    }

    (nearest, min_dist)
}

fn update_centroids(
    rows: &[Vec<f64>],
    labels: &[usize],
    previous: &[Vec<f64>],
    k: usize,
) -> Vec<Vec<f64>> {
    let dim = rows[0].len();
    let mut sums = vec![vec![0.0; dim]; k];
    let mut counts = vec![0usize; k];

    for (row, &label) in rows.iter().zip(labels.iter()) {
        counts[label] += 1;
        for (d, &v) in row.iter().enumerate() {
            sums[label][d] += v;
        }
    }

    (0..k)
        .map(|cluster| {
            if counts[cluster] == 0 {
                previous[cluster].clone()
            } else {
                sums[cluster]
                    .iter()
                    .map(|&s| s / counts[cluster] as f64)
                    .collect()
            }
        })
        .collect()
}
