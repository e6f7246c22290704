//! Unsupervised merchant segmentation from registration attributes.
//!
//! One-hot encodes the registration table, optionally searches for the
//! cluster count by sampled silhouette, and partitions every merchant into
//! exactly one segment with seeded k-means.

pub mod encoding;
pub mod kmeans;
pub mod silhouette;

use std::collections::BTreeMap;

use crate::core::{MerchantAttributes, MerchantId};
use crate::error::{PipelineError, Result};
use crate::transform::MinMaxScaler;

pub use encoding::OneHotEncoder;
pub use kmeans::{euclidean_distance, kmeans, KMeansConfig, KMeansResult};
pub use silhouette::{mean_silhouette, select_cluster_count, ClusterCountConfig};

/// A total, non-overlapping partition of merchants into segments `0..k`.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentAssignment {
    labels: BTreeMap<MerchantId, usize>,
    k: usize,
}

impl SegmentAssignment {
    /// Build an assignment, validating that every label is below `k` and
    /// no merchant appears twice.
    pub fn new(pairs: Vec<(MerchantId, usize)>, k: usize) -> Result<Self> {
        if k == 0 || pairs.is_empty() {
            return Err(PipelineError::EmptyData);
        }
        let mut labels = BTreeMap::new();
        for (id, segment) in pairs {
            if segment >= k {
                return Err(PipelineError::SegmentationFailure(format!(
                    "label {segment} out of range for k={k}"
                )));
            }
            if labels.insert(id, segment).is_some() {
                return Err(PipelineError::SegmentationFailure(format!(
                    "merchant {id} assigned more than once"
                )));
            }
        }
        Ok(Self { labels, k })
    }

    /// Number of segments.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Number of merchants covered.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Segment of one merchant.
    pub fn segment_of(&self, id: MerchantId) -> Option<usize> {
        self.labels.get(&id).copied()
    }

    /// Members of one segment, in merchant-id order.
    pub fn members(&self, segment: usize) -> Vec<MerchantId> {
        self.labels
            .iter()
            .filter(|(_, &s)| s == segment)
            .map(|(&id, _)| id)
            .collect()
    }

    /// All (merchant, segment) pairs in merchant-id order.
    pub fn iter(&self) -> impl Iterator<Item = (MerchantId, usize)> + '_ {
        self.labels.iter().map(|(&id, &s)| (id, s))
    }
}

/// Configuration for the segmenter.
#[derive(Debug, Clone)]
pub struct SegmenterConfig {
    /// Fixed segment count; `None` triggers the sampled silhouette search.
    pub k: Option<usize>,
    /// Cluster-count search parameters.
    pub count_search: ClusterCountConfig,
    /// Restarts of the final k-means run.
    pub n_restarts: usize,
    /// Iteration cap per k-means run.
    pub max_iter: usize,
    /// Seed for the search and the final clustering.
    pub seed: u64,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            k: None,
            count_search: ClusterCountConfig::default(),
            n_restarts: 5,
            max_iter: 100,
            seed: 0,
        }
    }
}

impl SegmenterConfig {
    /// Fix the segment count, skipping the search.
    pub fn fixed_k(mut self, k: usize) -> Self {
        self.k = Some(k.max(1));
        self
    }

    /// Set the seed for every stochastic step.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.count_search.seed = seed;
        self
    }
}

/// Clusters merchants into segments from their registration attributes.
#[derive(Debug, Clone, Default)]
pub struct Segmenter {
    config: SegmenterConfig,
}

impl Segmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        Self { config }
    }

    /// Segment the registration table. Every merchant lands in exactly one
    /// segment; an empty segment in the final clustering is an error, not a
    /// silent anomaly.
    pub fn segment(&self, attrs: &[MerchantAttributes]) -> Result<SegmentAssignment> {
        if attrs.is_empty() {
            return Err(PipelineError::EmptyData);
        }

        let encoder = OneHotEncoder::fit(attrs)?;
        let encoded = encoder.encode(attrs)?;
        // Scale so the volume scalar cannot dominate the indicator columns
        let scaled = MinMaxScaler::fit(&encoded)?.transform(&encoded)?;
        let rows = scaled.rows();

        let k = match self.config.k {
            Some(k) => k.min(attrs.len()),
            None => select_cluster_count(&rows, &self.config.count_search)?,
        };

        let km_config = KMeansConfig::default()
            .k(k)
            .max_iter(self.config.max_iter)
            .n_restarts(self.config.n_restarts)
            .seed(self.config.seed);
        let result = kmeans(&rows, &km_config);

        let sizes = result.cluster_sizes();
        if let Some(empty) = sizes.iter().position(|&s| s == 0) {
            return Err(PipelineError::SegmentationFailure(format!(
                "segment {empty} is empty with k={k}"
            )));
        }

        let pairs: Vec<(MerchantId, usize)> = attrs
            .iter()
            .zip(result.labels.iter())
            .map(|(a, &label)| (a.id, label))
            .collect();
        SegmentAssignment::new(pairs, k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StateCode;

    fn merchant(id: u64, category: &str, tier: u8, volume: f64) -> MerchantAttributes {
        MerchantAttributes {
            id: MerchantId(id),
            size_tier: tier,
            category: category.to_string(),
            state: StateCode::Code(if tier == 0 { "SP" } else { "RJ" }.to_string()),
            document_type: "corporate".to_string(),
            ticket_band: if tier == 0 { "low" } else { "high" }.to_string(),
            estimated_volume: volume,
            registered_month: 1,
        }
    }

    fn two_kinds(n_each: u64) -> Vec<MerchantAttributes> {
        let mut attrs = Vec::new();
        for i in 0..n_each {
            attrs.push(merchant(i + 1, "food", 0, 100.0 + i as f64));
            attrs.push(merchant(100 + i + 1, "retail", 2, 9000.0 + i as f64));
        }
        attrs
    }

    #[test]
    fn assignment_is_total_partition() {
        let attrs = two_kinds(5);
        let config = SegmenterConfig::default().fixed_k(2).seed(42);
        let assignment = Segmenter::new(config).segment(&attrs).unwrap();

        assert_eq!(assignment.k(), 2);
        assert_eq!(assignment.len(), attrs.len());
        for a in &attrs {
            assert!(assignment.segment_of(a.id).is_some());
        }
        let total: usize = (0..assignment.k()).map(|s| assignment.members(s).len()).sum();
        assert_eq!(total, attrs.len());
    }

    #[test]
    fn distinct_kinds_separate() {
        let attrs = two_kinds(5);
        let config = SegmenterConfig::default().fixed_k(2).seed(42);
        let assignment = Segmenter::new(config).segment(&attrs).unwrap();

        // All "food" merchants share a segment, all "retail" the other
        let food_segment = assignment.segment_of(MerchantId(1)).unwrap();
        for i in 1..=5 {
            assert_eq!(assignment.segment_of(MerchantId(i)), Some(food_segment));
        }
        let retail_segment = assignment.segment_of(MerchantId(101)).unwrap();
        assert_ne!(food_segment, retail_segment);
    }

    #[test]
    fn searched_count_matches_structure() {
        let attrs = two_kinds(10);
        let mut config = SegmenterConfig::default().seed(7);
        config.count_search = ClusterCountConfig::default()
            .range(2, 5)
            .sample_size(20)
            .n_trials(5)
            .seed(7);

        let assignment = Segmenter::new(config).segment(&attrs).unwrap();
        assert_eq!(assignment.k(), 2);
    }

    #[test]
    fn same_seed_same_assignment() {
        let attrs = two_kinds(6);
        let config = SegmenterConfig::default().fixed_k(2).seed(11);

        let a = Segmenter::new(config.clone()).segment(&attrs).unwrap();
        let b = Segmenter::new(config).segment(&attrs).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn assignment_validation() {
        // Label out of range
        assert!(SegmentAssignment::new(vec![(MerchantId(1), 3)], 2).is_err());
        // Duplicate merchant
        assert!(
            SegmentAssignment::new(vec![(MerchantId(1), 0), (MerchantId(1), 1)], 2).is_err()
        );
    }
}
