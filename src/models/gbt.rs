//! Gradient-boosted trees with an absolute-error objective.
//!
//! Shallow regression trees are fitted to the sign of the current residual
//! and each leaf re-estimates its value as the median residual of the rows
//! it covers. The median init and leaf medians make the stacker robust to
//! the occasional wild base-learner prediction.

use crate::error::{PipelineError, Result};
use crate::models::Regressor;
use crate::utils::stats::median;

/// Boosting hyperparameters.
#[derive(Debug, Clone)]
pub struct GradientBoostingConfig {
    /// Number of boosting rounds.
    pub n_trees: usize,
    /// Shrinkage applied to every tree's contribution.
    pub learning_rate: f64,
    /// Depth cap per tree.
    pub max_depth: usize,
    /// Minimum rows per leaf.
    pub min_leaf: usize,
}

impl Default for GradientBoostingConfig {
    fn default() -> Self {
        Self {
            n_trees: 200,
            learning_rate: 0.1,
            max_depth: 3,
            min_leaf: 10,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn value(&self, row: &[f64]) -> f64 {
        match self {
            Node::Leaf(v) => *v,
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if row[*feature] <= *threshold {
                    left.value(row)
                } else {
                    right.value(row)
                }
            }
        }
    }
}

/// LAD gradient boosting regressor.
#[derive(Debug, Clone)]
pub struct GradientBoosting {
    config: GradientBoostingConfig,
    init: f64,
    trees: Vec<Node>,
    n_features: usize,
    fitted: bool,
}

impl GradientBoosting {
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self {
            config,
            init: 0.0,
            trees: Vec::new(),
            n_features: 0,
            fitted: false,
        }
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Default for GradientBoosting {
    fn default() -> Self {
        Self::new(GradientBoostingConfig::default())
    }
}

/// Best split of `indices` by squared-error reduction on `targets`.
fn best_split(
    x: &[Vec<f64>],
    targets: &[f64],
    indices: &[usize],
    min_leaf: usize,
) -> Option<(usize, f64)> {
    let p = x[0].len();
    let total: f64 = indices.iter().map(|&i| targets[i]).sum();
    let n = indices.len() as f64;
    let base = total * total / n;

    let mut best: Option<(f64, usize, f64)> = None;
    for feature in 0..p {
        let mut order: Vec<usize> = indices.to_vec();
        order.sort_by(|&a, &b| {
            x[a][feature]
                .partial_cmp(&x[b][feature])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut left_sum = 0.0;
        for (pos, &i) in order.iter().enumerate().take(order.len() - 1) {
            left_sum += targets[i];
            let left_n = (pos + 1) as f64;
            let right_n = n - left_n;
            if (pos + 1) < min_leaf || (order.len() - pos - 1) < min_leaf {
                continue;
            }
            // Skip ties; a split between equal values is not realizable
            if x[i][feature] == x[order[pos + 1]][feature] {
                continue;
            }
            let right_sum = total - left_sum;
            let gain = left_sum * left_sum / left_n + right_sum * right_sum / right_n - base;
            let better = match best {
                None => gain > 1e-12,
                Some((best_gain, _, _)) => gain > best_gain,
            };
            if better {
                let threshold = (x[i][feature] + x[order[pos + 1]][feature]) / 2.0;
                best = Some((gain, feature, threshold));
            }
        }
    }
    best.map(|(_, feature, threshold)| (feature, threshold))
}

/// Grow a tree on the sign residuals, then set each leaf to the median raw
/// residual of its rows.
fn build_tree(
    x: &[Vec<f64>],
    gradients: &[f64],
    residuals: &[f64],
    indices: &[usize],
    depth: usize,
    config: &GradientBoostingConfig,
) -> Node {
    let leaf = || {
        let values: Vec<f64> = indices.iter().map(|&i| residuals[i]).collect();
        Node::Leaf(median(&values))
    };

    if depth >= config.max_depth || indices.len() < 2 * config.min_leaf {
        return leaf();
    }
    let Some((feature, threshold)) = best_split(x, gradients, indices, config.min_leaf) else {
        return leaf();
    };

    let (left, right): (Vec<usize>, Vec<usize>) =
        indices.iter().partition(|&&i| x[i][feature] <= threshold);
    if left.is_empty() || right.is_empty() {
        return leaf();
    }

    Node::Split {
        feature,
        threshold,
        left: Box::new(build_tree(x, gradients, residuals, &left, depth + 1, config)),
        right: Box::new(build_tree(x, gradients, residuals, &right, depth + 1, config)),
    }
}

impl Regressor for GradientBoosting {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        let n = x.len();
        if n == 0 {
            return Err(PipelineError::EmptyData);
        }
        if y.len() != n {
            return Err(PipelineError::DimensionMismatch {
                expected: n,
                got: y.len(),
            });
        }

        self.n_features = x[0].len();
        self.init = median(y);
        self.trees.clear();

        let mut current: Vec<f64> = vec![self.init; n];
        let indices: Vec<usize> = (0..n).collect();

        for _ in 0..self.config.n_trees {
            let residuals: Vec<f64> = y.iter().zip(current.iter()).map(|(&a, &f)| a - f).collect();
            let gradients: Vec<f64> = residuals.iter().map(|&r| r.signum()).collect();
            if residuals.iter().all(|&r| r.abs() < 1e-12) {
                break;
            }

            let tree = build_tree(x, &gradients, &residuals, &indices, 0, &self.config);
            for (i, f) in current.iter_mut().enumerate() {
                *f += self.config.learning_rate * tree.value(&x[i]);
            }
            self.trees.push(tree);
        }

        self.fitted = true;
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        if !self.fitted {
            return Err(PipelineError::FitRequired);
        }
        x.iter()
            .map(|row| {
                if row.len() != self.n_features {
                    return Err(PipelineError::DimensionMismatch {
                        expected: self.n_features,
                        got: row.len(),
                    });
                }
                Ok(self.init
                    + self
                        .trees
                        .iter()
                        .map(|t| self.config.learning_rate * t.value(row))
                        .sum::<f64>())
            })
            .collect()
    }

    fn name(&self) -> &str {
        "gradient_boosting"
    }
}
