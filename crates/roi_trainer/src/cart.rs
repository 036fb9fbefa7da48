//! CART (Classification and Regression Tree) builder
//!
//! Implements deterministic exact-greedy regression tree construction that
//! minimises squared error. Candidate thresholds are midpoints between
//! consecutive distinct feature values.

use roi_core::{Node, Tree};

use crate::deterministic::{LcgRng, SplitTieBreaker};
use crate::errors::TrainerError;

/// Values closer than this are treated as equal when placing thresholds
const FEATURE_THRESHOLD: f64 = 1e-7;

/// Training parameters for a single tree
#[derive(Clone, Debug, PartialEq)]
pub struct TreeConfig {
    /// `None` grows until leaves are pure or too small to split
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features drawn per split; `None` considers all of them
    pub max_features: Option<usize>,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
        }
    }
}

/// Split candidate with its score and tie-breaker
#[derive(Debug, Clone)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    /// `S_l^2 / n_l + S_r^2 / n_r`; maximising it minimises the children's
    /// summed squared error
    proxy: f64,
    tie_breaker: SplitTieBreaker,
}

/// Build a regression tree using exact-greedy CART algorithm
pub struct CartBuilder<'a> {
    config: TreeConfig,
    features: &'a [Vec<f64>],
    targets: &'a [f64],
    feature_count: usize,
}

impl<'a> CartBuilder<'a> {
    pub fn new(
        features: &'a [Vec<f64>],
        targets: &'a [f64],
        config: TreeConfig,
    ) -> Result<Self, TrainerError> {
        if features.len() != targets.len() {
            return Err(TrainerError::Training(format!(
                "{} feature rows but {} targets",
                features.len(),
                targets.len()
            )));
        }

        let feature_count = features.first().map(Vec::len).unwrap_or(0);
        if let Some(row) = features.iter().position(|row| row.len() != feature_count) {
            return Err(TrainerError::Training(format!(
                "row {row} has {} features, expected {feature_count}",
                features[row].len()
            )));
        }

        Ok(Self {
            config,
            features,
            targets,
            feature_count,
        })
    }

    /// Build a tree over the given sample indices (duplicates allowed)
    pub fn build(&self, sample: &[usize], rng: &mut LcgRng) -> Tree {
        let mut nodes = Vec::new();
        if sample.is_empty() {
            nodes.push(Node::leaf(0, 0.0, 0, 0.0));
        } else {
            self.build_node(sample, 0, &mut nodes, rng);
        }
        Tree::new(nodes)
    }

    /// Recursively build tree nodes in pre-order
    fn build_node(
        &self,
        indices: &[usize],
        depth: usize,
        nodes: &mut Vec<Node>,
        rng: &mut LcgRng,
    ) -> i32 {
        let current_idx = nodes.len() as i32;
        let (mean, impurity) = self.mean_and_variance(indices);
        let samples = indices.len();

        let depth_reached = self.config.max_depth.is_some_and(|max| depth >= max);
        if depth_reached
            || samples < self.config.min_samples_split
            || samples < 2 * self.config.min_samples_leaf
            || impurity <= f64::EPSILON
        {
            nodes.push(Node::leaf(current_idx, mean, samples, impurity));
            return current_idx;
        }

        let Some(split) = self.find_best_split(indices, rng) else {
            nodes.push(Node::leaf(current_idx, mean, samples, impurity));
            return current_idx;
        };

        let (left_indices, right_indices) =
            self.split_samples(indices, split.feature_idx, split.threshold);

        // Reserve space for current node
        nodes.push(Node::internal(
            current_idx,
            split.feature_idx as i32,
            split.threshold,
            -1,
            -1,
            samples,
            impurity,
        ));

        let left_idx = self.build_node(&left_indices, depth + 1, nodes, rng);
        let right_idx = self.build_node(&right_indices, depth + 1, nodes, rng);

        nodes[current_idx as usize].left = left_idx;
        nodes[current_idx as usize].right = right_idx;

        current_idx
    }

    fn candidate_features(&self, rng: &mut LcgRng) -> Vec<usize> {
        match self.config.max_features {
            Some(k) if k < self.feature_count => rng.choose_features(self.feature_count, k),
            _ => (0..self.feature_count).collect(),
        }
    }

    /// Find best split using exact-greedy algorithm
    fn find_best_split(&self, indices: &[usize], rng: &mut LcgRng) -> Option<SplitCandidate> {
        let mut best: Option<SplitCandidate> = None;
        let n = indices.len();
        let total: f64 = indices.iter().map(|&i| self.targets[i]).sum();
        let min_leaf = self.config.min_samples_leaf.max(1);

        for feature_idx in self.candidate_features(rng) {
            let mut column: Vec<(f64, f64)> = indices
                .iter()
                .map(|&i| (self.features[i][feature_idx], self.targets[i]))
                .collect();
            column.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_sum = 0.0;
            let mut rank = 0usize;

            for pos in 1..n {
                left_sum += column[pos - 1].1;

                let (prev, next) = (column[pos - 1].0, column[pos].0);
                if next <= prev + FEATURE_THRESHOLD {
                    continue;
                }
                rank += 1;

                let (n_left, n_right) = (pos, n - pos);
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }

                let right_sum = total - left_sum;
                let proxy = left_sum * left_sum / n_left as f64 + right_sum * right_sum / n_right as f64;

                let mut threshold = prev / 2.0 + next / 2.0;
                if threshold >= next {
                    threshold = prev;
                }

                let candidate = SplitCandidate {
                    feature_idx,
                    threshold,
                    proxy,
                    tie_breaker: SplitTieBreaker::new(feature_idx, rank),
                };

                best = match best {
                    None => Some(candidate),
                    Some(current) => {
                        if candidate.proxy > current.proxy
                            || (candidate.proxy == current.proxy
                                && candidate.tie_breaker < current.tie_breaker)
                        {
                            Some(candidate)
                        } else {
                            Some(current)
                        }
                    }
                };
            }
        }

        best
    }

    /// Split samples based on threshold
    fn split_samples(
        &self,
        indices: &[usize],
        feature_idx: usize,
        threshold: f64,
    ) -> (Vec<usize>, Vec<usize>) {
        indices
            .iter()
            .copied()
            .partition(|&idx| self.features[idx][feature_idx] <= threshold)
    }

    /// Leaf value (mean target) and node impurity (target variance)
    fn mean_and_variance(&self, indices: &[usize]) -> (f64, f64) {
        if indices.is_empty() {
            return (0.0, 0.0);
        }
        let n = indices.len() as f64;
        let mean = indices.iter().map(|&i| self.targets[i]).sum::<f64>() / n;
        let variance = indices
            .iter()
            .map(|&i| (self.targets[i] - mean).powi(2))
            .sum::<f64>()
            / n;
        (mean, variance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all(n: usize) -> Vec<usize> {
        (0..n).collect()
    }

    #[test]
    fn test_simple_tree() -> Result<(), TrainerError> {
        let features = vec![vec![1.0, 10.0], vec![2.0, 10.0], vec![3.0, 20.0], vec![4.0, 20.0]];
        let targets = vec![1.0, 1.0, 5.0, 5.0];

        let builder = CartBuilder::new(&features, &targets, TreeConfig::default())?;
        let tree = builder.build(&all(4), &mut LcgRng::new(42));

        // one split separates the targets perfectly
        assert_eq!(tree.nodes.len(), 3);
        assert!(tree.validate(2).is_ok());
        // both features separate equally well: the lower index wins
        assert_eq!(tree.nodes[0].feature_idx, 0);
        assert_eq!(tree.nodes[0].threshold, 2.5);
        assert_eq!(tree.evaluate(&[1.5, 0.0]), Some(1.0));
        assert_eq!(tree.evaluate(&[3.5, 0.0]), Some(5.0));
        Ok(())
    }

    #[test]
    fn test_fully_grown_tree_fits_training_data() -> Result<(), TrainerError> {
        let features: Vec<Vec<f64>> = (0..8).map(|i| vec![i as f64]).collect();
        let targets = vec![3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0];

        let builder = CartBuilder::new(&features, &targets, TreeConfig::default())?;
        let tree = builder.build(&all(8), &mut LcgRng::new(1));

        for (row, target) in features.iter().zip(&targets) {
            assert_eq!(tree.evaluate(row), Some(*target));
        }
        Ok(())
    }

    #[test]
    fn test_leaf_only_tree() -> Result<(), TrainerError> {
        let features = vec![vec![1.0], vec![2.0]];
        let targets = vec![7.0, 7.0];

        let builder = CartBuilder::new(&features, &targets, TreeConfig::default())?;
        let tree = builder.build(&all(2), &mut LcgRng::new(42));

        assert_eq!(tree.nodes.len(), 1);
        assert_eq!(tree.nodes[0].leaf, Some(7.0));
        assert_eq!(tree.nodes[0].samples, 2);
        Ok(())
    }

    #[test]
    fn test_max_depth_and_min_leaf() -> Result<(), TrainerError> {
        let features: Vec<Vec<f64>> = (0..8).map(|i| vec![i as f64]).collect();
        let targets: Vec<f64> = (0..8).map(|i| (i * i) as f64).collect();

        let stump = TreeConfig {
            max_depth: Some(1),
            ..TreeConfig::default()
        };
        let tree = CartBuilder::new(&features, &targets, stump)?.build(&all(8), &mut LcgRng::new(0));
        assert_eq!(tree.depth(), 1);

        let wide_leaves = TreeConfig {
            min_samples_leaf: 4,
            ..TreeConfig::default()
        };
        let tree =
            CartBuilder::new(&features, &targets, wide_leaves)?.build(&all(8), &mut LcgRng::new(0));
        assert!(tree
            .nodes
            .iter()
            .filter(|node| node.is_leaf())
            .all(|leaf| leaf.samples >= 4));
        Ok(())
    }

    #[test]
    fn test_bootstrap_duplicates() -> Result<(), TrainerError> {
        let features = vec![vec![1.0], vec![2.0], vec![3.0]];
        let targets = vec![1.0, 2.0, 3.0];

        let builder = CartBuilder::new(&features, &targets, TreeConfig::default())?;
        let tree = builder.build(&[0, 0, 0], &mut LcgRng::new(0));

        assert_eq!(tree.nodes.len(), 1);
        assert_eq!(tree.evaluate(&[3.0]), Some(1.0));
        Ok(())
    }

    #[test]
    fn test_mismatched_input() {
        let features = vec![vec![1.0], vec![2.0, 3.0]];
        let targets = vec![1.0, 2.0];
        assert!(CartBuilder::new(&features, &targets, TreeConfig::default()).is_err());
        assert!(CartBuilder::new(&features[..1], &targets, TreeConfig::default()).is_err());
    }
}
