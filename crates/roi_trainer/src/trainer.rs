//! Random forest trainer
//!
//! Bags independently grown CART regression trees. Every tree draws its
//! bootstrap sample and feature subsets from its own deterministic stream, so
//! the same seed always yields the same forest.

use roi_core::{Forest, ForestMetadata};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cart::{CartBuilder, TreeConfig};
use crate::deterministic::LcgRng;
use crate::errors::TrainerError;

/// Forest training configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    pub n_trees: usize,
    pub seed: u64,
    /// Train each tree on a bootstrap resample instead of the full data
    pub bootstrap: bool,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: Option<usize>,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            seed: 42,
            bootstrap: true,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
        }
    }
}

impl ForestParams {
    /// Reject parameter combinations no tree could be grown with
    pub fn validate(&self) -> Result<(), TrainerError> {
        if self.n_trees == 0 {
            return Err(TrainerError::Config("n_trees must be at least 1".into()));
        }
        if self.min_samples_split < 2 {
            return Err(TrainerError::Config("min_samples_split must be at least 2".into()));
        }
        if self.min_samples_leaf == 0 {
            return Err(TrainerError::Config("min_samples_leaf must be at least 1".into()));
        }
        if self.max_depth == Some(0) {
            return Err(TrainerError::Config("max_depth must be at least 1".into()));
        }
        if self.max_features == Some(0) {
            return Err(TrainerError::Config("max_features must be at least 1".into()));
        }
        Ok(())
    }

    fn tree_config(&self) -> TreeConfig {
        TreeConfig {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            max_features: self.max_features,
        }
    }
}

/// Random forest trainer
pub struct ForestTrainer {
    params: ForestParams,
}

impl ForestTrainer {
    pub fn new(params: ForestParams) -> Self {
        Self { params }
    }

    /// Train a forest on an encoded feature matrix
    pub fn train(
        &self,
        features: &[Vec<f64>],
        targets: &[f64],
        feature_names: &[String],
    ) -> Result<Forest, TrainerError> {
        self.params.validate()?;

        if features.is_empty() {
            return Err(TrainerError::EmptyDataset);
        }
        if features[0].len() != feature_names.len() {
            return Err(TrainerError::Training(format!(
                "{} feature names for {} columns",
                feature_names.len(),
                features[0].len()
            )));
        }

        let builder = CartBuilder::new(features, targets, self.params.tree_config())?;
        let n_samples = features.len();
        let full_sample: Vec<usize> = (0..n_samples).collect();

        info!(
            trees = self.params.n_trees,
            samples = n_samples,
            features = feature_names.len(),
            seed = self.params.seed,
            "training random forest"
        );

        let mut trees = Vec::with_capacity(self.params.n_trees);
        for tree_idx in 0..self.params.n_trees {
            let mut rng = LcgRng::for_tree(self.params.seed, tree_idx);
            let tree = if self.params.bootstrap {
                let sample = rng.bootstrap_indices(n_samples);
                builder.build(&sample, &mut rng)
            } else {
                builder.build(&full_sample, &mut rng)
            };

            debug!(
                "Tree {}/{}: {} nodes, depth {}",
                tree_idx + 1,
                self.params.n_trees,
                tree.nodes.len(),
                tree.depth()
            );
            trees.push(tree);
        }

        let forest = Forest::new(
            trees,
            feature_names.to_vec(),
            ForestMetadata {
                seed: self.params.seed,
                training_samples: n_samples,
                bootstrap: self.params.bootstrap,
            },
        );
        forest.validate()?;

        info!(trees = forest.tree_count(), "training complete");
        Ok(forest)
    }
}
