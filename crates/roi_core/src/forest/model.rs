//! Random forest regression model
//!
//! An explicit collection of independently trained regression trees. Each
//! tree can be queried on its own, which is what the dispersion-based
//! reliability estimate is built on.

use super::tree::Tree;
use crate::errors::{Result, RoiCoreError};

/// Parameters the forest was trained with, kept for logging and inspection
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ForestMetadata {
    pub seed: u64,
    pub training_samples: usize,
    pub bootstrap: bool,
}

/// Ensemble of regression trees averaged at prediction time
#[derive(Debug, Clone, PartialEq)]
pub struct Forest {
    /// Trees in training order
    pub trees: Vec<Tree>,

    /// Encoded column names, in the order every input row must follow
    pub feature_names: Vec<String>,

    pub metadata: ForestMetadata,
}

impl Forest {
    pub fn new(trees: Vec<Tree>, feature_names: Vec<String>, metadata: ForestMetadata) -> Self {
        Self {
            trees,
            feature_names,
            metadata,
        }
    }

    pub fn feature_count(&self) -> usize {
        self.feature_names.len()
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    /// Validate model structure
    pub fn validate(&self) -> Result<()> {
        if self.trees.is_empty() {
            return Err(RoiCoreError::InvalidModel(
                "forest must have at least one tree".to_string(),
            ));
        }

        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.feature_count()).map_err(|e| {
                RoiCoreError::InvalidModel(format!("tree {i} validation failed: {e}"))
            })?;
        }

        Ok(())
    }

    /// One prediction per tree, in tree order
    pub fn predict_per_tree(&self, features: &[f64]) -> Result<Vec<f64>> {
        if features.len() != self.feature_count() {
            return Err(RoiCoreError::FeatureSizeMismatch {
                expected: self.feature_count(),
                actual: features.len(),
            });
        }

        self.trees
            .iter()
            .enumerate()
            .map(|(i, tree)| {
                tree.evaluate(features).ok_or_else(|| {
                    RoiCoreError::InvalidModel(format!("tree {i} could not be traversed"))
                })
            })
            .collect()
    }

    /// Ensemble prediction: mean of the per-tree predictions
    pub fn predict(&self, features: &[f64]) -> Result<f64> {
        let predictions = self.predict_per_tree(features)?;
        if predictions.is_empty() {
            return Err(RoiCoreError::InvalidModel("forest has no trees".to_string()));
        }
        Ok(predictions.iter().sum::<f64>() / predictions.len() as f64)
    }

    /// Mean decrease in impurity, normalised to sum to 1
    ///
    /// Each tree's decreases are normalised on their own before averaging, so
    /// every tree that split carries the same weight. Trees that never split
    /// contribute nothing; if none split the result is all zeros.
    pub fn feature_importances(&self) -> Vec<f64> {
        let n = self.feature_count();
        let mut total = vec![0.0; n];

        for tree in &self.trees {
            let decrease = tree.impurity_decrease(n);
            let sum: f64 = decrease.iter().sum();
            if sum <= 0.0 {
                continue;
            }
            for (acc, value) in total.iter_mut().zip(decrease) {
                *acc += value / sum;
            }
        }

        let grand_total: f64 = total.iter().sum();
        if grand_total > 0.0 {
            for value in &mut total {
                *value /= grand_total;
            }
        }
        total
    }

    /// Feature names paired with their importance, highest first
    ///
    /// Equal importances keep column order.
    pub fn ranked_importances(&self) -> Vec<(String, f64)> {
        let mut ranked: Vec<(String, f64)> = self
            .feature_names
            .iter()
            .cloned()
            .zip(self.feature_importances())
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }
}
