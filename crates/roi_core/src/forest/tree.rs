//! Regression tree structures for forest inference
//!
//! Nodes live in a flat vector with node 0 as the root. Traversal goes left
//! when `feature <= threshold`.

/// A regression tree node (internal or leaf)
///
/// For internal nodes:
/// - `feature_idx >= 0`: index into the encoded feature vector
/// - `left` and `right` point to child node indices
/// - `leaf` is `None`
///
/// For leaf nodes:
/// - `feature_idx == -1`
/// - `leaf` holds the mean target of the training samples that reached it
///
/// Every node keeps the number of training samples it saw and their target
/// variance, which is what impurity-based importances are computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: i32,
    pub left: i32,
    pub right: i32,
    pub feature_idx: i32,
    pub threshold: f64,
    pub leaf: Option<f64>,
    pub samples: usize,
    pub impurity: f64,
}

impl Node {
    /// Create a new internal (split) node
    pub fn internal(
        id: i32,
        feature_idx: i32,
        threshold: f64,
        left: i32,
        right: i32,
        samples: usize,
        impurity: f64,
    ) -> Self {
        Self {
            id,
            left,
            right,
            feature_idx,
            threshold,
            leaf: None,
            samples,
            impurity,
        }
    }

    /// Create a new leaf node
    pub fn leaf(id: i32, value: f64, samples: usize, impurity: f64) -> Self {
        Self {
            id,
            left: -1,
            right: -1,
            feature_idx: -1,
            threshold: 0.0,
            leaf: Some(value),
            samples,
            impurity,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.feature_idx == -1 || self.leaf.is_some()
    }

    pub fn leaf_value(&self) -> Option<f64> {
        self.leaf
    }
}

/// A single regression tree of the ensemble
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    /// Tree nodes (node 0 is the root)
    pub nodes: Vec<Node>,
}

impl Tree {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Evaluate this tree on an encoded feature vector
    ///
    /// Returns `None` when the structure is broken or the vector is too short
    /// for a split feature. `Tree::validate` rules out the former for trees
    /// coming out of the trainer.
    pub fn evaluate(&self, features: &[f64]) -> Option<f64> {
        let mut idx = 0usize;

        loop {
            let node = self.nodes.get(idx)?;

            if node.is_leaf() {
                return node.leaf_value();
            }

            let feature_value = *features.get(node.feature_idx as usize)?;

            let next = if feature_value <= node.threshold {
                node.left
            } else {
                node.right
            };
            if next < 0 {
                return None;
            }
            idx = next as usize;
        }
    }

    pub fn root(&self) -> Option<&Node> {
        self.nodes.first()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match nodes.get(idx) {
                Some(node) if !node.is_leaf() => {
                    1 + walk(nodes, node.left as usize).max(walk(nodes, node.right as usize))
                }
                _ => 0,
            }
        }
        walk(&self.nodes, 0)
    }

    /// Weighted impurity decrease accumulated per feature
    ///
    /// For each split node: `n * imp - n_left * imp_left - n_right * imp_right`,
    /// divided by the root sample count.
    pub fn impurity_decrease(&self, feature_count: usize) -> Vec<f64> {
        let mut decrease = vec![0.0; feature_count];
        let root_samples = match self.root() {
            Some(root) if root.samples > 0 => root.samples as f64,
            _ => return decrease,
        };

        for node in self.nodes.iter().filter(|node| !node.is_leaf()) {
            let (Some(left), Some(right)) = (
                self.nodes.get(node.left as usize),
                self.nodes.get(node.right as usize),
            ) else {
                continue;
            };
            let Some(slot) = decrease.get_mut(node.feature_idx as usize) else {
                continue;
            };
            *slot += (node.samples as f64 * node.impurity
                - left.samples as f64 * left.impurity
                - right.samples as f64 * right.impurity)
                / root_samples;
        }

        decrease
    }

    /// Validate tree structure
    pub fn validate(&self, feature_count: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("Tree has no nodes".to_string());
        }

        for (i, node) in self.nodes.iter().enumerate() {
            if node.is_leaf() {
                match node.leaf {
                    Some(value) if value.is_finite() => {}
                    Some(value) => return Err(format!("Leaf node {i} has non-finite value {value}")),
                    None => return Err(format!("Leaf node {i} has no leaf value")),
                }
                continue;
            }

            if node.left <= i as i32 || node.left as usize >= self.nodes.len() {
                return Err(format!("Node {} has invalid left child: {}", i, node.left));
            }
            if node.right <= i as i32 || node.right as usize >= self.nodes.len() {
                return Err(format!("Node {} has invalid right child: {}", i, node.right));
            }
            if node.feature_idx < 0 || node.feature_idx as usize >= feature_count {
                return Err(format!(
                    "Internal node {} has invalid feature index: {}",
                    i, node.feature_idx
                ));
            }
            if !node.threshold.is_finite() {
                return Err(format!("Internal node {i} has non-finite threshold"));
            }
        }

        Ok(())
    }
}
