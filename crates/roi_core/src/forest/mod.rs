//! Random forest regression inference
//!
//! - **Explicit ensemble**: the forest is a plain vector of trees, so every
//!   tree's own prediction is available next to the ensemble mean
//! - **Impurity bookkeeping**: nodes keep sample counts and variance, which
//!   feature importances are derived from
//! - **Deterministic traversal**: `feature <= threshold` goes left
//!
//! # Usage
//!
//! ```rust
//! use roi_core::forest::{Forest, ForestMetadata, Node, Tree};
//!
//! let tree = Tree::new(vec![
//!     Node::internal(0, 0, 10.0, 1, 2, 4, 0.25),
//!     Node::leaf(1, 1.5, 2, 0.0),
//!     Node::leaf(2, 2.5, 2, 0.0),
//! ]);
//! let forest = Forest::new(vec![tree], vec!["Durata_mesi".into()], ForestMetadata::default());
//!
//! assert_eq!(forest.predict(&[6.0]).unwrap(), 1.5);
//! ```

pub mod model;
pub mod tree;

pub use model::{Forest, ForestMetadata};
pub use tree::{Node, Tree};
