//! ROI estimation core
//!
//! Inference-side building blocks for estimating the return on investment
//! of an AI project from a partial description.
//!
//! Modules:
//! - `features`: recognized project features and partial feature requests
//! - `schema`: one-hot expansion and alignment to the trained column layout
//! - `forest`: random forest regression trees with per-tree evaluation
//! - `reconcile`: imputation, encoding and dispersion-based reliability
//! - `errors`: validation and model errors

pub mod errors;
pub mod features;
pub mod forest;
pub mod reconcile;
pub mod schema;

pub use errors::{Result, RoiCoreError};
pub use features::{
    FeatureKey, FeatureValue, PartialFeatureRequest, CATEGORICAL_COLUMNS, NUMERIC_COLUMNS,
    TARGET_COLUMN,
};
pub use forest::{Forest, ForestMetadata, Node, Tree};
pub use reconcile::{
    ImputationDefaults, PredictionResult, ReconcilePolicy, ReconciledSample, Reconciler,
    UnknownCategoryPolicy, DEFAULT_MIN_FEATURES,
};
pub use schema::{indicator_name, one_hot_expand, CategoricalColumn, FeatureSchema};
