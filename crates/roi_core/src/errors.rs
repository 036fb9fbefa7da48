//! Error types for the ROI core module

use thiserror::Error;

/// Errors that can occur while encoding requests or evaluating the forest
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RoiCoreError {
    /// Request carries fewer recognized features than required
    #[error("at least {required} project features are required, got {supplied}")]
    InsufficientFeatures { supplied: usize, required: usize },

    /// Request carries a key outside the recognized feature set
    #[error("feature `{key}` is not valid, choose among {allowed:?}")]
    UnknownFeatureKey { key: String, allowed: Vec<String> },

    /// Two spellings of the same feature were supplied
    #[error("feature `{0}` was supplied more than once")]
    DuplicateFeatureKey(String),

    /// Value has the wrong kind for its feature, or is not finite
    #[error("invalid value for feature `{key}`: {reason}")]
    InvalidFeatureValue { key: String, reason: String },

    /// Categorical value never observed in the training data
    #[error("value `{value}` was never observed for `{column}`")]
    UnknownCategoryValue { column: String, value: String },

    /// Feature vector width does not match the trained model
    #[error("feature size mismatch: expected {expected}, got {actual}")]
    FeatureSizeMismatch { expected: usize, actual: usize },

    /// Model structure is unusable
    #[error("invalid model: {0}")]
    InvalidModel(String),
}

/// Result type for ROI core operations
pub type Result<T> = std::result::Result<T, RoiCoreError>;
