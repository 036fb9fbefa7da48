//! AI project ROI estimator
//!
//! Trains random forests on the historical project and investment datasets
//! and answers estimation requests against them. The trained contexts are
//! built once at startup and only read afterwards.

pub mod cart;
pub mod config;
pub mod dataset;
pub mod deterministic;
pub mod direct;
pub mod errors;
pub mod estimator;
pub mod trainer;

use std::path::Path;

pub use config::{DatasetConfig, LoggingConfig, RoiConfig};
pub use dataset::{ColumnRange, InvestmentDataset, ProjectDataset, INVESTMENT_COLUMNS};
pub use deterministic::{LcgRng, SplitTieBreaker};
pub use direct::{DirectInput, DirectPrediction, DirectPredictor, RankedImportance};
pub use errors::TrainerError;
pub use estimator::{
    format_estimate, CategoricalControl, InputControls, NumericControl, ProjectInputs,
    RoiEstimator,
};
pub use trainer::{ForestParams, ForestTrainer};

/// Build the partial-input estimator from a project CSV using the provided configuration.
///
/// The configuration is validated first, so a threshold below three features
/// is rejected before any training happens.
pub fn estimator_from_config(config: &RoiConfig) -> Result<RoiEstimator, TrainerError> {
    let mut config = config.clone();
    config.validate()?;
    RoiEstimator::from_csv(&config.datasets.projects, &config.forest, config.reconcile)
}

/// Build the direct predictor from an investment CSV using the provided forest parameters.
pub fn direct_predictor_from_csv(
    path: &Path,
    params: &ForestParams,
) -> Result<DirectPredictor, TrainerError> {
    DirectPredictor::from_csv(path, params)
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
