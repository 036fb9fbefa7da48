use roi_core::RoiCoreError;
use thiserror::Error;

/// Errors returned while loading data, training or configuring the estimator.
#[derive(Debug, Error)]
pub enum TrainerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("dataset is empty")]
    EmptyDataset,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("training error: {0}")]
    Training(String),

    #[error(transparent)]
    Core(#[from] RoiCoreError),
}
