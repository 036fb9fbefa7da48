//! Estimator configuration
//!
//! Loaded from an optional TOML file. Every section falls back to its
//! defaults, so an empty file is a valid configuration.

use roi_core::{ReconcilePolicy, DEFAULT_MIN_FEATURES};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::errors::TrainerError;
use crate::trainer::ForestParams;

/// Number of recognized project features
const FEATURE_COUNT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RoiConfig {
    pub datasets: DatasetConfig,
    pub forest: ForestParams,
    pub reconcile: ReconcilePolicy,
    pub logging: LoggingConfig,
}

/// Dataset locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Historical projects, used by `estimate`
    pub projects: PathBuf,
    /// Investment scenarios, used by `direct`
    pub investments: PathBuf,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            projects: PathBuf::from("data/progetti_ai.csv"),
            investments: PathBuf::from("data/investimenti_ai.csv"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl RoiConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, TrainerError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, TrainerError> {
        toml::from_str(content)
            .map_err(|e| TrainerError::Config(format!("failed to parse configuration: {e}")))
    }

    /// Validate configuration
    ///
    /// Hard errors for forest parameters no tree can be grown with and for a
    /// request threshold below three features. A threshold above the number
    /// of features is clamped with a warning, otherwise no request could pass.
    pub fn validate(&mut self) -> Result<Vec<String>, TrainerError> {
        self.forest.validate()?;

        if self.reconcile.min_features < DEFAULT_MIN_FEATURES {
            return Err(TrainerError::Config(format!(
                "min_features must be at least {DEFAULT_MIN_FEATURES}, got {}",
                self.reconcile.min_features
            )));
        }

        let mut warnings = Vec::new();

        if self.reconcile.min_features > FEATURE_COUNT {
            warnings.push(format!(
                "min_features {} exceeds the {FEATURE_COUNT} available features, clamped",
                self.reconcile.min_features
            ));
            self.reconcile.min_features = FEATURE_COUNT;
        }

        if self.forest.n_trees < 10 {
            warnings.push(format!(
                "only {} trees, the reliability estimate will be coarse",
                self.forest.n_trees
            ));
        }

        if warnings.is_empty() {
            info!("Configuration validation passed");
        } else {
            warn!("Configuration validation warnings: {:?}", warnings);
        }

        Ok(warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roi_core::UnknownCategoryPolicy;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = RoiConfig::default();
        assert_eq!(config.forest.n_trees, 100);
        assert_eq!(config.forest.seed, 42);
        assert!(config.forest.bootstrap);
        assert_eq!(config.reconcile.min_features, 3);
        assert_eq!(config.reconcile.unknown_category, UnknownCategoryPolicy::Reject);
        assert_eq!(config.datasets.projects, PathBuf::from("data/progetti_ai.csv"));
    }

    #[test]
    fn test_empty_file_is_default() -> anyhow::Result<()> {
        assert_eq!(RoiConfig::from_toml_str("")?, RoiConfig::default());
        Ok(())
    }

    #[test]
    fn test_partial_file() -> anyhow::Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "[forest]")?;
        writeln!(file, "n_trees = 50")?;
        writeln!(file, "max_depth = 6")?;
        writeln!(file, "[reconcile]")?;
        writeln!(file, "unknown_category = \"zero_encode\"")?;
        file.flush()?;

        let config = RoiConfig::load_from_file(file.path())?;
        assert_eq!(config.forest.n_trees, 50);
        assert_eq!(config.forest.max_depth, Some(6));
        assert_eq!(config.forest.seed, 42);
        assert_eq!(config.reconcile.min_features, 3);
        assert_eq!(
            config.reconcile.unknown_category,
            UnknownCategoryPolicy::ZeroEncode
        );
        Ok(())
    }

    #[test]
    fn test_validate() -> anyhow::Result<()> {
        let mut config = RoiConfig::default();
        assert!(config.validate()?.is_empty());

        config.reconcile.min_features = 7;
        let warnings = config.validate()?;
        assert_eq!(warnings.len(), 1);
        assert_eq!(config.reconcile.min_features, 5);

        config.forest.min_samples_split = 1;
        assert!(matches!(config.validate(), Err(TrainerError::Config(_))));
        Ok(())
    }

    #[test]
    fn test_validate_rejects_low_feature_threshold() -> anyhow::Result<()> {
        let mut config = RoiConfig::from_toml_str("[reconcile]\nmin_features = 1")?;
        assert_eq!(config.reconcile.min_features, 1);
        assert!(matches!(config.validate(), Err(TrainerError::Config(_))));

        config.reconcile.min_features = 3;
        assert!(config.validate()?.is_empty());
        Ok(())
    }

    #[test]
    fn test_malformed_file() {
        assert!(matches!(
            RoiConfig::from_toml_str("[forest]\nn_trees = \"many\""),
            Err(TrainerError::Config(_))
        ));
    }
}
