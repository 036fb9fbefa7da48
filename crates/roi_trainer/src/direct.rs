//! Direct ROI predictor for fully specified investment scenarios
//!
//! All four numeric inputs are mandatory, so there is no imputation and no
//! categorical encoding. The result carries the ensemble mean and the
//! forest's impurity-based feature importances, ranked for display.

use roi_core::{Forest, RoiCoreError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::dataset::{ColumnRange, InvestmentDataset, INVESTMENT_COLUMNS};
use crate::errors::TrainerError;
use crate::trainer::{ForestParams, ForestTrainer};

/// A complete investment scenario
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectInput {
    pub investment: f64,
    pub duration: f64,
    pub complexity: f64,
    pub impact: f64,
}

impl DirectInput {
    fn to_row(self) -> [f64; 4] {
        [self.investment, self.duration, self.complexity, self.impact]
    }
}

/// Share of the forest's impurity reduction attributed to one input
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedImportance {
    pub feature: String,
    pub weight_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectPrediction {
    pub roi_pred: f64,
    /// Highest weight first
    pub importances: Vec<RankedImportance>,
}

/// Trained context for the investment dataset
#[derive(Debug, Clone)]
pub struct DirectPredictor {
    forest: Forest,
    ranges: Vec<(&'static str, ColumnRange)>,
}

impl DirectPredictor {
    pub fn from_csv<P: AsRef<Path>>(path: P, params: &ForestParams) -> Result<Self, TrainerError> {
        let dataset = InvestmentDataset::from_csv(path)?;
        Self::from_dataset(&dataset, params)
    }

    pub fn from_dataset(
        dataset: &InvestmentDataset,
        params: &ForestParams,
    ) -> Result<Self, TrainerError> {
        let names: Vec<String> = INVESTMENT_COLUMNS.iter().map(|c| c.to_string()).collect();
        let forest =
            ForestTrainer::new(params.clone()).train(&dataset.features(), &dataset.targets(), &names)?;

        info!(rows = dataset.len(), trees = forest.tree_count(), "direct predictor ready");
        Ok(Self {
            forest,
            ranges: dataset.ranges(),
        })
    }

    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    /// Observed range of each input column
    pub fn input_ranges(&self) -> &[(&'static str, ColumnRange)] {
        &self.ranges
    }

    pub fn predict(&self, input: DirectInput) -> roi_core::Result<DirectPrediction> {
        let row = input.to_row();
        if let Some((i, value)) = row.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(RoiCoreError::InvalidFeatureValue {
                key: INVESTMENT_COLUMNS[i].to_string(),
                reason: format!("{value} is not a finite number"),
            });
        }

        let roi_pred = self.forest.predict(&row)?;
        let importances = self
            .forest
            .ranked_importances()
            .into_iter()
            .map(|(feature, weight)| RankedImportance {
                feature,
                weight_pct: weight * 100.0,
            })
            .collect();

        debug!(roi = roi_pred, "direct prediction computed");
        Ok(DirectPrediction {
            roi_pred,
            importances,
        })
    }
}
