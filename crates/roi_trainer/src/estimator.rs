//! ROI estimator for partial project descriptions
//!
//! Builds the read-only estimation context once: load the project dataset,
//! derive the imputation defaults, fit the one-hot schema, encode the
//! training matrix and train the forest. The context is then shared by
//! reference for every request.

use roi_core::{
    FeatureKey, FeatureSchema, PartialFeatureRequest, PredictionResult, ReconcilePolicy,
    ReconciledSample, Reconciler, NUMERIC_COLUMNS,
};
use serde::Serialize;
use std::path::Path;
use tracing::{info, instrument};

use crate::dataset::ProjectDataset;
use crate::errors::TrainerError;
use crate::trainer::{ForestParams, ForestTrainer};

/// Raw values from an input surface where every control has a value
///
/// A numeric value of zero or below and a blank category both mean the
/// control was left unset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectInputs {
    pub duration: f64,
    pub budget: f64,
    pub team_size: f64,
    pub technology: String,
    pub sector: String,
}

impl ProjectInputs {
    /// Request holding only the controls that were set, keyed by alias
    pub fn to_request(&self) -> PartialFeatureRequest {
        let mut request = PartialFeatureRequest::new();
        for (feature, value) in [
            (FeatureKey::Duration, self.duration),
            (FeatureKey::Budget, self.budget),
            (FeatureKey::TeamSize, self.team_size),
        ] {
            if value > 0.0 {
                request.insert(feature.alias(), value);
            }
        }
        for (feature, value) in [
            (FeatureKey::Technology, &self.technology),
            (FeatureKey::Sector, &self.sector),
        ] {
            let value = value.trim();
            if !value.is_empty() {
                request.insert(feature.alias(), value);
            }
        }
        request
    }
}

/// Human-readable estimate, two decimals per figure
pub fn format_estimate(result: &PredictionResult) -> String {
    let reliability = if result.reliability_pct.is_nan() {
        "undefined (mean prediction is zero)".to_string()
    } else {
        format!("{:.2}%", result.reliability_pct)
    };
    format!(
        "Predicted ROI: {:.2}\nReliability: {reliability}\nStandard deviation: {:.2}",
        result.roi_pred, result.std_pred
    )
}

/// Bounds and default of a numeric input control
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericControl {
    pub feature: FeatureKey,
    pub min: f64,
    pub max: f64,
    /// Value used when the control is left unset
    pub default: f64,
}

/// Choices of a categorical selector; leaving it unset is always allowed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoricalControl {
    pub feature: FeatureKey,
    pub options: Vec<String>,
    pub default: String,
}

/// What an input surface needs to render its controls
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputControls {
    pub numeric: Vec<NumericControl>,
    pub categorical: Vec<CategoricalControl>,
    pub min_features: usize,
}

/// Trained estimation context
#[derive(Debug, Clone)]
pub struct RoiEstimator {
    reconciler: Reconciler,
    controls: InputControls,
}

impl RoiEstimator {
    /// Load the project CSV and train
    pub fn from_csv<P: AsRef<Path>>(
        path: P,
        params: &ForestParams,
        policy: ReconcilePolicy,
    ) -> Result<Self, TrainerError> {
        let dataset = ProjectDataset::from_csv(path)?;
        Self::from_dataset(&dataset, params, policy)
    }

    #[instrument(skip_all, fields(rows = dataset.len()))]
    pub fn from_dataset(
        dataset: &ProjectDataset,
        params: &ForestParams,
        policy: ReconcilePolicy,
    ) -> Result<Self, TrainerError> {
        let defaults = dataset.imputation_defaults()?;

        let technologies = dataset.categorical_column(FeatureKey::Technology);
        let sectors = dataset.categorical_column(FeatureKey::Sector);
        let schema = FeatureSchema::fit(
            &NUMERIC_COLUMNS,
            &[
                (FeatureKey::Technology.column(), &technologies[..]),
                (FeatureKey::Sector.column(), &sectors[..]),
            ],
        );
        info!(width = schema.width(), columns = ?schema.columns(), "feature schema fixed");

        let features = dataset
            .records
            .iter()
            .map(|record| schema.encode(&ProjectDataset::row(record)))
            .collect::<Result<Vec<_>, _>>()?;

        let forest = ForestTrainer::new(params.clone()).train(
            &features,
            &dataset.targets(),
            schema.columns(),
        )?;

        let controls = Self::build_controls(dataset, &defaults, policy.min_features);
        let reconciler = Reconciler::new(schema, forest, defaults, policy)?;

        info!(
            trees = reconciler.forest().tree_count(),
            defaults = ?reconciler.defaults(),
            "estimator ready"
        );
        Ok(Self {
            reconciler,
            controls,
        })
    }

    fn build_controls(
        dataset: &ProjectDataset,
        defaults: &roi_core::ImputationDefaults,
        min_features: usize,
    ) -> InputControls {
        let numeric = [
            (FeatureKey::Duration, defaults.duration_months),
            (FeatureKey::Budget, defaults.budget_millions),
            (FeatureKey::TeamSize, defaults.team_size),
        ]
        .into_iter()
        .filter_map(|(feature, default)| {
            dataset.range(feature).map(|range| NumericControl {
                feature,
                min: range.min,
                max: range.max,
                default,
            })
        })
        .collect();

        let categorical = [
            (FeatureKey::Technology, &defaults.technology),
            (FeatureKey::Sector, &defaults.sector),
        ]
        .into_iter()
        .map(|(feature, default)| CategoricalControl {
            feature,
            options: dataset.categories(feature),
            default: default.clone(),
        })
        .collect();

        InputControls {
            numeric,
            categorical,
            min_features,
        }
    }

    /// Estimate ROI and reliability for a partial project description
    pub fn estimate(&self, request: &PartialFeatureRequest) -> roi_core::Result<PredictionResult> {
        self.reconciler.estimate(request)
    }

    /// Estimate together with the completed sample, imputed features included
    pub fn estimate_detailed(
        &self,
        request: &PartialFeatureRequest,
    ) -> roi_core::Result<(ReconciledSample, PredictionResult)> {
        self.reconciler.estimate_detailed(request)
    }

    /// Completed sample for a request, without running the forest
    pub fn reconcile(&self, request: &PartialFeatureRequest) -> roi_core::Result<ReconciledSample> {
        self.reconciler.reconcile(request)
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn input_controls(&self) -> &InputControls {
        &self.controls
    }
}
