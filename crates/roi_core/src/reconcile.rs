//! Prediction reconciliation for partial project descriptions
//!
//! A request names between three and five project features. Missing numeric
//! features are filled with the training median, missing categorical ones
//! with the training mode. The completed sample is one-hot encoded, aligned
//! to the trained schema and run through every tree; the spread of the
//! per-tree predictions yields the reliability estimate.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::errors::{Result, RoiCoreError};
use crate::features::{FeatureKey, FeatureValue, PartialFeatureRequest};
use crate::forest::Forest;
use crate::schema::FeatureSchema;

/// Minimum number of distinct features a request must carry
pub const DEFAULT_MIN_FEATURES: usize = 3;

/// Dataset statistics used to fill features a request leaves out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImputationDefaults {
    pub duration_months: f64,
    pub budget_millions: f64,
    pub team_size: f64,
    pub technology: String,
    pub sector: String,
}

/// What to do with a categorical value never seen during training
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownCategoryPolicy {
    /// Fail with `UnknownCategoryValue`
    #[default]
    Reject,
    /// Accept it; its indicator block encodes to all zeros
    ZeroEncode,
}

/// Request validation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilePolicy {
    pub min_features: usize,
    pub unknown_category: UnknownCategoryPolicy,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            min_features: DEFAULT_MIN_FEATURES,
            unknown_category: UnknownCategoryPolicy::default(),
        }
    }
}

/// A complete project description, before encoding
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciledSample {
    pub duration_months: f64,
    pub budget_millions: f64,
    pub team_size: f64,
    pub technology: String,
    pub sector: String,
    /// Features taken from the defaults rather than the request
    pub imputed: Vec<FeatureKey>,
}

impl ReconciledSample {
    fn from_defaults(defaults: &ImputationDefaults) -> Self {
        Self {
            duration_months: defaults.duration_months,
            budget_millions: defaults.budget_millions,
            team_size: defaults.team_size,
            technology: defaults.technology.clone(),
            sector: defaults.sector.clone(),
            imputed: FeatureKey::ALL.to_vec(),
        }
    }

    /// Value of a single feature
    pub fn get(&self, feature: FeatureKey) -> FeatureValue {
        match feature {
            FeatureKey::Duration => FeatureValue::Numeric(self.duration_months),
            FeatureKey::Budget => FeatureValue::Numeric(self.budget_millions),
            FeatureKey::TeamSize => FeatureValue::Numeric(self.team_size),
            FeatureKey::Technology => FeatureValue::Category(self.technology.clone()),
            FeatureKey::Sector => FeatureValue::Category(self.sector.clone()),
        }
    }

    fn set(&mut self, feature: FeatureKey, value: FeatureValue) {
        match (feature, value) {
            (FeatureKey::Duration, FeatureValue::Numeric(v)) => self.duration_months = v,
            (FeatureKey::Budget, FeatureValue::Numeric(v)) => self.budget_millions = v,
            (FeatureKey::TeamSize, FeatureValue::Numeric(v)) => self.team_size = v,
            (FeatureKey::Technology, FeatureValue::Category(v)) => self.technology = v,
            (FeatureKey::Sector, FeatureValue::Category(v)) => self.sector = v,
            // kinds are checked by PartialFeatureRequest::resolve
            _ => return,
        }
        self.imputed.retain(|imputed| *imputed != feature);
    }

    /// Named cells in dataset column order
    pub fn row(&self) -> Vec<(&'static str, FeatureValue)> {
        FeatureKey::ALL
            .iter()
            .map(|feature| (feature.column(), self.get(*feature)))
            .collect()
    }
}

/// Point estimate plus dispersion across trees
///
/// `rel_std_pct` and `reliability_pct` are NaN when the mean prediction is
/// exactly zero; callers must treat NaN as "undefined", not as zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictionResult {
    pub roi_pred: f64,
    pub std_pred: f64,
    pub rel_std_pct: f64,
    pub reliability_pct: f64,
}

impl PredictionResult {
    /// Summarise per-tree predictions
    ///
    /// Uses the population standard deviation. Reliability is
    /// `max(0, 1 - rel_std_pct / 100) * 100`; it is floored at zero but not
    /// capped, so a negative mean can push it above 100.
    pub fn from_tree_predictions(predictions: &[f64]) -> Self {
        if predictions.is_empty() {
            return Self {
                roi_pred: f64::NAN,
                std_pred: f64::NAN,
                rel_std_pct: f64::NAN,
                reliability_pct: f64::NAN,
            };
        }

        let n = predictions.len() as f64;
        let mean = predictions.iter().sum::<f64>() / n;
        let variance = predictions.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / n;
        let std = variance.sqrt();

        let (rel_std_pct, reliability_pct) = if mean != 0.0 {
            let rel = std / mean * 100.0;
            (rel, (1.0 - rel / 100.0).max(0.0) * 100.0)
        } else {
            (f64::NAN, f64::NAN)
        };

        Self {
            roi_pred: mean,
            std_pred: std,
            rel_std_pct,
            reliability_pct,
        }
    }

    /// False when the relative metrics are undefined
    pub fn is_defined(&self) -> bool {
        !self.rel_std_pct.is_nan() && !self.reliability_pct.is_nan()
    }
}

/// Read-only estimation state: schema, trained forest and imputation
/// defaults, all fixed once training completes
#[derive(Debug, Clone)]
pub struct Reconciler {
    schema: FeatureSchema,
    forest: Forest,
    defaults: ImputationDefaults,
    policy: ReconcilePolicy,
}

impl Reconciler {
    pub fn new(
        schema: FeatureSchema,
        forest: Forest,
        defaults: ImputationDefaults,
        policy: ReconcilePolicy,
    ) -> Result<Self> {
        if schema.columns() != forest.feature_names.as_slice() {
            return Err(RoiCoreError::InvalidModel(
                "forest columns do not match the feature schema".to_string(),
            ));
        }
        forest.validate()?;

        Ok(Self {
            schema,
            forest,
            defaults,
            policy,
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    pub fn defaults(&self) -> &ImputationDefaults {
        &self.defaults
    }

    pub fn policy(&self) -> &ReconcilePolicy {
        &self.policy
    }

    /// Validate a request and complete it with the imputation defaults
    pub fn reconcile(&self, request: &PartialFeatureRequest) -> Result<ReconciledSample> {
        let resolved = request.resolve()?;

        if resolved.len() < self.policy.min_features {
            return Err(RoiCoreError::InsufficientFeatures {
                supplied: resolved.len(),
                required: self.policy.min_features,
            });
        }

        if self.policy.unknown_category == UnknownCategoryPolicy::Reject {
            for (feature, value) in &resolved {
                if let Some(level) = value.as_category() {
                    if !self.schema.is_known_level(feature.column(), level) {
                        return Err(RoiCoreError::UnknownCategoryValue {
                            column: feature.column().to_string(),
                            value: level.to_string(),
                        });
                    }
                }
            }
        }

        let mut sample = ReconciledSample::from_defaults(&self.defaults);
        for (feature, value) in resolved {
            sample.set(feature, value);
        }
        Ok(sample)
    }

    /// One-hot encode a sample and align it to the schema
    pub fn encode(&self, sample: &ReconciledSample) -> Result<Vec<f64>> {
        self.schema.encode(&sample.row())
    }

    /// Estimate ROI for a partial project description
    pub fn estimate(&self, request: &PartialFeatureRequest) -> Result<PredictionResult> {
        self.estimate_detailed(request).map(|(_, result)| result)
    }

    /// Estimate ROI and return the completed sample it was computed from
    #[instrument(skip(self, request), fields(keys = request.len()))]
    pub fn estimate_detailed(
        &self,
        request: &PartialFeatureRequest,
    ) -> Result<(ReconciledSample, PredictionResult)> {
        let sample = self.reconcile(request)?;
        debug!(imputed = ?sample.imputed, "request reconciled");

        let encoded = self.encode(&sample)?;
        let predictions = self.forest.predict_per_tree(&encoded)?;
        let result = PredictionResult::from_tree_predictions(&predictions);

        debug!(
            roi = result.roi_pred,
            std = result.std_pred,
            reliability = result.reliability_pct,
            "estimate computed"
        );
        Ok((sample, result))
    }
}
