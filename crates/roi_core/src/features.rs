//! Project features and partial feature requests
//!
//! The project dataset has three numeric columns and two categorical ones.
//! Requests may name a feature by its dataset column (`Durata_mesi`) or by
//! its English alias (`duration`).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::errors::{Result, RoiCoreError};

/// Numeric columns of the project dataset, in schema order
pub const NUMERIC_COLUMNS: [&str; 3] = ["Durata_mesi", "Budget_ml", "Team_size"];

/// Categorical columns of the project dataset, in schema order
pub const CATEGORICAL_COLUMNS: [&str; 2] = ["Tecnologia", "Settore"];

/// Target column shared by both datasets
pub const TARGET_COLUMN: &str = "ROI";

/// A recognized project feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKey {
    Duration,
    Budget,
    TeamSize,
    Technology,
    Sector,
}

impl FeatureKey {
    pub const ALL: [FeatureKey; 5] = [
        FeatureKey::Duration,
        FeatureKey::Budget,
        FeatureKey::TeamSize,
        FeatureKey::Technology,
        FeatureKey::Sector,
    ];

    /// Dataset column this feature is read from
    pub fn column(self) -> &'static str {
        match self {
            FeatureKey::Duration => "Durata_mesi",
            FeatureKey::Budget => "Budget_ml",
            FeatureKey::TeamSize => "Team_size",
            FeatureKey::Technology => "Tecnologia",
            FeatureKey::Sector => "Settore",
        }
    }

    pub fn alias(self) -> &'static str {
        match self {
            FeatureKey::Duration => "duration",
            FeatureKey::Budget => "budget",
            FeatureKey::TeamSize => "team_size",
            FeatureKey::Technology => "technology",
            FeatureKey::Sector => "sector",
        }
    }

    pub fn is_categorical(self) -> bool {
        matches!(self, FeatureKey::Technology | FeatureKey::Sector)
    }

    /// Resolve a request key, either the exact column name or the alias
    /// in any letter case
    pub fn parse(key: &str) -> Option<FeatureKey> {
        Self::ALL
            .into_iter()
            .find(|feature| feature.column() == key || feature.alias().eq_ignore_ascii_case(key))
    }

    /// Every accepted spelling, used in error messages
    pub fn allowed_keys() -> Vec<String> {
        Self::ALL
            .iter()
            .flat_map(|feature| [feature.column().to_string(), feature.alias().to_string()])
            .collect()
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.column())
    }
}

/// A user-supplied or imputed feature value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Numeric(f64),
    Category(String),
}

impl FeatureValue {
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            FeatureValue::Numeric(value) => Some(*value),
            FeatureValue::Category(_) => None,
        }
    }

    pub fn as_category(&self) -> Option<&str> {
        match self {
            FeatureValue::Category(value) => Some(value),
            FeatureValue::Numeric(_) => None,
        }
    }
}

impl From<f64> for FeatureValue {
    fn from(value: f64) -> Self {
        FeatureValue::Numeric(value)
    }
}

impl From<&str> for FeatureValue {
    fn from(value: &str) -> Self {
        FeatureValue::Category(value.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(value: String) -> Self {
        FeatureValue::Category(value)
    }
}

/// Raw key/value mapping supplied by a caller
///
/// Keys are kept as given so that unknown or duplicate spellings can be
/// reported; `resolve` turns the request into typed features.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartialFeatureRequest {
    entries: BTreeMap<String, FeatureValue>,
}

impl PartialFeatureRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FeatureValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FeatureValue>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FeatureValue)> {
        self.entries.iter()
    }

    /// Map raw keys to recognized features and check value kinds
    ///
    /// Unknown keys are reported first, then duplicate spellings, then
    /// values of the wrong kind.
    pub fn resolve(&self) -> Result<BTreeMap<FeatureKey, FeatureValue>> {
        let mut resolved = BTreeMap::new();

        for key in self.entries.keys() {
            if FeatureKey::parse(key).is_none() {
                return Err(RoiCoreError::UnknownFeatureKey {
                    key: key.clone(),
                    allowed: FeatureKey::allowed_keys(),
                });
            }
        }

        let mut spellings = BTreeMap::new();
        for key in self.entries.keys() {
            let Some(feature) = FeatureKey::parse(key) else {
                continue;
            };
            if spellings.insert(feature, key).is_some() {
                return Err(RoiCoreError::DuplicateFeatureKey(feature.column().to_string()));
            }
        }

        for (feature, key) in spellings {
            let value = &self.entries[key];
            check_value_kind(feature, key, value)?;
            resolved.insert(feature, value.clone());
        }

        Ok(resolved)
    }
}

impl<K, V> FromIterator<(K, V)> for PartialFeatureRequest
where
    K: Into<String>,
    V: Into<FeatureValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut request = Self::new();
        for (key, value) in iter {
            request.insert(key, value);
        }
        request
    }
}

fn check_value_kind(feature: FeatureKey, key: &str, value: &FeatureValue) -> Result<()> {
    match (feature.is_categorical(), value) {
        (false, FeatureValue::Numeric(v)) if v.is_finite() => Ok(()),
        (false, FeatureValue::Numeric(v)) => Err(RoiCoreError::InvalidFeatureValue {
            key: key.to_string(),
            reason: format!("{v} is not a finite number"),
        }),
        (false, FeatureValue::Category(v)) => Err(RoiCoreError::InvalidFeatureValue {
            key: key.to_string(),
            reason: format!("expected a number, got `{v}`"),
        }),
        (true, FeatureValue::Category(_)) => Ok(()),
        (true, FeatureValue::Numeric(v)) => Err(RoiCoreError::InvalidFeatureValue {
            key: key.to_string(),
            reason: format!("expected a category, got {v}"),
        }),
    }
}
