//! One-hot encoding and feature schema alignment
//!
//! Categorical columns are fully expanded: every observed level becomes its
//! own indicator column and no reference level is dropped. The resulting
//! ordered column list is the schema every encoded row is projected onto.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::errors::{Result, RoiCoreError};
use crate::features::FeatureValue;

/// Named cells of a single row before encoding
pub type RowValues<'a> = [(&'a str, FeatureValue)];

/// A categorical column and its observed levels (sorted, deduplicated)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoricalColumn {
    pub name: String,
    pub levels: Vec<String>,
}

/// Ordered encoded column layout fixed at training time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    columns: Vec<String>,
    numeric: Vec<String>,
    categorical: Vec<CategoricalColumn>,
}

/// Name of the indicator column for `level` of `column`
pub fn indicator_name(column: &str, level: &str) -> String {
    format!("{column}_{level}")
}

/// Expand one row into named encoded cells using only its own values
///
/// Numeric cells keep their name. A categorical cell `column = level` becomes
/// a single `column_level = 1.0` indicator.
pub fn one_hot_expand(row: &RowValues<'_>, categorical: &[&str]) -> Result<Vec<(String, f64)>> {
    let mut expanded = Vec::with_capacity(row.len());

    for (name, value) in row {
        let is_categorical = categorical.contains(name);
        match (is_categorical, value) {
            (false, FeatureValue::Numeric(v)) => expanded.push((name.to_string(), *v)),
            (true, FeatureValue::Category(level)) => {
                expanded.push((indicator_name(name, level), 1.0))
            }
            (false, FeatureValue::Category(level)) => {
                return Err(RoiCoreError::InvalidFeatureValue {
                    key: name.to_string(),
                    reason: format!("expected a number, got `{level}`"),
                })
            }
            (true, FeatureValue::Numeric(v)) => {
                return Err(RoiCoreError::InvalidFeatureValue {
                    key: name.to_string(),
                    reason: format!("expected a category, got {v}"),
                })
            }
        }
    }

    Ok(expanded)
}

impl FeatureSchema {
    /// Build the schema from numeric column names and the values observed
    /// for each categorical column
    ///
    /// Layout: numeric columns in the given order, then one block per
    /// categorical column with its levels sorted ascending.
    pub fn fit<S: AsRef<str>>(numeric: &[&str], categorical: &[(&str, &[S])]) -> Self {
        let numeric: Vec<String> = numeric.iter().map(|name| name.to_string()).collect();

        let categorical: Vec<CategoricalColumn> = categorical
            .iter()
            .map(|(name, observed)| {
                let levels: BTreeSet<&str> = observed.iter().map(|value| value.as_ref()).collect();
                CategoricalColumn {
                    name: name.to_string(),
                    levels: levels.into_iter().map(str::to_string).collect(),
                }
            })
            .collect();

        let mut columns = numeric.clone();
        for column in &categorical {
            columns.extend(column.levels.iter().map(|level| indicator_name(&column.name, level)));
        }

        debug!(
            width = columns.len(),
            numeric = numeric.len(),
            categorical = categorical.len(),
            "feature schema fitted"
        );

        Self {
            columns,
            numeric,
            categorical,
        }
    }

    /// Encoded column names in model order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn numeric_columns(&self) -> &[String] {
        &self.numeric
    }

    pub fn categorical_columns(&self) -> &[CategoricalColumn] {
        &self.categorical
    }

    /// Observed levels of a categorical column
    pub fn levels(&self, column: &str) -> Option<&[String]> {
        self.categorical
            .iter()
            .find(|c| c.name == column)
            .map(|c| c.levels.as_slice())
    }

    pub fn is_known_level(&self, column: &str, level: &str) -> bool {
        self.levels(column)
            .is_some_and(|levels| levels.iter().any(|l| l == level))
    }

    /// Project expanded cells onto the schema
    ///
    /// Schema columns absent from `expanded` are zero, cells the schema does
    /// not know are dropped, and the output follows schema order.
    pub fn align(&self, expanded: &[(String, f64)]) -> Vec<f64> {
        let cells: HashMap<&str, f64> = expanded
            .iter()
            .map(|(name, value)| (name.as_str(), *value))
            .collect();

        self.columns
            .iter()
            .map(|column| cells.get(column.as_str()).copied().unwrap_or(0.0))
            .collect()
    }

    /// Expand then align a row
    pub fn encode(&self, row: &RowValues<'_>) -> Result<Vec<f64>> {
        let categorical: Vec<&str> = self.categorical.iter().map(|c| c.name.as_str()).collect();
        let expanded = one_hot_expand(row, &categorical)?;
        Ok(self.align(&expanded))
    }
}
