//! CSV dataset loading and column statistics
//!
//! Two fixed schemas are supported: historical AI projects (numeric and
//! categorical columns) and investment scenarios (numeric only). Both are
//! read once, validated, and never mutated afterwards.

use roi_core::{FeatureKey, FeatureValue, ImputationDefaults};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::debug;

use crate::errors::TrainerError;

/// Columns of the investment dataset, in feature order
pub const INVESTMENT_COLUMNS: [&str; 4] = ["Investimenti", "Durata", "Complessita", "Impatto"];

/// One historical project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    #[serde(rename = "Durata_mesi")]
    pub duration_months: f64,
    #[serde(rename = "Budget_ml")]
    pub budget_millions: f64,
    #[serde(rename = "Team_size")]
    pub team_size: f64,
    #[serde(rename = "Tecnologia")]
    pub technology: String,
    #[serde(rename = "Settore")]
    pub sector: String,
    #[serde(rename = "ROI")]
    pub roi: f64,
}

/// One investment scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentRecord {
    #[serde(rename = "Investimenti")]
    pub investment: f64,
    #[serde(rename = "Durata")]
    pub duration: f64,
    #[serde(rename = "Complessita")]
    pub complexity: f64,
    #[serde(rename = "Impatto")]
    pub impact: f64,
    #[serde(rename = "ROI")]
    pub roi: f64,
}

trait NumericCells {
    fn numeric_cells(&self) -> Vec<(&'static str, f64)>;
}

impl NumericCells for ProjectRecord {
    fn numeric_cells(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("Durata_mesi", self.duration_months),
            ("Budget_ml", self.budget_millions),
            ("Team_size", self.team_size),
            ("ROI", self.roi),
        ]
    }
}

impl NumericCells for InvestmentRecord {
    fn numeric_cells(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("Investimenti", self.investment),
            ("Durata", self.duration),
            ("Complessita", self.complexity),
            ("Impatto", self.impact),
            ("ROI", self.roi),
        ]
    }
}

/// Read every record of a headed CSV, rejecting empty files and
/// non-finite numbers
fn read_records<T, R>(reader: R) -> Result<Vec<T>, TrainerError>
where
    T: DeserializeOwned + NumericCells,
    R: Read,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);

    let mut records = Vec::new();
    for (row_idx, result) in csv_reader.deserialize::<T>().enumerate() {
        let record = result?;
        for (column, value) in record.numeric_cells() {
            if !value.is_finite() {
                return Err(TrainerError::Dataset(format!(
                    "row {}: column {column} is not a finite number",
                    row_idx + 1
                )));
            }
        }
        records.push(record);
    }

    if records.is_empty() {
        return Err(TrainerError::EmptyDataset);
    }
    Ok(records)
}

/// Observed range of a numeric column
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColumnRange {
    pub min: f64,
    pub max: f64,
}

impl ColumnRange {
    fn of(values: &[f64]) -> Option<Self> {
        let first = *values.first()?;
        Some(values.iter().fold(Self { min: first, max: first }, |range, &v| Self {
            min: range.min.min(v),
            max: range.max.max(v),
        }))
    }
}

/// Median with the midpoint rule for even counts
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Most frequent value; ties go to the lexicographically smallest value
pub fn mode<'a>(values: &[&'a str]) -> Option<&'a str> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in values {
        *counts.entry(*value).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(value, _)| value)
}

/// Distinct values in first-seen order
pub fn distinct_in_order<'a>(values: &[&'a str]) -> Vec<&'a str> {
    let mut seen = Vec::new();
    for value in values {
        if !seen.contains(value) {
            seen.push(*value);
        }
    }
    seen
}

/// Historical AI projects
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectDataset {
    pub records: Vec<ProjectRecord>,
}

impl ProjectDataset {
    /// Load from a CSV file with a header row
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self, TrainerError> {
        let file = std::fs::File::open(path.as_ref())?;
        let dataset = Self::from_reader(file)?;
        debug!(path = %path.as_ref().display(), rows = dataset.len(), "project dataset loaded");
        Ok(dataset)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, TrainerError> {
        Ok(Self {
            records: read_records(reader)?,
        })
    }

    pub fn from_records(records: Vec<ProjectRecord>) -> Result<Self, TrainerError> {
        if records.is_empty() {
            return Err(TrainerError::EmptyDataset);
        }
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Values of a numeric feature; empty for categorical features
    pub fn numeric_column(&self, feature: FeatureKey) -> Vec<f64> {
        self.records
            .iter()
            .filter_map(|record| match feature {
                FeatureKey::Duration => Some(record.duration_months),
                FeatureKey::Budget => Some(record.budget_millions),
                FeatureKey::TeamSize => Some(record.team_size),
                FeatureKey::Technology | FeatureKey::Sector => None,
            })
            .collect()
    }

    /// Values of a categorical feature; empty for numeric features
    pub fn categorical_column(&self, feature: FeatureKey) -> Vec<&str> {
        self.records
            .iter()
            .filter_map(|record| match feature {
                FeatureKey::Technology => Some(record.technology.as_str()),
                FeatureKey::Sector => Some(record.sector.as_str()),
                FeatureKey::Duration | FeatureKey::Budget | FeatureKey::TeamSize => None,
            })
            .collect()
    }

    pub fn targets(&self) -> Vec<f64> {
        self.records.iter().map(|record| record.roi).collect()
    }

    /// Named cells of a record, in dataset column order, without the target
    pub fn row(record: &ProjectRecord) -> Vec<(&'static str, FeatureValue)> {
        vec![
            (FeatureKey::Duration.column(), FeatureValue::Numeric(record.duration_months)),
            (FeatureKey::Budget.column(), FeatureValue::Numeric(record.budget_millions)),
            (FeatureKey::TeamSize.column(), FeatureValue::Numeric(record.team_size)),
            (FeatureKey::Technology.column(), FeatureValue::Category(record.technology.clone())),
            (FeatureKey::Sector.column(), FeatureValue::Category(record.sector.clone())),
        ]
    }

    /// Medians of the numeric columns and modes of the categorical ones
    pub fn imputation_defaults(&self) -> Result<ImputationDefaults, TrainerError> {
        let median_of = |feature: FeatureKey| {
            median(&self.numeric_column(feature)).ok_or(TrainerError::EmptyDataset)
        };
        let mode_of = |feature: FeatureKey| {
            mode(&self.categorical_column(feature))
                .map(str::to_string)
                .ok_or(TrainerError::EmptyDataset)
        };

        Ok(ImputationDefaults {
            duration_months: median_of(FeatureKey::Duration)?,
            budget_millions: median_of(FeatureKey::Budget)?,
            team_size: median_of(FeatureKey::TeamSize)?,
            technology: mode_of(FeatureKey::Technology)?,
            sector: mode_of(FeatureKey::Sector)?,
        })
    }

    pub fn range(&self, feature: FeatureKey) -> Option<ColumnRange> {
        ColumnRange::of(&self.numeric_column(feature))
    }

    /// Distinct values of a categorical feature in first-seen order
    pub fn categories(&self, feature: FeatureKey) -> Vec<String> {
        distinct_in_order(&self.categorical_column(feature))
            .into_iter()
            .map(str::to_string)
            .collect()
    }
}

/// Investment scenarios with four numeric inputs
#[derive(Clone, Debug, PartialEq)]
pub struct InvestmentDataset {
    pub records: Vec<InvestmentRecord>,
}

impl InvestmentDataset {
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self, TrainerError> {
        let file = std::fs::File::open(path.as_ref())?;
        let dataset = Self::from_reader(file)?;
        debug!(path = %path.as_ref().display(), rows = dataset.len(), "investment dataset loaded");
        Ok(dataset)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, TrainerError> {
        Ok(Self {
            records: read_records(reader)?,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Feature matrix in `INVESTMENT_COLUMNS` order
    pub fn features(&self) -> Vec<Vec<f64>> {
        self.records
            .iter()
            .map(|r| vec![r.investment, r.duration, r.complexity, r.impact])
            .collect()
    }

    pub fn targets(&self) -> Vec<f64> {
        self.records.iter().map(|record| record.roi).collect()
    }

    /// Observed range per input column, in `INVESTMENT_COLUMNS` order
    pub fn ranges(&self) -> Vec<(&'static str, ColumnRange)> {
        let features = self.features();
        INVESTMENT_COLUMNS
            .iter()
            .enumerate()
            .filter_map(|(i, name)| {
                let column: Vec<f64> = features.iter().map(|row| row[i]).collect();
                ColumnRange::of(&column).map(|range| (*name, range))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const PROJECTS: &str = "\
Durata_mesi,Budget_ml,Team_size,Tecnologia,Settore,ROI
6,1.0,5,A,X,1.5
12,2.0,5,A,Y,2.0
18,3.0,10,B,X,2.5
";

    #[test]
    fn test_load_projects() -> anyhow::Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(PROJECTS.as_bytes())?;
        file.flush()?;

        let dataset = ProjectDataset::from_csv(file.path())?;
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.records[2].technology, "B");
        assert_eq!(dataset.targets(), vec![1.5, 2.0, 2.5]);
        Ok(())
    }

    #[test]
    fn test_imputation_defaults() -> anyhow::Result<()> {
        let dataset = ProjectDataset::from_reader(PROJECTS.as_bytes())?;
        let defaults = dataset.imputation_defaults()?;

        assert_eq!(defaults.duration_months, 12.0);
        assert_eq!(defaults.budget_millions, 2.0);
        assert_eq!(defaults.team_size, 5.0);
        assert_eq!(defaults.technology, "A");
        assert_eq!(defaults.sector, "X");
        Ok(())
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let csv = "Durata_mesi,Budget_ml,Team_size,Tecnologia,ROI\n6,1.0,5,A,1.5\n";
        assert!(matches!(
            ProjectDataset::from_reader(csv.as_bytes()),
            Err(TrainerError::Csv(_))
        ));
    }

    #[test]
    fn test_empty_and_non_finite() {
        let header_only = "Investimenti,Durata,Complessita,Impatto,ROI\n";
        assert!(matches!(
            InvestmentDataset::from_reader(header_only.as_bytes()),
            Err(TrainerError::EmptyDataset)
        ));

        let nan = "Investimenti,Durata,Complessita,Impatto,ROI\n1,2,3,NaN,4\n";
        assert!(matches!(
            InvestmentDataset::from_reader(nan.as_bytes()),
            Err(TrainerError::Dataset(_))
        ));
    }

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_mode_ties_pick_smallest() {
        assert_eq!(mode(&["b", "a", "b"]), Some("b"));
        assert_eq!(mode(&["Y", "X"]), Some("X"));
        assert_eq!(mode(&["c", "b", "c", "b"]), Some("b"));
        assert_eq!(mode(&[]), None);
    }

    #[test]
    fn test_categories_first_seen_order() -> anyhow::Result<()> {
        let dataset = ProjectDataset::from_reader(PROJECTS.as_bytes())?;
        assert_eq!(dataset.categories(FeatureKey::Sector), vec!["X", "Y"]);
        assert_eq!(dataset.categories(FeatureKey::Duration), Vec::<String>::new());
        let range = dataset.range(FeatureKey::Budget).unwrap();
        assert_eq!((range.min, range.max), (1.0, 3.0));
        Ok(())
    }

    #[test]
    fn test_investment_features() -> anyhow::Result<()> {
        let csv = "Investimenti,Durata,Complessita,Impatto,ROI\n100,12,3,4,1.8\n50,6,2,5,2.2\n";
        let dataset = InvestmentDataset::from_reader(csv.as_bytes())?;
        assert_eq!(dataset.features()[1], vec![50.0, 6.0, 2.0, 5.0]);
        let ranges = dataset.ranges();
        assert_eq!(ranges[0].0, "Investimenti");
        assert_eq!((ranges[0].1.min, ranges[0].1.max), (50.0, 100.0));
        Ok(())
    }
}
