//! Integration tests for the ROI estimator
//!
//! Train on small CSV files written to temporary locations and exercise the
//! request path end to end.

use anyhow::Result;
use roi_core::{FeatureKey, PartialFeatureRequest, ReconcilePolicy, RoiCoreError, UnknownCategoryPolicy};
use roi_trainer::{
    DirectInput, DirectPredictor, ForestParams, RoiConfig, RoiEstimator, TrainerError,
};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_csv(lines: &[&str]) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    for line in lines {
        writeln!(file, "{line}")?;
    }
    file.flush()?;
    Ok(file)
}

fn three_projects() -> Result<NamedTempFile> {
    write_csv(&[
        "Durata_mesi,Budget_ml,Team_size,Tecnologia,Settore,ROI",
        "6,1.0,5,A,X,1.5",
        "12,2.0,5,A,Y,2.0",
        "18,3.0,10,B,X,2.5",
    ])
}

fn portfolio() -> Result<NamedTempFile> {
    write_csv(&[
        "Durata_mesi,Budget_ml,Team_size,Tecnologia,Settore,ROI",
        "6,0.8,4,NLP,Retail,1.1",
        "8,1.2,5,NLP,Retail,1.3",
        "10,1.5,6,Vision,Manifattura,1.6",
        "12,2.0,6,NLP,Finanza,1.9",
        "14,2.5,8,Vision,Finanza,2.1",
        "16,3.0,8,ML,Sanita,2.4",
        "18,3.5,10,ML,Sanita,2.6",
        "20,4.0,10,ML,Finanza,2.9",
        "24,5.0,12,Vision,Manifattura,3.2",
        "9,1.0,5,ML,Retail,1.4",
    ])
}

fn estimator(file: &NamedTempFile) -> Result<RoiEstimator> {
    Ok(RoiEstimator::from_csv(
        file.path(),
        &ForestParams::default(),
        ReconcilePolicy::default(),
    )?)
}

#[test]
fn test_three_row_reference_scenario() -> Result<()> {
    let file = three_projects()?;
    let estimator = estimator(&file)?;

    let request = PartialFeatureRequest::new()
        .with("Durata_mesi", 12.0)
        .with("Budget_ml", 2.0)
        .with("Team_size", 5.0);

    let sample = estimator.reconcile(&request)?;
    assert_eq!(sample.technology, "A");
    assert_eq!(sample.sector, "X");
    assert_eq!(sample.imputed, vec![FeatureKey::Technology, FeatureKey::Sector]);

    let result = estimator.estimate(&request)?;
    assert!((1.5..=2.5).contains(&result.roi_pred));
    assert!(result.std_pred >= 0.0);
    assert!(result.reliability_pct > 0.0 && result.reliability_pct < 100.0);
    Ok(())
}

#[test]
fn test_feature_count_threshold() -> Result<()> {
    let file = three_projects()?;
    let estimator = estimator(&file)?;

    let keys: [(&str, f64); 3] = [("duration", 12.0), ("budget", 2.0), ("team_size", 5.0)];
    for supplied in 0..3 {
        let request: PartialFeatureRequest = keys[..supplied].iter().copied().collect();
        let err = estimator.estimate(&request).unwrap_err();
        assert_eq!(
            err,
            RoiCoreError::InsufficientFeatures {
                supplied,
                required: 3
            }
        );
    }

    let request: PartialFeatureRequest = keys.iter().copied().collect();
    assert!(estimator.estimate(&request).is_ok());
    Ok(())
}

#[test]
fn test_unknown_key_rejected() -> Result<()> {
    let file = three_projects()?;
    let estimator = estimator(&file)?;

    let request = PartialFeatureRequest::new()
        .with("duration", 12.0)
        .with("budget", 2.0)
        .with("Foo", 1.0);

    match estimator.estimate(&request) {
        Err(RoiCoreError::UnknownFeatureKey { key, allowed }) => {
            assert_eq!(key, "Foo");
            assert!(allowed.contains(&"Durata_mesi".to_string()));
            assert!(allowed.contains(&"technology".to_string()));
        }
        other => panic!("expected UnknownFeatureKey, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_full_request_imputes_nothing() -> Result<()> {
    let file = portfolio()?;
    let estimator = estimator(&file)?;

    let request = PartialFeatureRequest::new()
        .with("duration", 14.0)
        .with("budget", 2.5)
        .with("team_size", 8.0)
        .with("technology", "Vision")
        .with("sector", "Finanza");

    let sample = estimator.reconcile(&request)?;
    assert!(sample.imputed.is_empty());
    assert_eq!(sample.duration_months, 14.0);
    assert_eq!(sample.technology, "Vision");

    let result = estimator.estimate(&request)?;
    assert!((1.1..=3.2).contains(&result.roi_pred));
    assert!(result.is_defined());
    Ok(())
}

#[test]
fn test_imputation_uses_median_and_mode() -> Result<()> {
    let file = portfolio()?;
    let estimator = estimator(&file)?;

    let request = PartialFeatureRequest::new()
        .with("technology", "NLP")
        .with("sector", "Retail")
        .with("team_size", 5.0);

    let sample = estimator.reconcile(&request)?;
    assert_eq!(sample.imputed, vec![FeatureKey::Duration, FeatureKey::Budget]);
    // durations sorted: 6 8 9 10 12 14 16 18 20 24
    assert_eq!(sample.duration_months, 13.0);
    assert_eq!(sample.budget_millions, 2.25);

    let defaults = estimator.reconciler().defaults();
    assert_eq!(defaults.technology, "ML");
    // Finanza and Retail both appear three times
    assert_eq!(defaults.sector, "Finanza");
    Ok(())
}

#[test]
fn test_unknown_category_policies() -> Result<()> {
    let file = portfolio()?;
    let request = PartialFeatureRequest::new()
        .with("duration", 12.0)
        .with("budget", 2.0)
        .with("technology", "Quantum");

    let strict = estimator(&file)?;
    assert!(matches!(
        strict.estimate(&request),
        Err(RoiCoreError::UnknownCategoryValue { .. })
    ));

    let lenient = RoiEstimator::from_csv(
        file.path(),
        &ForestParams::default(),
        ReconcilePolicy {
            unknown_category: UnknownCategoryPolicy::ZeroEncode,
            ..ReconcilePolicy::default()
        },
    )?;
    let sample = lenient.reconcile(&request)?;
    let encoded = lenient.reconciler().encode(&sample)?;
    let schema = lenient.reconciler().schema();
    for (column, value) in schema.columns().iter().zip(&encoded) {
        if column.starts_with("Tecnologia_") {
            assert_eq!(*value, 0.0);
        }
    }
    assert!(lenient.estimate(&request).is_ok());
    Ok(())
}

#[test]
fn test_training_is_deterministic() -> Result<()> {
    let file = portfolio()?;
    let first = estimator(&file)?;
    let second = estimator(&file)?;
    assert_eq!(first.reconciler().forest(), second.reconciler().forest());

    let request = PartialFeatureRequest::new()
        .with("duration", 11.0)
        .with("budget", 1.8)
        .with("sector", "Sanita");
    assert_eq!(first.estimate(&request)?, second.estimate(&request)?);
    Ok(())
}

#[test]
fn test_missing_dataset() {
    let result = RoiEstimator::from_csv(
        "does/not/exist.csv",
        &ForestParams::default(),
        ReconcilePolicy::default(),
    );
    assert!(matches!(result, Err(TrainerError::Io(_))));
}

#[test]
fn test_direct_importances_sum_to_hundred() -> Result<()> {
    let file = write_csv(&[
        "Investimenti,Durata,Complessita,Impatto,ROI",
        "50,6,2,3,1.1",
        "80,9,3,4,1.6",
        "120,12,3,5,2.3",
        "200,18,4,5,2.9",
        "60,6,5,2,0.7",
        "150,24,5,4,1.9",
        "90,10,2,4,1.8",
        "110,14,4,3,1.5",
    ])?;
    let predictor = DirectPredictor::from_csv(file.path(), &ForestParams::default())?;

    let prediction = predictor.predict(DirectInput {
        investment: 100.0,
        duration: 12.0,
        complexity: 3.0,
        impact: 4.0,
    })?;

    assert!((0.7..=2.9).contains(&prediction.roi_pred));
    let total: f64 = prediction.importances.iter().map(|i| i.weight_pct).sum();
    assert!((total - 100.0).abs() < 1e-9);
    assert!(prediction.importances.iter().all(|i| i.weight_pct >= 0.0));
    Ok(())
}

#[test]
fn test_config_drives_estimator() -> Result<()> {
    let file = portfolio()?;
    let mut config = RoiConfig::from_toml_str(&format!(
        "[datasets]\nprojects = {:?}\n\n[forest]\nn_trees = 12\nseed = 7\n\n[reconcile]\nmin_features = 4\n",
        file.path().display().to_string()
    ))?;
    assert!(config.validate()?.is_empty());

    let estimator = roi_trainer::estimator_from_config(&config)?;
    assert_eq!(estimator.reconciler().forest().tree_count(), 12);
    assert_eq!(estimator.reconciler().forest().metadata.seed, 7);

    let request = PartialFeatureRequest::new()
        .with("duration", 12.0)
        .with("budget", 2.0)
        .with("team_size", 6.0);
    assert!(matches!(
        estimator.estimate(&request),
        Err(RoiCoreError::InsufficientFeatures { supplied: 3, required: 4 })
    ));
    Ok(())
}

#[test]
fn test_bundled_datasets() -> Result<()> {
    let root = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../..");
    let mut config = RoiConfig::load_from_file(root.join("roi.toml"))?;
    config.validate()?;
    config.datasets.projects = root.join(&config.datasets.projects);
    config.datasets.investments = root.join(&config.datasets.investments);

    let estimator = roi_trainer::estimator_from_config(&config)?;
    let controls = estimator.input_controls();
    assert_eq!(controls.numeric.len(), 3);
    assert_eq!(controls.categorical.len(), 2);
    assert!(controls.categorical[0].options.contains(&"IA Generativa".to_string()));

    let predictor =
        roi_trainer::direct_predictor_from_csv(&config.datasets.investments, &config.forest)?;
    assert_eq!(predictor.input_ranges().len(), 4);
    Ok(())
}

#[test]
fn test_config_cannot_lower_feature_threshold() -> Result<()> {
    let file = three_projects()?;
    let config = RoiConfig::from_toml_str(&format!(
        "[datasets]\nprojects = {:?}\n\n[reconcile]\nmin_features = 1\n",
        file.path().display().to_string()
    ))?;

    assert!(matches!(
        roi_trainer::estimator_from_config(&config),
        Err(TrainerError::Config(_))
    ));
    Ok(())
}

#[test]
fn test_unset_inputs_are_imputed() -> Result<()> {
    let file = three_projects()?;
    let estimator = estimator(&file)?;

    let inputs = roi_trainer::ProjectInputs {
        duration: 12.0,
        budget: 2.0,
        team_size: 5.0,
        technology: " ".to_string(),
        sector: String::new(),
    };
    let (sample, result) = estimator.estimate_detailed(&inputs.to_request())?;
    assert_eq!(sample.imputed, vec![FeatureKey::Technology, FeatureKey::Sector]);
    assert_eq!((sample.technology.as_str(), sample.sector.as_str()), ("A", "X"));

    let text = roi_trainer::format_estimate(&result);
    assert!(text.starts_with("Predicted ROI: "));
    assert!(text.contains('%'));
    Ok(())
}
