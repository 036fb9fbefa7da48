//! ROI estimator CLI
//!
//! Trains the forests on the configured datasets at startup and answers a
//! single estimation request per invocation.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use roi_trainer::{
    format_estimate, DirectInput, DirectPrediction, DirectPredictor, ProjectInputs, RoiConfig,
    RoiEstimator,
};
use std::path::PathBuf;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "roi-estimate")]
#[command(author = "ROI Estimator Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Random forest ROI estimation for AI projects", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Dataset CSV, overrides the configured path for the chosen command
    #[arg(short, long, global = true)]
    dataset: Option<PathBuf>,

    /// Print the result as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Estimate ROI and reliability from a partial project description
    Estimate {
        /// Project duration in months (0 leaves it unset)
        #[arg(long, default_value = "0")]
        duration: f64,

        /// Budget in millions (0 leaves it unset)
        #[arg(long, default_value = "0")]
        budget: f64,

        /// Team size (0 leaves it unset)
        #[arg(long, default_value = "0")]
        team_size: f64,

        /// Technology (empty leaves it unset)
        #[arg(long, default_value = "")]
        technology: String,

        /// Sector (empty leaves it unset)
        #[arg(long, default_value = "")]
        sector: String,
    },

    /// Predict ROI for a fully specified investment scenario
    Direct {
        /// Investment amount
        #[arg(long)]
        investment: f64,

        /// Duration
        #[arg(long)]
        duration: f64,

        /// Complexity score
        #[arg(long)]
        complexity: f64,

        /// Expected impact score
        #[arg(long)]
        impact: f64,
    },

    /// Show the input ranges, defaults and category choices of the estimator
    Controls,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => RoiConfig::load_from_file(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => RoiConfig::default(),
    };

    // Setup logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        config.logging.level.parse().unwrap_or(Level::INFO)
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("ROI Estimator v{}", roi_trainer::VERSION);
    if let Some(path) = &args.config {
        info!("Configuration loaded from {}", path.display());
    }
    config.validate().context("Invalid configuration")?;

    match args.command {
        Command::Estimate {
            duration,
            budget,
            team_size,
            ref technology,
            ref sector,
        } => {
            let estimator = load_estimator(&config, args.dataset.clone())?;

            let inputs = ProjectInputs {
                duration,
                budget,
                team_size,
                technology: technology.clone(),
                sector: sector.clone(),
            };
            let request = inputs.to_request();
            debug!(?request, "request assembled");

            let (sample, result) = estimator.estimate_detailed(&request)?;
            if !sample.imputed.is_empty() {
                info!("Imputed from training data: {:?}", sample.imputed);
            }

            if args.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", format_estimate(&result));
            }
        }

        Command::Direct {
            investment,
            duration,
            complexity,
            impact,
        } => {
            let path = args
                .dataset
                .clone()
                .unwrap_or_else(|| config.datasets.investments.clone());
            info!("Loading investment scenarios from: {}", path.display());
            let predictor = DirectPredictor::from_csv(&path, &config.forest)
                .with_context(|| format!("Failed to train on {}", path.display()))?;

            let prediction = predictor.predict(DirectInput {
                investment,
                duration,
                complexity,
                impact,
            })?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&prediction)?);
            } else {
                print_direct(&prediction);
            }
        }

        Command::Controls => {
            let estimator = load_estimator(&config, args.dataset.clone())?;
            let controls = estimator.input_controls();
            if args.json {
                println!("{}", serde_json::to_string_pretty(controls)?);
            } else {
                for control in &controls.numeric {
                    println!(
                        "{:<12} {:>8.2} .. {:<8.2} default {:.2}",
                        control.feature, control.min, control.max, control.default
                    );
                }
                for control in &controls.categorical {
                    println!(
                        "{:<12} {} (default {})",
                        control.feature,
                        control.options.join(", "),
                        control.default
                    );
                }
                println!("At least {} features required", controls.min_features);
            }
        }
    }

    Ok(())
}

fn load_estimator(config: &RoiConfig, dataset: Option<PathBuf>) -> Result<RoiEstimator> {
    let path = dataset.unwrap_or_else(|| config.datasets.projects.clone());
    if !path.exists() {
        bail!("Project dataset not found: {}", path.display());
    }

    info!("Loading projects from: {}", path.display());
    RoiEstimator::from_csv(&path, &config.forest, config.reconcile.clone())
        .with_context(|| format!("Failed to train on {}", path.display()))
}

fn print_direct(prediction: &DirectPrediction) {
    println!("Predicted ROI: {:.2}", prediction.roi_pred);
    println!("Feature importance:");
    for importance in &prediction.importances {
        println!("  {:<12} {:>6.2}%", importance.feature, importance.weight_pct);
    }
}
