//! SignalLab CLI: bars, models, training and predictions.
//!
//! Commands:
//! - `synth`: write a deterministic synthetic bar series as CSV
//! - `labels`: show the label distribution a symbol's bars produce
//! - `models create|list|delete`: manage model records and artifacts
//! - `train`: train a model in the background worker and wait for it
//! - `predict`: predict with a model and log the result
//! - `predictions`: list logged predictions

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use signallab_core::data::{BarSource, CsvBarSource, SyntheticBarSource};
use signallab_core::domain::{Algorithm, DataSource, ModelId, PredictionWindow, SignalLabel};
use signallab_core::features::IndicatorEngine;
use signallab_core::labeler::label_table;
use signallab_runner::{
    ModelRecord, ModelService, PipelineConfig, TrainRequest, TrainingReport, WorkerEvent,
};

#[derive(Parser)]
#[command(
    name = "signallab",
    about = "SignalLab CLI: indicator features, 5-class labels and trained signal models"
)]
struct Cli {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a synthetic bar series to the configured bar directory.
    Synth {
        /// Data source the series is filed under (binance, yfinance).
        #[arg(long, default_value = "yfinance")]
        data_source: DataSource,

        #[arg(long)]
        symbol: String,

        /// Number of daily bars.
        #[arg(long, default_value_t = 400)]
        len: usize,

        /// Mean daily return.
        #[arg(long, default_value_t = 0.0)]
        drift: f64,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// First bar day (YYYY-MM-DD).
        #[arg(long, default_value = "2020-01-01")]
        start: NaiveDate,
    },
    /// Compute features and labels for a symbol and print the class counts.
    Labels {
        #[arg(long, default_value = "yfinance")]
        data_source: DataSource,

        #[arg(long)]
        symbol: String,

        /// Forward horizon: tiny (1 day), small (7), medium (15).
        #[arg(long, default_value = "tiny")]
        window: PredictionWindow,
    },
    /// Model record management.
    Models {
        #[command(subcommand)]
        action: ModelAction,
    },
    /// Train a model and wait for the result.
    Train {
        id: u64,

        /// Epochs without validation improvement before stopping.
        #[arg(long)]
        patience: Option<usize>,

        /// First bar day to train on (YYYY-MM-DD).
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Last bar day to train on (YYYY-MM-DD).
        #[arg(long)]
        end: Option<NaiveDate>,
    },
    /// Predict with a model on its symbol's latest bars.
    Predict { id: u64 },
    /// List logged predictions.
    Predictions {
        /// Only predictions of this model.
        #[arg(long)]
        model: Option<u64>,
    },
}

#[derive(Subcommand)]
enum ModelAction {
    /// Create a model and save its untrained artifact.
    Create {
        #[arg(long, default_value = "yfinance")]
        data_source: DataSource,

        #[arg(long)]
        symbol: String,

        /// lstm, jordan, lstm_seq, jordan_seq.
        #[arg(long, default_value = "lstm")]
        algorithm: Algorithm,

        #[arg(long, default_value = "tiny")]
        window: PredictionWindow,
    },
    /// List every model.
    List,
    /// Delete a model and its artifact.
    Delete { id: u64 },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("signallab=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    match cli.command {
        Commands::Synth {
            data_source,
            symbol,
            len,
            drift,
            seed,
            start,
        } => run_synth(&config, data_source, &symbol, len, drift, seed, start),
        Commands::Labels {
            data_source,
            symbol,
            window,
        } => run_labels(&config, data_source, &symbol, window),
        Commands::Models { action } => {
            let service = ModelService::open(config)?;
            match action {
                ModelAction::Create {
                    data_source,
                    symbol,
                    algorithm,
                    window,
                } => {
                    let record = service.create(data_source, &symbol, algorithm, window)?;
                    print_models(&[record]);
                }
                ModelAction::List => print_models(&service.models()?),
                ModelAction::Delete { id } => {
                    let record = service.delete(ModelId(id))?;
                    println!("Deleted model {} ({})", record.id, record.symbol_name);
                }
            }
            Ok(())
        }
        Commands::Train {
            id,
            patience,
            start,
            end,
        } => run_train(config, ModelId(id), TrainRequest { patience, start, end }),
        Commands::Predict { id } => {
            let service = ModelService::open(config)?;
            let p = service.predict(ModelId(id))?;
            println!(
                "Model {} {} [{}]: {} (confidence {:.3})",
                p.model_id, p.symbol_name, p.algorithm, p.result, p.confidence
            );
            Ok(())
        }
        Commands::Predictions { model } => {
            let service = ModelService::open(config)?;
            let shown = match model {
                Some(m) => service.predictions_for(ModelId(m))?,
                None => service.predictions()?,
            };
            if shown.is_empty() {
                println!("No predictions.");
            }
            for p in shown {
                println!(
                    "{:>5}  model {:>4}  {:<10} {:<10} {:<12} {:.3}  {}",
                    p.id,
                    p.model_id,
                    p.symbol_name,
                    p.algorithm,
                    p.result,
                    p.confidence,
                    p.created.format("%Y-%m-%d %H:%M:%S")
                );
            }
            Ok(())
        }
    }
}

fn run_synth(
    config: &PipelineConfig,
    data_source: DataSource,
    symbol: &str,
    len: usize,
    drift: f64,
    seed: u64,
    start: NaiveDate,
) -> Result<()> {
    if len == 0 {
        bail!("--len must be at least 1");
    }
    let source = SyntheticBarSource {
        start,
        len,
        drift,
        seed,
        ..SyntheticBarSource::default()
    };
    let bars = source.generate(data_source, symbol);
    let path = CsvBarSource::new(&config.storage.bar_dir).write(data_source, symbol, &bars)?;
    info!(symbol, bars = bars.len(), path = %path.display(), "wrote synthetic bars");
    println!("Wrote {} bars to {}", bars.len(), path.display());
    Ok(())
}

fn run_labels(
    config: &PipelineConfig,
    data_source: DataSource,
    symbol: &str,
    window: PredictionWindow,
) -> Result<()> {
    let bars = CsvBarSource::new(&config.storage.bar_dir).load(data_source, symbol)?;
    let engine = IndicatorEngine::new(&config.indicators)?;
    let table = engine.compute(&bars, window.days())?;
    let labelled = label_table(&table)?;
    let counts = labelled.counts();

    println!(
        "{} {}: {} bars, {} feature rows, {} labelled (horizon {} days)",
        data_source,
        symbol.to_ascii_uppercase(),
        bars.len(),
        table.len(),
        labelled.len(),
        window.days()
    );
    for label in SignalLabel::ALL {
        let n = counts.get(label);
        let pct = if counts.total() == 0 {
            0.0
        } else {
            100.0 * n as f64 / counts.total() as f64
        };
        println!("  {:<12} {:>6}  {:>5.1}%", label, n, pct);
    }
    Ok(())
}

fn run_train(config: PipelineConfig, id: ModelId, request: TrainRequest) -> Result<()> {
    let service = ModelService::open(config)?;
    service.start_training(id, &request)?;
    match service.wait_for_training(id)? {
        WorkerEvent::Finished { report, .. } => {
            print_report(&report);
            Ok(())
        }
        WorkerEvent::Failed { error, .. } => bail!("training model {id} failed: {error}"),
        WorkerEvent::Started { .. } => bail!("training model {id} ended without a result"),
    }
}

fn print_models(models: &[ModelRecord]) {
    if models.is_empty() {
        println!("No models.");
        return;
    }
    println!(
        "{:>4}  {:<9} {:<10} {:<11} {:<7} {:<12} {}",
        "id", "source", "symbol", "algorithm", "window", "status", "updated"
    );
    for m in models {
        println!(
            "{:>4}  {:<9} {:<10} {:<11} {:<7} {:<12} {}",
            m.id,
            m.data_source,
            m.symbol_name,
            m.algorithm,
            m.prediction_window,
            m.status,
            m.updated.format("%Y-%m-%d %H:%M:%S")
        );
    }
}

fn print_report(r: &TrainingReport) {
    println!("\n=== Training Report ===");
    println!(
        "Model:        {} {} [{}], window {}",
        r.model_id, r.symbol, r.algorithm, r.prediction_window
    );
    println!(
        "Rows:         {} bars -> {} feature rows -> {} labelled",
        r.bars, r.feature_rows, r.labelled_rows
    );
    println!("Samples:      {}", r.samples);
    println!("Labels:       {:?}", r.label_counts.0);
    if let Some(balanced) = &r.balanced_counts {
        println!("Balanced:     {:?}", balanced.0);
    }
    println!("Split:        {} train / {} test", r.train_len, r.test_len);
    println!(
        "Epochs:       {}{}",
        r.history.epochs_run(),
        if r.history.stopped_early {
            " (stopped early)"
        } else {
            ""
        }
    );
    if let Some(best) = r.history.best_val_accuracy() {
        println!("Best val acc: {:.4}", best);
    }
    println!(
        "Test:         loss {:.4}, accuracy {:.4}",
        r.evaluation.loss, r.evaluation.accuracy
    );
    println!("Elapsed:      {:.2}s", r.elapsed_secs);
}
