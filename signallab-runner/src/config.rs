//! TOML configuration for the whole pipeline.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration:
//!
//! ```toml
//! [pipeline]
//! seq_len = 60
//! split_ratio = 0.8
//! split_order = "after_balancing"   # or "chronological"
//! seed = 42
//! min_rows = 30
//!
//! [training]
//! epochs = 125
//! batch_size = 64
//! default_patience = 60
//!
//! [indicators]
//! bb_period = 5
//! rsi_period = 14
//!
//! [backend]
//! kind = "softmax"                  # or "majority"
//! learning_rate = 0.1
//!
//! [storage]
//! bar_dir = "data/bars"
//! artifact_root = "tmp"
//! model_store = "data/models.json"
//! prediction_log = "data/predictions.jsonl"
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use signallab_core::classifier::{ClassifierBackend, FitOptions, MajorityBackend, SoftmaxBackend};
use signallab_core::dataset::SplitOrder;
use signallab_core::features::IndicatorSettings;
use signallab_core::pipeline::PipelineSettings;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub pipeline: PipelineSection,
    pub training: TrainingSection,
    pub indicators: IndicatorSettings,
    pub backend: BackendSection,
    pub storage: StorageSection,
}

impl PipelineConfig {
    /// Load a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |e: &dyn std::fmt::Display| ConfigError::Invalid(e.to_string());

        self.pipeline.settings().validate().map_err(|e| invalid(&e))?;
        self.indicators.validate().map_err(|e| invalid(&e))?;
        self.training
            .fit_options(self.training.default_patience)
            .validate()
            .map_err(|e| invalid(&e))?;

        if self.pipeline.min_rows == 0 {
            return Err(ConfigError::Invalid("pipeline.min_rows must be >= 1".into()));
        }
        let lr = self.backend.learning_rate;
        if !(lr.is_finite() && lr > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "backend.learning_rate must be a positive number, got {lr}"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    pub seq_len: usize,
    pub split_ratio: f64,
    pub split_order: SplitOrder,
    /// Master seed of the RNG hierarchy.
    pub seed: u64,
    /// Fewest bars a training request may use after date slicing.
    pub min_rows: usize,
}

impl Default for PipelineSection {
    fn default() -> Self {
        let settings = PipelineSettings::default();
        Self {
            seq_len: settings.seq_len,
            split_ratio: settings.split_ratio,
            split_order: settings.split_order,
            seed: 42,
            min_rows: 30,
        }
    }
}

impl PipelineSection {
    pub fn settings(&self) -> PipelineSettings {
        PipelineSettings {
            seq_len: self.seq_len,
            split_ratio: self.split_ratio,
            split_order: self.split_order,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingSection {
    pub epochs: usize,
    pub batch_size: usize,
    /// Patience used when a training request does not name one.
    pub default_patience: usize,
}

impl Default for TrainingSection {
    fn default() -> Self {
        let opts = FitOptions::default();
        Self {
            epochs: opts.epochs,
            batch_size: opts.batch_size,
            default_patience: opts.patience,
        }
    }
}

impl TrainingSection {
    pub fn fit_options(&self, patience: usize) -> FitOptions {
        FitOptions {
            epochs: self.epochs,
            batch_size: self.batch_size,
            patience,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    #[default]
    Softmax,
    Majority,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSection {
    pub kind: BackendKind,
    /// Gradient step of the softmax backend.
    pub learning_rate: f64,
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            kind: BackendKind::Softmax,
            learning_rate: SoftmaxBackend::default().learning_rate,
        }
    }
}

impl BackendSection {
    pub fn build(&self) -> Arc<dyn ClassifierBackend> {
        match self.kind {
            BackendKind::Softmax => Arc::new(SoftmaxBackend::new(self.learning_rate)),
            BackendKind::Majority => Arc::new(MajorityBackend),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Root of `{data_source}/{SYMBOL}.csv` bar files.
    pub bar_dir: PathBuf,
    /// Root of `{data_source}/{ALGORITHM}/{SYMBOL}/{model_id}` artifacts.
    pub artifact_root: PathBuf,
    pub model_store: PathBuf,
    pub prediction_log: PathBuf,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            bar_dir: PathBuf::from("data/bars"),
            artifact_root: PathBuf::from("tmp"),
            model_store: PathBuf::from("data/models.json"),
            prediction_log: PathBuf::from("data/predictions.jsonl"),
        }
    }
}
