//! Runner-level errors.

use std::path::PathBuf;

use thiserror::Error;

use signallab_core::classifier::ClassifierError;
use signallab_core::data::DataError;
use signallab_core::domain::{ArtifactKey, CodeError, ModelId};
use signallab_core::PipelineError;

use crate::config::ConfigError;
use crate::model_store::StoreError;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("model {0} is already in training")]
    Conflict(ModelId),

    #[error("{symbol} has {rows} bars in the requested range, need at least {required}")]
    InsufficientHistory {
        symbol: String,
        rows: usize,
        required: usize,
    },

    #[error("no artifact for {0}")]
    ArtifactNotFound(ArtifactKey),

    #[error("training worker has shut down")]
    WorkerGone,

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("model store error: {0}")]
    Store(#[from] StoreError),

    #[error("data error: {0}")]
    Data(#[from] DataError),

    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("{0}")]
    Code(#[from] CodeError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RunnerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RunnerError::Io {
            path: path.into(),
            source,
        }
    }
}
