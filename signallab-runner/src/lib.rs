//! SignalLab Runner: model lifecycle around the core pipeline.
//!
//! This crate builds on `signallab-core` to provide:
//! - TOML configuration with defaults for every field
//! - Artifact storage keyed by data source, algorithm, symbol and model id
//! - Model metadata stores (in-memory, single-file JSON) with lifecycle checks
//! - JSONL prediction log
//! - Training orchestration with guaranteed final status
//! - A background training worker thread
//! - Inference and the model service that enforces request preconditions

pub mod artifact;
pub mod config;
pub mod error;
pub mod model_store;
pub mod orchestrator;
pub mod predictions;
pub mod predictor;
pub mod service;
pub mod worker;

pub use artifact::ArtifactStore;
pub use config::{BackendKind, ConfigError, PipelineConfig};
pub use error::RunnerError;
pub use model_store::{
    InMemoryModelStore, JsonModelStore, ModelRecord, ModelStore, NewModel, StoreError,
};
pub use orchestrator::{PipelineContext, TrainingOrchestrator, TrainingReport};
pub use predictions::{PredictionLog, PredictionRecord};
pub use predictor::Predictor;
pub use service::{ModelService, TrainRequest};
pub use worker::{TrainingJob, TrainingWorker, WorkerCommand, WorkerEvent};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_is_send_sync() {
        assert_send::<PipelineConfig>();
        assert_sync::<PipelineConfig>();
    }

    #[test]
    fn stores_are_send_sync() {
        assert_send::<InMemoryModelStore>();
        assert_sync::<InMemoryModelStore>();
        assert_send::<JsonModelStore>();
        assert_sync::<JsonModelStore>();
        assert_send::<ArtifactStore>();
        assert_sync::<ArtifactStore>();
        assert_send::<PredictionLog>();
        assert_sync::<PredictionLog>();
    }

    #[test]
    fn orchestrator_is_send_sync() {
        assert_send::<TrainingOrchestrator>();
        assert_sync::<TrainingOrchestrator>();
        assert_send::<PipelineContext>();
        assert_sync::<PipelineContext>();
    }

    #[test]
    fn worker_messages_are_send() {
        assert_send::<WorkerCommand>();
        assert_send::<WorkerEvent>();
        assert_send::<TrainingReport>();
        assert_sync::<TrainingReport>();
    }

    #[test]
    fn records_are_send_sync() {
        assert_send::<ModelRecord>();
        assert_sync::<ModelRecord>();
        assert_send::<PredictionRecord>();
        assert_sync::<PredictionRecord>();
    }
}
