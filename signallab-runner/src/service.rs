//! Model lifecycle service.
//!
//! The entry point callers use: create a model, start its training in the
//! background, predict with it, delete it. Preconditions are checked here,
//! before any work is handed to the worker:
//! - a model already IN_TRAINING cannot be trained again (Conflict)
//! - the requested date range must leave at least `min_rows` labelled rows
//!   once the indicator warm-up and the forward horizon are dropped

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, warn};

use signallab_core::data::{slice_by_date, BarSource, CsvBarSource};
use signallab_core::domain::{Algorithm, Bar, DataSource, ModelId, ModelStatus, PredictionWindow};

use crate::artifact::ArtifactStore;
use crate::config::PipelineConfig;
use crate::error::RunnerError;
use crate::model_store::{JsonModelStore, ModelRecord, ModelStore, NewModel, StoreError};
use crate::orchestrator::{PipelineContext, TrainingOrchestrator};
use crate::predictions::{PredictionLog, PredictionRecord};
use crate::predictor::Predictor;
use crate::worker::{TrainingJob, TrainingWorker, WorkerEvent};

/// Optional parts of a training request.
#[derive(Debug, Clone, Default)]
pub struct TrainRequest {
    /// Epochs without improvement before stopping. Config default when `None`.
    pub patience: Option<usize>,
    /// First bar day to train on, inclusive.
    pub start: Option<NaiveDate>,
    /// Last bar day to train on, inclusive.
    pub end: Option<NaiveDate>,
}

pub struct ModelService {
    config: PipelineConfig,
    ctx: Arc<PipelineContext>,
    store: Arc<dyn ModelStore>,
    bars: Arc<dyn BarSource>,
    predictor: Predictor,
    predictions: PredictionLog,
    worker: TrainingWorker,
}

impl ModelService {
    pub fn new(
        config: PipelineConfig,
        store: Arc<dyn ModelStore>,
        bars: Arc<dyn BarSource>,
    ) -> Result<Self, RunnerError> {
        let ctx = Arc::new(PipelineContext::from_config(&config, config.backend.build())?);
        let orchestrator = Arc::new(TrainingOrchestrator::new(ctx.clone(), store.clone()));
        Ok(Self {
            predictor: Predictor::new(ctx.clone()),
            predictions: PredictionLog::new(&config.storage.prediction_log),
            worker: TrainingWorker::spawn(orchestrator)?,
            config,
            ctx,
            store,
            bars,
        })
    }

    /// File-backed service: CSV bars, JSON model store, JSONL prediction log.
    pub fn open(config: PipelineConfig) -> Result<Self, RunnerError> {
        let store = Arc::new(JsonModelStore::open(&config.storage.model_store)?);
        let bars = Arc::new(CsvBarSource::new(&config.storage.bar_dir));
        Self::new(config, store, bars)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.ctx.artifacts
    }

    pub fn models(&self) -> Result<Vec<ModelRecord>, RunnerError> {
        Ok(self.store.list()?)
    }

    pub fn model(&self, id: ModelId) -> Result<ModelRecord, RunnerError> {
        Ok(self.store.get(id)?)
    }

    pub fn predictions(&self) -> Result<Vec<PredictionRecord>, RunnerError> {
        self.predictions.read_all()
    }

    pub fn predictions_for(&self, id: ModelId) -> Result<Vec<PredictionRecord>, RunnerError> {
        self.predictions.for_model(id)
    }

    /// Create a model record and save its untrained classifier.
    ///
    /// The symbol must have bars in `data_source`.
    pub fn create(
        &self,
        data_source: DataSource,
        symbol: &str,
        algorithm: Algorithm,
        prediction_window: PredictionWindow,
    ) -> Result<ModelRecord, RunnerError> {
        self.bars.load(data_source, symbol)?;

        let record = self.store.create(NewModel {
            data_source,
            symbol_name: symbol.to_string(),
            algorithm,
            prediction_window,
        })?;

        let saved = self
            .ctx
            .build_classifier(&record)
            .and_then(|model| Ok(model.save()?))
            .and_then(|bytes| self.ctx.artifacts.save(&record.artifact_key(), &bytes));
        if let Err(e) = saved {
            warn!(model_id = %record.id, error = %e, "initial artifact not saved, removing record");
            if let Err(store_err) = self.store.delete(record.id) {
                warn!(model_id = %record.id, error = %store_err, "could not remove record");
            }
            return Err(e);
        }

        info!(
            model_id = %record.id,
            symbol = %record.symbol_name,
            algorithm = %record.algorithm,
            window = %record.prediction_window,
            "model created"
        );
        Ok(record)
    }

    /// Accept a training request and hand it to the background worker.
    ///
    /// Returns the record in IN_TRAINING status. Completion is observable
    /// through the record's status or [`ModelService::wait_for_training`].
    pub fn start_training(
        &self,
        id: ModelId,
        request: &TrainRequest,
    ) -> Result<ModelRecord, RunnerError> {
        let record = self.store.get(id)?;
        if record.status == ModelStatus::InTraining {
            return Err(RunnerError::Conflict(id));
        }

        let all = self.bars.load(record.data_source, &record.symbol_name)?;
        let bars = slice_by_date(&all, request.start, request.end);
        let rows = self.usable_rows(&record, bars)?;
        let required = self.config.pipeline.min_rows;
        if rows < required {
            return Err(RunnerError::InsufficientHistory {
                symbol: record.symbol_name,
                rows,
                required,
            });
        }
        let bars = bars.to_vec();

        let record = match self.store.transition(id, ModelStatus::InTraining) {
            Ok(r) => r,
            Err(StoreError::IllegalTransition {
                from: ModelStatus::InTraining,
                ..
            }) => return Err(RunnerError::Conflict(id)),
            Err(e) => return Err(e.into()),
        };

        let patience = request
            .patience
            .unwrap_or(self.config.training.default_patience);
        info!(
            model_id = %id,
            symbol = %record.symbol_name,
            bars = bars.len(),
            patience,
            "training accepted"
        );

        let job = TrainingJob {
            record: record.clone(),
            bars,
            patience,
        };
        if let Err(e) = self.worker.submit(job) {
            if let Err(store_err) = self.store.transition(id, ModelStatus::Errored) {
                warn!(model_id = %id, error = %store_err, "could not mark model errored");
            }
            return Err(e);
        }
        Ok(record)
    }

    /// Feature rows of `bars` that carry a label for `record`'s window.
    fn usable_rows(&self, record: &ModelRecord, bars: &[Bar]) -> Result<usize, RunnerError> {
        if bars.is_empty() {
            return Ok(0);
        }
        let table = self
            .ctx
            .engine
            .compute(bars, record.prediction_window.days())?;
        Ok(table.labelled_len())
    }

    /// Block until the worker finishes training `id`.
    pub fn wait_for_training(&self, id: ModelId) -> Result<WorkerEvent, RunnerError> {
        self.worker.wait_for(id)
    }

    /// Predict with model `id` on the symbol's full bar history and log it.
    pub fn predict(&self, id: ModelId) -> Result<PredictionRecord, RunnerError> {
        let record = self.store.get(id)?;
        let bars = self.bars.load(record.data_source, &record.symbol_name)?;
        let result = self.predictor.predict(&record, &bars)?;
        let logged = self.predictions.append(&record, &result)?;
        info!(
            model_id = %id,
            prediction_id = %logged.id,
            label = %logged.result,
            confidence = logged.confidence,
            "prediction logged"
        );
        Ok(logged)
    }

    /// Delete the record and its artifact.
    pub fn delete(&self, id: ModelId) -> Result<ModelRecord, RunnerError> {
        let record = self.store.get(id)?;
        if record.status == ModelStatus::InTraining {
            return Err(RunnerError::Conflict(id));
        }
        let record = self.store.delete(id)?;
        if !self.ctx.artifacts.delete(&record.artifact_key())? {
            warn!(model_id = %id, "model had no artifact");
        }
        info!(model_id = %id, symbol = %record.symbol_name, "model deleted");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model_store::InMemoryModelStore;
    use signallab_core::data::SyntheticBarSource;

    /// Store whose deletes always fail.
    struct StickyStore(InMemoryModelStore);

    impl ModelStore for StickyStore {
        fn create(&self, new: NewModel) -> Result<ModelRecord, StoreError> {
            self.0.create(new)
        }
        fn get(&self, id: ModelId) -> Result<ModelRecord, StoreError> {
            self.0.get(id)
        }
        fn list(&self) -> Result<Vec<ModelRecord>, StoreError> {
            self.0.list()
        }
        fn transition(&self, id: ModelId, next: ModelStatus) -> Result<ModelRecord, StoreError> {
            self.0.transition(id, next)
        }
        fn delete(&self, _id: ModelId) -> Result<ModelRecord, StoreError> {
            Err(StoreError::Poisoned)
        }
    }

    #[test]
    fn failed_cleanup_keeps_the_artifact_error() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the artifact directory should be.
        let blocked = dir.path().join("artifacts");
        std::fs::write(&blocked, b"").unwrap();

        let mut config = PipelineConfig::default();
        config.storage.artifact_root = blocked;
        config.storage.prediction_log = dir.path().join("predictions.jsonl");
        let store = Arc::new(StickyStore(InMemoryModelStore::new()));
        let bars = Arc::new(SyntheticBarSource::uptrend(100));
        let service = ModelService::new(config, store.clone(), bars).unwrap();

        let err = service
            .create(DataSource::Binance, "UP", Algorithm::Lstm, PredictionWindow::Tiny)
            .unwrap_err();
        assert!(matches!(err, RunnerError::Io { .. }), "{err}");
        // The record could not be removed and is still listed.
        assert_eq!(store.list().unwrap().len(), 1);
    }
}
