//! Training orchestration.
//!
//! Bars → feature table → training split → classifier fit → artifact. The
//! orchestrator also owns the status write that ends a training run: success
//! moves the model to TRAINED, every failure moves it to ERRORED, so a model
//! is never left in IN_TRAINING.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use signallab_core::classifier::{
    Classifier, ClassifierBackend, Evaluation, InputShape, TrainingHistory,
};
use signallab_core::domain::{
    Algorithm, Bar, LabelCounts, ModelId, ModelStatus, PredictionWindow,
};
use signallab_core::features::IndicatorEngine;
use signallab_core::pipeline::{prepare_training, PipelineSettings};
use signallab_core::rng::{RngHierarchy, Stage};

use crate::artifact::ArtifactStore;
use crate::config::{PipelineConfig, TrainingSection};
use crate::error::RunnerError;
use crate::model_store::{ModelRecord, ModelStore};

/// What a finished training run did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub model_id: ModelId,
    pub symbol: String,
    pub algorithm: Algorithm,
    pub prediction_window: PredictionWindow,
    pub bars: usize,
    pub feature_rows: usize,
    pub labelled_rows: usize,
    /// Samples before balancing (windows, or rows for plain algorithms).
    pub samples: usize,
    pub label_counts: LabelCounts,
    pub balanced_counts: Option<LabelCounts>,
    pub train_len: usize,
    pub test_len: usize,
    pub history: TrainingHistory,
    pub evaluation: Evaluation,
    pub elapsed_secs: f64,
}

/// Everything shared by training and inference for one configuration.
pub struct PipelineContext {
    pub engine: IndicatorEngine,
    pub settings: PipelineSettings,
    pub training: TrainingSection,
    pub backend: Arc<dyn ClassifierBackend>,
    pub artifacts: ArtifactStore,
    pub rng: RngHierarchy,
}

impl PipelineContext {
    pub fn from_config(
        config: &PipelineConfig,
        backend: Arc<dyn ClassifierBackend>,
    ) -> Result<Self, RunnerError> {
        config.validate()?;
        Ok(Self {
            engine: IndicatorEngine::new(&config.indicators)?,
            settings: config.pipeline.settings(),
            training: config.training.clone(),
            backend,
            artifacts: ArtifactStore::new(&config.storage.artifact_root),
            rng: RngHierarchy::new(config.pipeline.seed),
        })
    }

    /// Input shape of every model built for `algorithm`.
    pub fn input_shape(&self, algorithm: Algorithm) -> InputShape {
        let timesteps = if algorithm.is_sequential() {
            self.settings.seq_len
        } else {
            1
        };
        InputShape::new(timesteps, self.engine.columns().len())
    }

    /// A fresh, untrained classifier for `record`.
    pub fn build_classifier(
        &self,
        record: &ModelRecord,
    ) -> Result<Box<dyn Classifier>, RunnerError> {
        let mut rng = self
            .rng
            .rng_for(record.data_source, &record.symbol_name, record.id, Stage::Fit);
        Ok(self
            .backend
            .build(record.algorithm, self.input_shape(record.algorithm), &mut rng)?)
    }

    /// Load the stored artifact for `record`.
    pub fn load_classifier(
        &self,
        record: &ModelRecord,
    ) -> Result<Box<dyn Classifier>, RunnerError> {
        let bytes = self.artifacts.load(&record.artifact_key())?;
        Ok(self.backend.load(&bytes)?)
    }
}

pub struct TrainingOrchestrator {
    ctx: Arc<PipelineContext>,
    store: Arc<dyn ModelStore>,
}

impl TrainingOrchestrator {
    pub fn new(ctx: Arc<PipelineContext>, store: Arc<dyn ModelStore>) -> Self {
        Self { ctx, store }
    }

    /// Train `record` on `bars` and write the final status.
    ///
    /// The model must already be IN_TRAINING.
    pub fn run(
        &self,
        record: &ModelRecord,
        bars: &[Bar],
        patience: usize,
    ) -> Result<TrainingReport, RunnerError> {
        match self.train(record, bars, patience) {
            Ok(report) => {
                self.store.transition(record.id, ModelStatus::Trained)?;
                info!(
                    model_id = %record.id,
                    symbol = %record.symbol_name,
                    algorithm = %record.algorithm,
                    epochs = report.history.epochs_run(),
                    stopped_early = report.history.stopped_early,
                    accuracy = report.evaluation.accuracy,
                    loss = report.evaluation.loss,
                    elapsed_secs = report.elapsed_secs,
                    "training finished"
                );
                Ok(report)
            }
            Err(e) => {
                error!(
                    model_id = %record.id,
                    symbol = %record.symbol_name,
                    algorithm = %record.algorithm,
                    error = %e,
                    "training failed"
                );
                if let Err(store_err) = self.store.transition(record.id, ModelStatus::Errored) {
                    warn!(model_id = %record.id, error = %store_err, "could not mark model errored");
                }
                Err(e)
            }
        }
    }

    /// The training procedure itself, without status bookkeeping.
    pub fn train(
        &self,
        record: &ModelRecord,
        bars: &[Bar],
        patience: usize,
    ) -> Result<TrainingReport, RunnerError> {
        let started = Instant::now();
        let ctx = &self.ctx;
        let key = record.artifact_key();

        info!(
            model_id = %record.id,
            symbol = %record.symbol_name,
            algorithm = %record.algorithm,
            window = %record.prediction_window,
            bars = bars.len(),
            patience,
            "training started"
        );

        let table = ctx
            .engine
            .compute(bars, record.prediction_window.days())?;

        let mut balance_rng =
            ctx.rng
                .rng_for(record.data_source, &record.symbol_name, record.id, Stage::Balance);
        let prepared =
            prepare_training(&table, record.algorithm, &ctx.settings, &mut balance_rng)?;

        let mut model = self.resume_or_build(record)?;
        let mut fit_rng = ctx
            .rng
            .rng_for(record.data_source, &record.symbol_name, record.id, Stage::Fit);
        let history = model.fit(
            &prepared.split.train,
            &prepared.split.test,
            &ctx.training.fit_options(patience),
            &mut fit_rng,
        )?;
        let evaluation = model.evaluate(&prepared.split.test)?;

        ctx.artifacts.save(&key, &model.save()?)?;

        Ok(TrainingReport {
            model_id: record.id,
            symbol: record.symbol_name.clone(),
            algorithm: record.algorithm,
            prediction_window: record.prediction_window,
            bars: bars.len(),
            feature_rows: prepared.feature_rows,
            labelled_rows: prepared.labelled_rows,
            samples: prepared.samples,
            label_counts: prepared.label_counts,
            balanced_counts: prepared.balanced_counts,
            train_len: prepared.split.train.len(),
            test_len: prepared.split.test.len(),
            history,
            evaluation,
            elapsed_secs: started.elapsed().as_secs_f64(),
        })
    }

    /// Continue from the stored artifact when it still fits this model's
    /// shape, otherwise start from fresh weights.
    fn resume_or_build(&self, record: &ModelRecord) -> Result<Box<dyn Classifier>, RunnerError> {
        let expected = self.ctx.input_shape(record.algorithm);
        match self.ctx.load_classifier(record) {
            Ok(model) if model.input_shape() == expected => Ok(model),
            Ok(model) => {
                warn!(
                    model_id = %record.id,
                    stored = %model.input_shape(),
                    expected = %expected,
                    "stored artifact has a different shape, rebuilding"
                );
                self.ctx.build_classifier(record)
            }
            Err(RunnerError::ArtifactNotFound(_)) => self.ctx.build_classifier(record),
            Err(e) => Err(e),
        }
    }
}
