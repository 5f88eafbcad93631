//! Inference: latest bars → one label and a confidence.

use std::sync::Arc;

use tracing::{debug, warn};

use signallab_core::aggregate::{aggregate, PredictionResult};
use signallab_core::domain::{Bar, ModelStatus};
use signallab_core::pipeline::prepare_inference;

use crate::error::RunnerError;
use crate::model_store::ModelRecord;
use crate::orchestrator::PipelineContext;

pub struct Predictor {
    ctx: Arc<PipelineContext>,
}

impl Predictor {
    pub fn new(ctx: Arc<PipelineContext>) -> Self {
        Self { ctx }
    }

    /// Run the stored classifier of `record` over the most recent samples of
    /// `bars` and aggregate its last `prediction_window` outputs.
    pub fn predict(
        &self,
        record: &ModelRecord,
        bars: &[Bar],
    ) -> Result<PredictionResult, RunnerError> {
        if record.status != ModelStatus::Trained {
            warn!(
                model_id = %record.id,
                status = %record.status,
                "predicting with a model that has not finished training"
            );
        }

        let window = record.prediction_window.days();
        let table = self.ctx.engine.compute(bars, window)?;
        let samples = prepare_inference(&table, record.algorithm, self.ctx.settings.seq_len)?;

        let model = self.ctx.load_classifier(record)?;
        let output = model.predict(&samples)?;
        let result = aggregate(&output, window)?;

        debug!(
            model_id = %record.id,
            samples = samples.len(),
            label = %result.label,
            confidence = result.confidence,
            tally = ?result.tally,
            "aggregated prediction"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::model_store::{InMemoryModelStore, ModelStore, NewModel};
    use signallab_core::classifier::MajorityBackend;
    use signallab_core::data::SyntheticBarSource;
    use signallab_core::domain::{Algorithm, DataSource, PredictionWindow, SignalLabel};

    fn setup(dir: &std::path::Path) -> (Arc<PipelineContext>, ModelRecord) {
        let mut config = PipelineConfig::default();
        config.storage.artifact_root = dir.to_path_buf();
        let ctx =
            Arc::new(PipelineContext::from_config(&config, Arc::new(MajorityBackend)).unwrap());
        let record = InMemoryModelStore::new()
            .create(NewModel {
                data_source: DataSource::Binance,
                symbol_name: "BTCUSDT".into(),
                algorithm: Algorithm::Lstm,
                prediction_window: PredictionWindow::Medium,
            })
            .unwrap();
        (ctx, record)
    }

    #[test]
    fn missing_artifact_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, record) = setup(dir.path());
        let bars = SyntheticBarSource::default().generate(DataSource::Binance, "BTCUSDT");

        let err = Predictor::new(ctx).predict(&record, &bars).unwrap_err();
        assert!(matches!(err, RunnerError::ArtifactNotFound(_)), "{err}");
    }

    #[test]
    fn untrained_artifact_still_predicts() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, record) = setup(dir.path());
        let model = ctx.build_classifier(&record).unwrap();
        ctx.artifacts
            .save(&record.artifact_key(), &model.save().unwrap())
            .unwrap();

        let bars = SyntheticBarSource::default().generate(DataSource::Binance, "BTCUSDT");
        let result = Predictor::new(ctx).predict(&record, &bars).unwrap();

        // Uniform priors: every row ties, so the lowest id wins every row.
        assert_eq!(result.label, SignalLabel::StrongBuy);
        assert_eq!(result.tally[0], 15);
        assert!((result.confidence - (0.2 + 1.0) / 2.0).abs() < 1e-9);
    }
}
