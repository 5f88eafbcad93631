//! End-to-end model lifecycle through `ModelService`.
//!
//! Synthetic uptrend bars, real worker thread, real artifact files in a
//! temp directory.

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use signallab_core::data::{BarSource, CsvBarSource, SyntheticBarSource};
use signallab_core::domain::{Algorithm, DataSource, ModelStatus, PredictionWindow};
use signallab_runner::{
    BackendKind, InMemoryModelStore, ModelService, ModelStore, PipelineConfig, RunnerError,
    StoreError, TrainRequest, WorkerEvent,
};

fn config(dir: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.storage.bar_dir = dir.join("bars");
    config.storage.artifact_root = dir.join("artifacts");
    config.storage.model_store = dir.join("models.json");
    config.storage.prediction_log = dir.join("predictions.jsonl");
    config
}

fn service(dir: &Path) -> (ModelService, Arc<InMemoryModelStore>) {
    let store = Arc::new(InMemoryModelStore::new());
    let bars = Arc::new(SyntheticBarSource::uptrend(400));
    let service = ModelService::new(config(dir), store.clone(), bars).unwrap();
    (service, store)
}

#[test]
fn uptrend_model_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _) = service(dir.path());

    let created = service
        .create(DataSource::Binance, "UPTREND", Algorithm::Lstm, PredictionWindow::Small)
        .unwrap();
    assert_eq!(created.status, ModelStatus::Created);
    assert!(service.artifacts().exists(&created.artifact_key()));

    let request = TrainRequest {
        patience: Some(5),
        ..TrainRequest::default()
    };
    let accepted = service.start_training(created.id, &request).unwrap();
    assert_eq!(accepted.status, ModelStatus::InTraining);

    match service.wait_for_training(created.id).unwrap() {
        WorkerEvent::Finished { report, .. } => {
            assert_eq!(report.bars, 400);
            assert!(report.history.epochs_run() >= 1);
            assert!(report.history.epochs_run() <= 125);
            assert!(report.label_counts.bullish_share() > 0.5);
        }
        other => panic!("expected Finished, got {other:?}"),
    }
    assert_eq!(service.model(created.id).unwrap().status, ModelStatus::Trained);

    let prediction = service.predict(created.id).unwrap();
    assert_eq!(prediction.model_id, created.id);
    assert_eq!(prediction.symbol_name, "UPTREND");
    assert!((0.0..=1.0).contains(&prediction.confidence));
    assert_eq!(service.predictions().unwrap(), vec![prediction]);

    // Retraining a trained model is allowed.
    service.start_training(created.id, &request).unwrap();
    assert!(matches!(
        service.wait_for_training(created.id).unwrap(),
        WorkerEvent::Finished { .. }
    ));

    let deleted = service.delete(created.id).unwrap();
    assert!(!service.artifacts().exists(&deleted.artifact_key()));
    assert!(matches!(
        service.model(created.id),
        Err(RunnerError::Store(StoreError::NotFound(_)))
    ));
}

#[test]
fn training_while_in_training_is_a_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let (service, store) = service(dir.path());
    let m = service
        .create(DataSource::Binance, "UPTREND", Algorithm::LstmSeq, PredictionWindow::Tiny)
        .unwrap();
    store.transition(m.id, ModelStatus::InTraining).unwrap();

    let err = service
        .start_training(m.id, &TrainRequest::default())
        .unwrap_err();
    assert!(matches!(err, RunnerError::Conflict(id) if id == m.id), "{err}");
    assert!(matches!(service.delete(m.id), Err(RunnerError::Conflict(_))));
}

#[test]
fn short_date_range_is_rejected_before_training() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _) = service(dir.path());
    let m = service
        .create(DataSource::Binance, "UPTREND", Algorithm::Jordan, PredictionWindow::Tiny)
        .unwrap();

    // Synthetic bars start on 2020-01-01, one per calendar day. 60 bars lose
    // 33 to the warm-up and one more to the 1-day horizon.
    let request = TrainRequest {
        patience: None,
        start: NaiveDate::from_ymd_opt(2020, 1, 1),
        end: NaiveDate::from_ymd_opt(2020, 2, 29),
    };
    let err = service.start_training(m.id, &request).unwrap_err();
    match err {
        RunnerError::InsufficientHistory { rows, required, .. } => {
            assert_eq!(rows, 26);
            assert_eq!(required, 30);
        }
        other => panic!("expected InsufficientHistory, got {other}"),
    }
    assert_eq!(service.model(m.id).unwrap().status, ModelStatus::Created);
}

#[test]
fn minimum_counts_rows_left_after_warmup() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(InMemoryModelStore::new());
    // 50 bars clear the raw-bar count but leave 17 feature rows, 16 labelled.
    let bars = Arc::new(SyntheticBarSource::uptrend(50));
    let service = ModelService::new(config(dir.path()), store, bars).unwrap();
    let m = service
        .create(DataSource::YFinance, "SHORT", Algorithm::Lstm, PredictionWindow::Tiny)
        .unwrap();

    match service.start_training(m.id, &TrainRequest::default()) {
        Err(RunnerError::InsufficientHistory { rows, required, .. }) => {
            assert_eq!(rows, 16);
            assert_eq!(required, 30);
        }
        other => panic!("expected InsufficientHistory, got {other:?}"),
    }
    assert_eq!(service.model(m.id).unwrap().status, ModelStatus::Created);
}

#[test]
fn failed_training_ends_errored() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(InMemoryModelStore::new());
    // 46 labelled rows pass the minimum but cannot fill a single 60-row window.
    let bars = Arc::new(SyntheticBarSource::uptrend(80));
    let service = ModelService::new(config(dir.path()), store, bars).unwrap();
    let m = service
        .create(DataSource::YFinance, "SHORT", Algorithm::LstmSeq, PredictionWindow::Tiny)
        .unwrap();

    service.start_training(m.id, &TrainRequest::default()).unwrap();
    assert!(matches!(
        service.wait_for_training(m.id).unwrap(),
        WorkerEvent::Failed { .. }
    ));
    assert_eq!(service.model(m.id).unwrap().status, ModelStatus::Errored);
}

#[test]
fn file_backed_service_with_csv_bars() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path());
    config.backend.kind = BackendKind::Majority;
    config.pipeline.seq_len = 20;

    let bars = SyntheticBarSource::default().generate(DataSource::YFinance, "SPY");
    CsvBarSource::new(&config.storage.bar_dir)
        .write(DataSource::YFinance, "spy", &bars)
        .unwrap();

    let id = {
        let service = ModelService::open(config.clone()).unwrap();
        assert!(matches!(
            service.create(DataSource::YFinance, "QQQ", Algorithm::Lstm, PredictionWindow::Tiny),
            Err(RunnerError::Data(_))
        ));

        let m = service
            .create(DataSource::YFinance, "SPY", Algorithm::JordanSeq, PredictionWindow::Medium)
            .unwrap();
        service.start_training(m.id, &TrainRequest::default()).unwrap();
        service.wait_for_training(m.id).unwrap();
        service.predict(m.id).unwrap();
        m.id
    };

    // A fresh service sees the persisted record, artifact and prediction.
    let reopened = ModelService::open(config).unwrap();
    let record = reopened.model(id).unwrap();
    assert_eq!(record.status, ModelStatus::Trained);
    assert_eq!(record.algorithm, Algorithm::JordanSeq);
    assert!(reopened.artifacts().exists(&record.artifact_key()));
    assert_eq!(reopened.predictions().unwrap().len(), 1);
    assert_eq!(CsvBarSource::new(&reopened.config().storage.bar_dir).name(), "csv");
}
