//! Background training worker: training runs here, off the caller's thread.
//!
//! Communication is via `mpsc` channels: jobs go in as [`WorkerCommand`]s and
//! progress comes back as [`WorkerEvent`]s. The worker runs jobs one at a
//! time inside a private rayon::ThreadPool (not the global pool), which the
//! per-window normalization uses.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use signallab_core::domain::{Bar, ModelId};

use crate::error::RunnerError;
use crate::model_store::ModelRecord;
use crate::orchestrator::{TrainingOrchestrator, TrainingReport};

/// One training request. The model must already be IN_TRAINING.
#[derive(Debug, Clone)]
pub struct TrainingJob {
    pub record: ModelRecord,
    pub bars: Vec<Bar>,
    pub patience: usize,
}

#[derive(Debug)]
pub enum WorkerCommand {
    Train(Box<TrainingJob>),
    Shutdown,
}

#[derive(Debug, Clone)]
pub enum WorkerEvent {
    Started { model_id: ModelId },
    Finished { model_id: ModelId, report: Box<TrainingReport> },
    Failed { model_id: ModelId, error: String },
}

impl WorkerEvent {
    pub fn model_id(&self) -> ModelId {
        match self {
            WorkerEvent::Started { model_id }
            | WorkerEvent::Finished { model_id, .. }
            | WorkerEvent::Failed { model_id, .. } => *model_id,
        }
    }

    /// True for the last event a job produces.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WorkerEvent::Started { .. })
    }
}

pub struct TrainingWorker {
    commands: Sender<WorkerCommand>,
    events: Receiver<WorkerEvent>,
    handle: Option<JoinHandle<()>>,
}

impl TrainingWorker {
    /// Spawn the worker thread.
    pub fn spawn(orchestrator: Arc<TrainingOrchestrator>) -> Result<Self, RunnerError> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("signallab-trainer".into())
            .spawn(move || worker_loop(cmd_rx, event_tx, orchestrator))
            .map_err(|e| RunnerError::io("signallab-trainer", e))?;
        Ok(Self {
            commands: cmd_tx,
            events: event_rx,
            handle: Some(handle),
        })
    }

    /// Queue a job. Returns immediately.
    pub fn submit(&self, job: TrainingJob) -> Result<(), RunnerError> {
        self.commands
            .send(WorkerCommand::Train(Box::new(job)))
            .map_err(|_| RunnerError::WorkerGone)
    }

    /// Block for the next event, up to `timeout`.
    pub fn next_event(&self, timeout: Duration) -> Result<Option<WorkerEvent>, RunnerError> {
        match self.events.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(RunnerError::WorkerGone),
        }
    }

    /// Block until `model_id`'s job ends, discarding events for other models.
    pub fn wait_for(&self, model_id: ModelId) -> Result<WorkerEvent, RunnerError> {
        loop {
            let event = self.events.recv().map_err(|_| RunnerError::WorkerGone)?;
            if event.model_id() == model_id && event.is_terminal() {
                return Ok(event);
            }
        }
    }

    /// Finish queued jobs and join the thread.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.commands.send(WorkerCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("training worker panicked");
            }
        }
    }
}

impl Drop for TrainingWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(
    rx: Receiver<WorkerCommand>,
    tx: Sender<WorkerEvent>,
    orchestrator: Arc<TrainingOrchestrator>,
) {
    let pool = rayon::ThreadPoolBuilder::new()
        .thread_name(|i| format!("signallab-pool-{i}"))
        .build();
    if let Err(e) = &pool {
        warn!(error = %e, "no private rayon pool, using the global one");
    }

    loop {
        match rx.recv() {
            Ok(WorkerCommand::Shutdown) | Err(_) => break,
            Ok(WorkerCommand::Train(job)) => {
                let run = || handle_job(&job, &tx, &orchestrator);
                match &pool {
                    Ok(pool) => pool.install(run),
                    Err(_) => run(),
                }
            }
        }
    }
    debug!("training worker stopped");
}

fn handle_job(job: &TrainingJob, tx: &Sender<WorkerEvent>, orchestrator: &TrainingOrchestrator) {
    let model_id = job.record.id;
    let _ = tx.send(WorkerEvent::Started { model_id });

    let event = match orchestrator.run(&job.record, &job.bars, job.patience) {
        Ok(report) => WorkerEvent::Finished {
            model_id,
            report: Box::new(report),
        },
        Err(e) => WorkerEvent::Failed {
            model_id,
            error: e.to_string(),
        },
    };
    let _ = tx.send(event);
}
