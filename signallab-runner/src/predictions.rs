//! Prediction log: JSONL append-only persistence.
//!
//! Each prediction is one JSON object per line, making the file resilient to
//! partial writes and easy to stream or tail. Ids are assigned sequentially
//! from the highest id already in the file.

use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use signallab_core::aggregate::PredictionResult;
use signallab_core::domain::{Algorithm, DataSource, ModelId, PredictionId, SignalLabel};

use crate::error::RunnerError;
use crate::model_store::ModelRecord;

/// One logged prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id: PredictionId,
    pub model_id: ModelId,
    pub data_source: DataSource,
    pub symbol_name: String,
    pub algorithm: Algorithm,
    pub result: SignalLabel,
    pub confidence: f64,
    pub created: DateTime<Utc>,
}

pub struct PredictionLog {
    path: PathBuf,
    /// Serializes id assignment with the append.
    next_id: Mutex<Option<u64>>,
}

impl PredictionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            next_id: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a prediction for `model` and return the stored record.
    pub fn append(
        &self,
        model: &ModelRecord,
        result: &PredictionResult,
    ) -> Result<PredictionRecord, RunnerError> {
        let mut next_id = self.next_id.lock().map_err(|_| {
            RunnerError::io(&self.path, io::Error::other("prediction log lock poisoned"))
        })?;
        let id = match *next_id {
            Some(id) => id,
            None => self.read_all()?.iter().map(|r| r.id.0).max().unwrap_or(0) + 1,
        };

        let record = PredictionRecord {
            id: PredictionId(id),
            model_id: model.id,
            data_source: model.data_source,
            symbol_name: model.symbol_name.clone(),
            algorithm: model.algorithm,
            result: result.label,
            confidence: result.confidence,
            created: Utc::now(),
        };
        let json = serde_json::to_string(&record)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| RunnerError::io(parent, e))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| RunnerError::io(&self.path, e))?;
        writeln!(file, "{json}").map_err(|e| RunnerError::io(&self.path, e))?;
        file.flush().map_err(|e| RunnerError::io(&self.path, e))?;

        *next_id = Some(id + 1);
        Ok(record)
    }

    /// Read every record. Skips malformed lines.
    pub fn read_all(&self) -> Result<Vec<PredictionRecord>, RunnerError> {
        let file = match fs::File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(RunnerError::io(&self.path, e)),
        };

        let mut records = Vec::new();
        for (n, line) in io::BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| RunnerError::io(&self.path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<PredictionRecord>(&line) {
                Ok(record) => records.push(record),
                Err(e) => warn!(path = %self.path.display(), line = n + 1, error = %e, "skipping malformed prediction"),
            }
        }
        Ok(records)
    }

    /// Records for one model, oldest first.
    pub fn for_model(&self, model_id: ModelId) -> Result<Vec<PredictionRecord>, RunnerError> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|r| r.model_id == model_id)
            .collect())
    }
}
