//! Model metadata store.
//!
//! Records the algorithm, prediction window and lifecycle status of every
//! model. Status changes go through [`ModelStore::transition`], which checks
//! the lifecycle under the store's lock, so two callers can never both move a
//! model into IN_TRAINING.
//!
//! [`JsonModelStore`] persists the whole table as one JSON document with the
//! enums written as their integer codes.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use signallab_core::domain::{
    Algorithm, ArtifactKey, CodeError, DataSource, IntCode, ModelId, ModelStatus,
    PredictionWindow,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("model {0} not found")]
    NotFound(ModelId),

    #[error("model {id} cannot move from {from} to {to}")]
    IllegalTransition {
        id: ModelId,
        from: ModelStatus,
        to: ModelStatus,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed model store: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed model store: {0}")]
    Code(#[from] CodeError),

    #[error("model store lock poisoned")]
    Poisoned,
}

/// Metadata of one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    pub id: ModelId,
    pub data_source: DataSource,
    pub symbol_name: String,
    pub algorithm: Algorithm,
    pub prediction_window: PredictionWindow,
    pub status: ModelStatus,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl ModelRecord {
    pub fn artifact_key(&self) -> ArtifactKey {
        ArtifactKey::new(self.data_source, self.algorithm, &self.symbol_name, self.id)
    }
}

/// Fields the caller chooses when creating a model.
#[derive(Debug, Clone, PartialEq)]
pub struct NewModel {
    pub data_source: DataSource,
    pub symbol_name: String,
    pub algorithm: Algorithm,
    pub prediction_window: PredictionWindow,
}

pub trait ModelStore: Send + Sync {
    /// Insert a record in CREATED status with a fresh id.
    fn create(&self, new: NewModel) -> Result<ModelRecord, StoreError>;

    fn get(&self, id: ModelId) -> Result<ModelRecord, StoreError>;

    /// Every record, ascending by id.
    fn list(&self) -> Result<Vec<ModelRecord>, StoreError>;

    /// Move a model to `next`, rejecting steps the lifecycle does not allow.
    fn transition(&self, id: ModelId, next: ModelStatus) -> Result<ModelRecord, StoreError>;

    /// Remove a record, returning it.
    fn delete(&self, id: ModelId) -> Result<ModelRecord, StoreError>;
}

// ── Shared table logic ───────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
struct ModelTable {
    next_id: u64,
    models: BTreeMap<ModelId, ModelRecord>,
}

impl ModelTable {
    fn create(&mut self, new: NewModel) -> ModelRecord {
        self.next_id += 1;
        let now = Utc::now();
        let record = ModelRecord {
            id: ModelId(self.next_id),
            data_source: new.data_source,
            symbol_name: new.symbol_name.to_ascii_uppercase(),
            algorithm: new.algorithm,
            prediction_window: new.prediction_window,
            status: ModelStatus::Created,
            created: now,
            updated: now,
        };
        self.models.insert(record.id, record.clone());
        record
    }

    fn get(&self, id: ModelId) -> Result<ModelRecord, StoreError> {
        self.models.get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    fn transition(&mut self, id: ModelId, next: ModelStatus) -> Result<ModelRecord, StoreError> {
        let record = self.models.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if !record.status.can_transition_to(next) {
            return Err(StoreError::IllegalTransition {
                id,
                from: record.status,
                to: next,
            });
        }
        record.status = next;
        record.updated = Utc::now();
        Ok(record.clone())
    }

    fn delete(&mut self, id: ModelId) -> Result<ModelRecord, StoreError> {
        self.models.remove(&id).ok_or(StoreError::NotFound(id))
    }
}

fn lock(table: &Mutex<ModelTable>) -> Result<MutexGuard<'_, ModelTable>, StoreError> {
    table.lock().map_err(|_| StoreError::Poisoned)
}

// ── In-memory store ──────────────────────────────────────────────────

/// Process-local store for tests and one-shot runs.
#[derive(Debug, Default)]
pub struct InMemoryModelStore {
    table: Mutex<ModelTable>,
}

impl InMemoryModelStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ModelStore for InMemoryModelStore {
    fn create(&self, new: NewModel) -> Result<ModelRecord, StoreError> {
        Ok(lock(&self.table)?.create(new))
    }

    fn get(&self, id: ModelId) -> Result<ModelRecord, StoreError> {
        lock(&self.table)?.get(id)
    }

    fn list(&self) -> Result<Vec<ModelRecord>, StoreError> {
        Ok(lock(&self.table)?.models.values().cloned().collect())
    }

    fn transition(&self, id: ModelId, next: ModelStatus) -> Result<ModelRecord, StoreError> {
        lock(&self.table)?.transition(id, next)
    }

    fn delete(&self, id: ModelId) -> Result<ModelRecord, StoreError> {
        lock(&self.table)?.delete(id)
    }
}

// ── JSON file store ──────────────────────────────────────────────────

/// On-disk row: enums as integer codes, data source by name.
#[derive(Debug, Serialize, Deserialize)]
struct StoredModel {
    id: u64,
    data_source: String,
    symbol_name: String,
    algorithm: i64,
    prediction_window: i64,
    status: i64,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
}

impl From<&ModelRecord> for StoredModel {
    fn from(r: &ModelRecord) -> Self {
        Self {
            id: r.id.0,
            data_source: r.data_source.as_str().to_string(),
            symbol_name: r.symbol_name.clone(),
            algorithm: r.algorithm.encode(),
            prediction_window: r.prediction_window.encode(),
            status: r.status.encode(),
            created: r.created,
            updated: r.updated,
        }
    }
}

impl TryFrom<StoredModel> for ModelRecord {
    type Error = CodeError;

    fn try_from(s: StoredModel) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ModelId(s.id),
            data_source: s.data_source.parse()?,
            symbol_name: s.symbol_name,
            algorithm: Algorithm::decode(s.algorithm)?,
            prediction_window: PredictionWindow::decode(s.prediction_window)?,
            status: ModelStatus::decode(s.status)?,
            created: s.created,
            updated: s.updated,
        })
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    next_id: u64,
    models: Vec<StoredModel>,
}

/// Single-file JSON store. Every mutation rewrites the file atomically.
#[derive(Debug)]
pub struct JsonModelStore {
    path: PathBuf,
    table: Mutex<ModelTable>,
}

impl JsonModelStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let table = match fs::read_to_string(&path) {
            Ok(content) => parse_table(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => ModelTable::default(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        Ok(Self {
            path,
            table: Mutex::new(table),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `f` to the table and persist. The file is untouched if `f` fails.
    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut ModelTable) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut table = lock(&self.table)?;
        let mut draft = table.clone();
        let out = f(&mut draft)?;
        persist(&self.path, &draft)?;
        *table = draft;
        Ok(out)
    }
}

fn parse_table(content: &str) -> Result<ModelTable, StoreError> {
    let file: StoreFile = serde_json::from_str(content)?;
    let mut models = BTreeMap::new();
    for stored in file.models {
        let record = ModelRecord::try_from(stored)?;
        models.insert(record.id, record);
    }
    let max_id = models.keys().next_back().map_or(0, |id| id.0);
    Ok(ModelTable {
        next_id: file.next_id.max(max_id),
        models,
    })
}

fn persist(path: &Path, table: &ModelTable) -> Result<(), StoreError> {
    let file = StoreFile {
        next_id: table.next_id,
        models: table.models.values().map(StoredModel::from).collect(),
    };
    let json = serde_json::to_string_pretty(&file)?;
    write_atomic(path, json.as_bytes()).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Write to a sibling temp file, then rename over the target.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)
}

impl ModelStore for JsonModelStore {
    fn create(&self, new: NewModel) -> Result<ModelRecord, StoreError> {
        self.mutate(|t| Ok(t.create(new)))
    }

    fn get(&self, id: ModelId) -> Result<ModelRecord, StoreError> {
        lock(&self.table)?.get(id)
    }

    fn list(&self) -> Result<Vec<ModelRecord>, StoreError> {
        Ok(lock(&self.table)?.models.values().cloned().collect())
    }

    fn transition(&self, id: ModelId, next: ModelStatus) -> Result<ModelRecord, StoreError> {
        self.mutate(|t| t.transition(id, next))
    }

    fn delete(&self, id: ModelId) -> Result<ModelRecord, StoreError> {
        self.mutate(|t| t.delete(id))
    }
}
