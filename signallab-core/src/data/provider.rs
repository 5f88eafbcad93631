//! Bar source trait and structured error types.
//!
//! `BarSource` abstracts over where daily bars come from (CSV files on disk,
//! a synthetic random walk) so the pipeline never needs per-source copies and
//! tests can run without any files.

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::{Bar, DataSource};
use crate::error::PipelineError;

/// Structured error types for bar loading.
///
/// These are designed to be displayable in CLI output as-is.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("no bars for {data_source}/{symbol}")]
    SymbolNotFound {
        data_source: DataSource,
        symbol: String,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed bar file {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("invalid bar series: {0}")]
    Invalid(#[from] PipelineError),
}

/// Trait for bar sources.
///
/// Implementations return the complete daily history of one symbol, ascending
/// by day. Date slicing happens above this trait.
pub trait BarSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Load every bar for `symbol` from `data_source`.
    fn load(&self, data_source: DataSource, symbol: &str) -> Result<Vec<Bar>, DataError>;
}
