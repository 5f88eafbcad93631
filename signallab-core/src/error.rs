//! Pipeline contract violations.
//!
//! Everything here means the caller handed the pipeline malformed input.
//! None of these are recoverable by retrying.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("bars out of order: {prev} is followed by {next} at index {index}")]
    UnsortedBars {
        index: usize,
        prev: NaiveDate,
        next: NaiveDate,
    },

    #[error("duplicate bar for {day} at index {index}")]
    DuplicateDay { index: usize, day: NaiveDate },

    #[error("bar for {day} has a non-finite price or volume")]
    VoidBar { day: NaiveDate },

    #[error("rocn at row {row} is not finite ({value})")]
    NonFiniteRocn { row: usize, value: f64 },

    #[error("row {row} has {actual} features, expected {expected}")]
    RaggedRows {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("{features} feature rows but {labels} labels")]
    LengthMismatch { features: usize, labels: usize },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("empty input: {0}")]
    EmptyInput(&'static str),
}
