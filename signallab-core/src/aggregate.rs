//! Collapse per-sample class probabilities into one signal and a confidence.
//!
//! Only the last `prediction_window` rows of model output are considered.
//! The winner is the class that is arg-max most often (lowest id on a tie),
//! and
//!
//! ```text
//! confidence = (output_avg[winner] + tally[winner] / prediction_window) / 2
//! ```
//!
//! The tally is divided by the configured window, not by the number of rows
//! actually present, so a short output lowers the confidence.

use serde::{Deserialize, Serialize};

use crate::classifier::{argmax, Probabilities};
use crate::domain::{SignalLabel, NUM_CLASSES};
use crate::error::PipelineError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub label: SignalLabel,
    pub confidence: f64,
    /// Arg-max counts per class over the considered rows.
    pub tally: [usize; NUM_CLASSES],
    /// Mean probability per class over the considered rows.
    pub output_avg: [f64; NUM_CLASSES],
}

/// Aggregate raw model output.
pub fn aggregate(
    output: &[Probabilities],
    prediction_window: usize,
) -> Result<PredictionResult, PipelineError> {
    if prediction_window == 0 {
        return Err(PipelineError::InvalidParameter(
            "prediction window must be >= 1".into(),
        ));
    }
    if output.is_empty() {
        return Err(PipelineError::EmptyInput("model output"));
    }

    let recent = &output[output.len().saturating_sub(prediction_window)..];

    let mut tally = [0usize; NUM_CLASSES];
    let mut output_avg = [0.0; NUM_CLASSES];
    for row in recent {
        tally[argmax(row)] += 1;
        for (avg, p) in output_avg.iter_mut().zip(row) {
            *avg += p;
        }
    }
    for avg in output_avg.iter_mut() {
        *avg /= recent.len() as f64;
    }

    combine(tally, output_avg, prediction_window)
}

/// Pick the winner from precomputed tallies and averages.
pub fn combine(
    tally: [usize; NUM_CLASSES],
    output_avg: [f64; NUM_CLASSES],
    prediction_window: usize,
) -> Result<PredictionResult, PipelineError> {
    if prediction_window == 0 {
        return Err(PipelineError::InvalidParameter(
            "prediction window must be >= 1".into(),
        ));
    }

    let mut winner = 0;
    for (id, &count) in tally.iter().enumerate().skip(1) {
        if count > tally[winner] {
            winner = id;
        }
    }
    if tally[winner] == 0 {
        return Err(PipelineError::EmptyInput("model output"));
    }

    let label = SignalLabel::from_id(winner)
        .ok_or_else(|| PipelineError::InvalidParameter(format!("class id {winner}")))?;
    let confidence = (output_avg[winner] + tally[winner] as f64 / prediction_window as f64) / 2.0;

    Ok(PredictionResult {
        label,
        confidence,
        tally,
        output_avg,
    })
}
