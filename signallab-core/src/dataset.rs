//! Samples, labelled datasets and the train/test split.

use serde::{Deserialize, Serialize};

use crate::domain::{LabelCounts, SignalLabel};
use crate::error::PipelineError;

/// One classifier input: `timesteps × features`.
///
/// Sequence-aware algorithms see `seq_len` timesteps; the others see a single
/// feature row wrapped as one timestep.
pub type Sample = Vec<Vec<f64>>;

/// Samples paired one-to-one with labels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub samples: Vec<Sample>,
    pub labels: Vec<SignalLabel>,
}

impl Dataset {
    /// Pair samples with labels, rejecting mismatched lengths and ragged samples.
    pub fn new(samples: Vec<Sample>, labels: Vec<SignalLabel>) -> Result<Self, PipelineError> {
        if samples.len() != labels.len() {
            return Err(PipelineError::LengthMismatch {
                features: samples.len(),
                labels: labels.len(),
            });
        }
        let dataset = Self { samples, labels };
        dataset.shape()?;
        Ok(dataset)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn counts(&self) -> LabelCounts {
        LabelCounts::from_labels(&self.labels)
    }

    /// `(timesteps, features)` shared by every sample; `(0, 0)` when empty.
    pub fn shape(&self) -> Result<(usize, usize), PipelineError> {
        sample_shape(&self.samples)
    }

    /// First `at` items and the rest, order preserved.
    pub fn split_at(mut self, at: usize) -> (Dataset, Dataset) {
        let at = at.min(self.len());
        let tail_samples = self.samples.split_off(at);
        let tail_labels = self.labels.split_off(at);
        (
            self,
            Dataset {
                samples: tail_samples,
                labels: tail_labels,
            },
        )
    }

    pub fn extend(&mut self, other: Dataset) {
        self.samples.extend(other.samples);
        self.labels.extend(other.labels);
    }
}

/// Common `(timesteps, features)` of a sample batch.
pub fn sample_shape(samples: &[Sample]) -> Result<(usize, usize), PipelineError> {
    let Some(first) = samples.first() else {
        return Ok((0, 0));
    };
    let timesteps = first.len();
    let features = first.first().map_or(0, Vec::len);

    let mut row_index = 0usize;
    for sample in samples {
        if sample.len() != timesteps {
            return Err(PipelineError::RaggedRows {
                row: row_index,
                expected: timesteps,
                actual: sample.len(),
            });
        }
        for row in sample {
            if row.len() != features {
                return Err(PipelineError::RaggedRows {
                    row: row_index,
                    expected: features,
                    actual: row.len(),
                });
            }
            row_index += 1;
        }
    }
    Ok((timesteps, features))
}

/// Where the train/test boundary is drawn for sequence-aware algorithms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitOrder {
    /// Balance and shuffle every window, then cut the shuffled set 80/20.
    /// Test windows may precede training windows in calendar time.
    #[default]
    AfterBalancing,
    /// Cut the chronological windows first, then balance the training part
    /// only. The test part keeps its natural order and class mix.
    Chronological,
}

/// `(x_train, y_train, x_test, y_test)`.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSplit {
    pub train: Dataset,
    pub test: Dataset,
}

/// Number of leading items that go to training for a given train ratio.
///
/// The test part is rounded up, so both sides are non-empty whenever
/// `n >= 2` and `0 < ratio < 1`.
pub fn train_len(n: usize, ratio: f64) -> usize {
    let test = ((n as f64) * (1.0 - ratio) - 1e-9).ceil().max(0.0) as usize;
    n.saturating_sub(test)
}
