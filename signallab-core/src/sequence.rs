//! Sliding windows and class balancing.

use std::collections::VecDeque;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::dataset::{Dataset, Sample};
use crate::domain::{SignalLabel, NUM_CLASSES};
use crate::error::PipelineError;

/// Every full `seq_len` window of consecutive rows, oldest first.
///
/// `N` rows yield `max(0, N - seq_len + 1)` windows.
pub fn windows(rows: &[Vec<f64>], seq_len: usize) -> Result<Vec<Sample>, PipelineError> {
    if seq_len == 0 {
        return Err(PipelineError::InvalidParameter("seq_len must be >= 1".into()));
    }

    let mut out = Vec::with_capacity(rows.len().saturating_sub(seq_len - 1));
    let mut buffer: VecDeque<&Vec<f64>> = VecDeque::with_capacity(seq_len);
    for row in rows {
        if buffer.len() == seq_len {
            buffer.pop_front();
        }
        buffer.push_back(row);
        if buffer.len() == seq_len {
            out.push(buffer.iter().map(|r| (*r).clone()).collect());
        }
    }
    Ok(out)
}

/// Windows labelled with the label of their last row.
pub fn labelled_windows(
    rows: &[Vec<f64>],
    labels: &[SignalLabel],
    seq_len: usize,
) -> Result<Dataset, PipelineError> {
    if rows.len() != labels.len() {
        return Err(PipelineError::LengthMismatch {
            features: rows.len(),
            labels: labels.len(),
        });
    }
    let samples = windows(rows, seq_len)?;
    let window_labels = labels.iter().skip(seq_len - 1).copied().collect();
    Dataset::new(samples, window_labels)
}

/// Undersample to equal class counts and shuffle.
///
/// Each class bucket is shuffled, every non-empty bucket is truncated to the
/// size of the smallest non-empty bucket, and the concatenation is shuffled
/// again. Classes with no samples stay absent.
pub fn balance<R: Rng + ?Sized>(dataset: Dataset, rng: &mut R) -> Dataset {
    let mut buckets: [Vec<Sample>; NUM_CLASSES] = Default::default();
    for (sample, label) in dataset.samples.into_iter().zip(dataset.labels) {
        buckets[label.id()].push(sample);
    }

    for bucket in buckets.iter_mut() {
        bucket.shuffle(rng);
    }

    let floor = buckets
        .iter()
        .map(Vec::len)
        .filter(|&n| n > 0)
        .min()
        .unwrap_or(0);

    let mut pairs: Vec<(Sample, SignalLabel)> = Vec::with_capacity(floor * NUM_CLASSES);
    for (label, bucket) in SignalLabel::ALL.into_iter().zip(buckets) {
        pairs.extend(bucket.into_iter().take(floor).map(|s| (s, label)));
    }
    pairs.shuffle(rng);

    let (samples, labels) = pairs.into_iter().unzip();
    Dataset { samples, labels }
}
