//! Feature table → classifier-ready tensors.
//!
//! Training: label → (window + balance for sequence-aware algorithms) →
//! 80/20 split → normalize each part.
//! Inference: chronological windows over every row, including the trailing
//! rows that have no label yet, never balanced or shuffled.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::{train_len, Dataset, Sample, SplitOrder, TrainingSplit};
use crate::domain::{Algorithm, LabelCounts};
use crate::error::PipelineError;
use crate::features::FeatureTable;
use crate::labeler::label_table;
use crate::normalize::{normalize_table, normalize_windows};
use crate::sequence::{balance, labelled_windows, windows};

/// Shape of the training and inference inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Window length for sequence-aware algorithms, and the number of most
    /// recent samples fed to the classifier at inference.
    pub seq_len: usize,
    /// Fraction of samples that go to training.
    pub split_ratio: f64,
    pub split_order: SplitOrder,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            seq_len: 60,
            split_ratio: 0.8,
            split_order: SplitOrder::AfterBalancing,
        }
    }
}

impl PipelineSettings {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.seq_len == 0 {
            return Err(PipelineError::InvalidParameter("seq_len must be >= 1".into()));
        }
        if !(self.split_ratio > 0.0 && self.split_ratio < 1.0) {
            return Err(PipelineError::InvalidParameter(format!(
                "split_ratio must be in (0, 1), got {}",
                self.split_ratio
            )));
        }
        Ok(())
    }
}

/// Training tensors plus the bookkeeping the training report needs.
#[derive(Debug, Clone)]
pub struct PreparedTraining {
    pub split: TrainingSplit,
    pub feature_rows: usize,
    pub labelled_rows: usize,
    pub label_counts: LabelCounts,
    /// Windows before balancing; equal to `labelled_rows` for plain algorithms.
    pub samples: usize,
    /// Class counts after balancing, for sequence-aware algorithms.
    pub balanced_counts: Option<LabelCounts>,
}

pub fn prepare_training<R: Rng + ?Sized>(
    table: &FeatureTable,
    algorithm: Algorithm,
    settings: &PipelineSettings,
    rng: &mut R,
) -> Result<PreparedTraining, PipelineError> {
    settings.validate()?;
    let labelled = label_table(table)?;
    let label_counts = labelled.counts();

    let (split, samples, balanced_counts) = if algorithm.is_sequential() {
        let all = labelled_windows(&labelled.rows, &labelled.labels, settings.seq_len)?;
        let samples = all.len();

        let (mut train, mut test) = match settings.split_order {
            SplitOrder::AfterBalancing => {
                let balanced = balance(all, rng);
                let at = train_len(balanced.len(), settings.split_ratio);
                balanced.split_at(at)
            }
            SplitOrder::Chronological => {
                let at = train_len(all.len(), settings.split_ratio);
                let (train, test) = all.split_at(at);
                (balance(train, rng), test)
            }
        };
        let mut balanced = train.counts();
        if settings.split_order == SplitOrder::AfterBalancing {
            for (total, n) in balanced.0.iter_mut().zip(test.counts().0) {
                *total += n;
            }
        }

        normalize_windows(&mut train.samples);
        normalize_windows(&mut test.samples);
        (TrainingSplit { train, test }, samples, Some(balanced))
    } else {
        let n = labelled.len();
        let at = train_len(n, settings.split_ratio);
        let mut rows = labelled.rows;
        let mut labels = labelled.labels;
        let mut test_rows = rows.split_off(at);
        let test_labels = labels.split_off(at);

        normalize_table(&mut rows);
        normalize_table(&mut test_rows);

        let train = Dataset::new(wrap_rows(rows), labels)?;
        let test = Dataset::new(wrap_rows(test_rows), test_labels)?;
        (TrainingSplit { train, test }, n, None)
    };

    if split.train.is_empty() || split.test.is_empty() {
        return Err(PipelineError::EmptyInput("training split"));
    }

    debug!(
        algorithm = %algorithm,
        rows = table.len(),
        labelled = label_counts.total(),
        samples,
        train = split.train.len(),
        test = split.test.len(),
        "prepared training split"
    );

    Ok(PreparedTraining {
        feature_rows: table.len(),
        labelled_rows: label_counts.total(),
        label_counts,
        samples,
        balanced_counts,
        split,
    })
}

/// The most recent `seq_len` normalized samples, oldest first.
pub fn prepare_inference(
    table: &FeatureTable,
    algorithm: Algorithm,
    seq_len: usize,
) -> Result<Vec<Sample>, PipelineError> {
    if seq_len == 0 {
        return Err(PipelineError::InvalidParameter("seq_len must be >= 1".into()));
    }

    let samples = if algorithm.is_sequential() {
        let mut all = windows(&table.rows, seq_len)?;
        let start = all.len().saturating_sub(seq_len);
        let mut recent = all.split_off(start);
        normalize_windows(&mut recent);
        recent
    } else {
        let mut rows = table.rows.clone();
        normalize_table(&mut rows);
        let start = rows.len().saturating_sub(seq_len);
        wrap_rows(rows.split_off(start))
    };

    if samples.is_empty() {
        return Err(PipelineError::EmptyInput("inference samples"));
    }
    Ok(samples)
}

fn wrap_rows(rows: Vec<Vec<f64>>) -> Vec<Sample> {
    rows.into_iter().map(|row| vec![row]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SignalLabel;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Table whose close column cycles so every label occurs.
    fn cyclic_table(n: usize) -> FeatureTable {
        let rocn_cycle = [0.08, 0.02, 0.0, -0.02, -0.08];
        FeatureTable {
            columns: vec!["close".into(), "x".into()],
            days: vec![chrono::NaiveDate::default(); n],
            rows: (0..n).map(|i| vec![100.0 + i as f64, (i % 7) as f64]).collect(),
            rocn: (0..n)
                .map(|i| if i + 3 < n { Some(rocn_cycle[i % 5]) } else { None })
                .collect(),
        }
    }

    fn settings(seq_len: usize) -> PipelineSettings {
        PipelineSettings {
            seq_len,
            ..PipelineSettings::default()
        }
    }

    #[test]
    fn plain_algorithm_split_is_chronological() {
        let table = cyclic_table(53);
        let prepared = prepare_training(
            &table,
            Algorithm::Lstm,
            &settings(60),
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap();

        assert_eq!(prepared.labelled_rows, 50);
        assert_eq!(prepared.split.train.len(), 40);
        assert_eq!(prepared.split.test.len(), 10);
        assert_eq!(prepared.split.train.shape().unwrap(), (1, 2));
        assert_eq!(prepared.split.train.labels[0], SignalLabel::StrongBuy);
        assert_eq!(prepared.split.test.labels[0], SignalLabel::StrongBuy);
        assert!(prepared.balanced_counts.is_none());
    }

    #[test]
    fn sequential_algorithm_is_balanced() {
        let table = cyclic_table(103);
        let prepared = prepare_training(
            &table,
            Algorithm::LstmSeq,
            &settings(10),
            &mut StdRng::seed_from_u64(2),
        )
        .unwrap();

        // 100 labelled rows → 91 windows → 18 per class after balancing
        assert_eq!(prepared.samples, 91);
        let balanced = prepared.balanced_counts.unwrap();
        assert!(balanced.0.iter().all(|&n| n == 18));
        assert_eq!(prepared.split.train.len() + prepared.split.test.len(), 90);
        assert_eq!(prepared.split.train.len(), 72);
        assert_eq!(prepared.split.train.shape().unwrap(), (10, 2));
    }

    #[test]
    fn everything_normalized() {
        let table = cyclic_table(103);
        for algorithm in Algorithm::ALL {
            let prepared = prepare_training(
                &table,
                algorithm,
                &settings(10),
                &mut StdRng::seed_from_u64(3),
            )
            .unwrap();
            for ds in [&prepared.split.train, &prepared.split.test] {
                for v in ds.samples.iter().flatten().flatten() {
                    assert!((0.0..=1.0).contains(v));
                }
            }
        }
    }

    #[test]
    fn chronological_split_keeps_test_order() {
        let table = cyclic_table(103);
        let s = PipelineSettings {
            seq_len: 10,
            split_order: SplitOrder::Chronological,
            ..PipelineSettings::default()
        };
        let prepared =
            prepare_training(&table, Algorithm::JordanSeq, &s, &mut StdRng::seed_from_u64(4))
                .unwrap();
        // 91 windows → 72 train (balanced) / 19 test (natural order)
        assert_eq!(prepared.split.test.len(), 19);
        let test = &prepared.split.test.labels;
        for pair in test.windows(2) {
            assert_eq!((pair[0].id() + 1) % 5, pair[1].id());
        }
    }

    #[test]
    fn too_few_rows_is_an_error() {
        let table = cyclic_table(4);
        assert!(matches!(
            prepare_training(&table, Algorithm::Lstm, &settings(60), &mut StdRng::seed_from_u64(0)),
            Err(PipelineError::EmptyInput(_))
        ));
    }

    #[test]
    fn inference_uses_trailing_rows() {
        let table = cyclic_table(100);
        let samples = prepare_inference(&table, Algorithm::LstmSeq, 60).unwrap();
        // 100 rows → 41 windows, all of them recent enough
        assert_eq!(samples.len(), 41);
        assert_eq!(samples[0].len(), 60);

        let plain = prepare_inference(&table, Algorithm::Jordan, 60).unwrap();
        assert_eq!(plain.len(), 60);
        // last row of the table is the last sample, scaled to the column max
        assert_eq!(plain[59][0][0], 1.0);
    }

    #[test]
    fn inference_caps_at_seq_len_windows() {
        let table = cyclic_table(200);
        let samples = prepare_inference(&table, Algorithm::LstmSeq, 60).unwrap();
        assert_eq!(samples.len(), 60);
    }

    #[test]
    fn inference_without_enough_rows() {
        let table = cyclic_table(20);
        assert!(prepare_inference(&table, Algorithm::LstmSeq, 60).is_err());
        assert_eq!(prepare_inference(&table, Algorithm::Lstm, 60).unwrap().len(), 20);
    }
}
