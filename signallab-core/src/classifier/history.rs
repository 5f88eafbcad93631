//! Fit history, evaluation scores and early stopping.

use serde::{Deserialize, Serialize};

use crate::classifier::{argmax, Probabilities};
use crate::domain::SignalLabel;

/// Loss and accuracy of a classifier over a labelled set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub loss: f64,
    pub accuracy: f64,
}

impl Evaluation {
    /// Mean cross-entropy and arg-max accuracy. Zero-length input scores NaN loss.
    pub fn score(probs: &[Probabilities], labels: &[SignalLabel]) -> Self {
        let n = probs.len().min(labels.len());
        if n == 0 {
            return Self {
                loss: f64::NAN,
                accuracy: 0.0,
            };
        }
        let mut loss = 0.0;
        let mut hits = 0usize;
        for (p, label) in probs.iter().zip(labels) {
            loss -= p[label.id()].max(1e-12).ln();
            if argmax(p) == label.id() {
                hits += 1;
            }
        }
        Self {
            loss: loss / n as f64,
            accuracy: hits as f64 / n as f64,
        }
    }
}

/// Metrics after one epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch: usize,
    pub loss: f64,
    pub accuracy: f64,
    pub val_loss: f64,
    pub val_accuracy: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub epochs: Vec<EpochMetrics>,
    pub stopped_early: bool,
    /// Epoch with the highest validation accuracy.
    pub best_epoch: Option<usize>,
}

impl TrainingHistory {
    pub fn epochs_run(&self) -> usize {
        self.epochs.len()
    }

    pub fn last(&self) -> Option<&EpochMetrics> {
        self.epochs.last()
    }

    pub fn best_val_accuracy(&self) -> Option<f64> {
        let best = self.best_epoch?;
        self.epochs.iter().find(|m| m.epoch == best).map(|m| m.val_accuracy)
    }
}

/// Stop when validation accuracy has not improved for `patience` epochs.
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience: usize,
    best: f64,
    best_epoch: Option<usize>,
    wait: usize,
}

impl EarlyStopping {
    pub fn new(patience: usize) -> Self {
        Self {
            patience,
            best: f64::NEG_INFINITY,
            best_epoch: None,
            wait: 0,
        }
    }

    /// Record an epoch's validation accuracy. Returns true when training should stop.
    pub fn update(&mut self, epoch: usize, val_accuracy: f64) -> bool {
        if val_accuracy > self.best {
            self.best = val_accuracy;
            self.best_epoch = Some(epoch);
            self.wait = 0;
            return false;
        }
        self.wait += 1;
        self.wait >= self.patience
    }

    pub fn best_epoch(&self) -> Option<usize> {
        self.best_epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stops_after_patience() {
        let mut es = EarlyStopping::new(2);
        assert!(!es.update(0, 0.5));
        assert!(!es.update(1, 0.6));
        assert!(!es.update(2, 0.6));
        assert!(es.update(3, 0.55));
        assert_eq!(es.best_epoch(), Some(1));
    }

    #[test]
    fn improvement_resets_wait() {
        let mut es = EarlyStopping::new(2);
        es.update(0, 0.5);
        assert!(!es.update(1, 0.4));
        assert!(!es.update(2, 0.7));
        assert!(!es.update(3, 0.7));
        assert!(es.update(4, 0.1));
    }

    #[test]
    fn score_counts_hits() {
        let probs = [[0.9, 0.1, 0.0, 0.0, 0.0], [0.1, 0.2, 0.7, 0.0, 0.0]];
        let labels = [SignalLabel::StrongBuy, SignalLabel::Buy];
        let eval = Evaluation::score(&probs, &labels);
        assert_eq!(eval.accuracy, 0.5);
        let expected = -(0.9f64.ln() + 0.2f64.ln()) / 2.0;
        assert!((eval.loss - expected).abs() < 1e-12);
    }
}
