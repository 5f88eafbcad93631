//! Trainable sequence classifier capability.
//!
//! The pipeline never sees network topology. A [`ClassifierBackend`] builds or
//! loads a [`Classifier`]; the classifier fits on a training set with early
//! stopping against a validation set, predicts per-class probabilities, and
//! serializes itself to an opaque artifact.

pub mod history;
pub mod majority;
pub mod softmax;

pub use history::{EarlyStopping, EpochMetrics, Evaluation, TrainingHistory};
pub use majority::MajorityBackend;
pub use softmax::SoftmaxBackend;

use std::fmt;

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dataset::{Dataset, Sample};
use crate::domain::{Algorithm, NUM_CLASSES};

/// Class probabilities for one sample, indexed by label id.
pub type Probabilities = [f64; NUM_CLASSES];

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("input shape {actual} does not match model shape {expected}")]
    ShapeMismatch {
        expected: InputShape,
        actual: InputShape,
    },

    #[error("cannot {0} on an empty dataset")]
    EmptyDataset(&'static str),

    #[error("invalid fit options: {0}")]
    InvalidOptions(String),

    #[error("training diverged at epoch {epoch}")]
    Diverged { epoch: usize },

    #[error("artifact is not a {expected} model")]
    WrongBackend { expected: &'static str },

    #[error("artifact encoding: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// `timesteps × features` of every sample a classifier accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputShape {
    pub timesteps: usize,
    pub features: usize,
}

impl InputShape {
    pub fn new(timesteps: usize, features: usize) -> Self {
        Self {
            timesteps,
            features,
        }
    }

    /// Length of a sample once flattened row by row.
    pub fn flat_len(&self) -> usize {
        self.timesteps * self.features
    }

    /// Reject samples of any other shape.
    pub fn check(&self, samples: &[Sample]) -> Result<(), ClassifierError> {
        for sample in samples {
            let conforms =
                sample.len() == self.timesteps && sample.iter().all(|r| r.len() == self.features);
            if !conforms {
                return Err(ClassifierError::ShapeMismatch {
                    expected: *self,
                    actual: InputShape::new(sample.len(), sample.first().map_or(0, Vec::len)),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for InputShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.timesteps, self.features)
    }
}

/// Fit hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitOptions {
    /// Epoch ceiling.
    pub epochs: usize,
    pub batch_size: usize,
    /// Epochs without a validation-accuracy improvement before stopping.
    pub patience: usize,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            epochs: 125,
            batch_size: 64,
            patience: 60,
        }
    }
}

impl FitOptions {
    pub fn validate(&self) -> Result<(), ClassifierError> {
        if self.epochs == 0 {
            return Err(ClassifierError::InvalidOptions("epochs must be >= 1".into()));
        }
        if self.batch_size == 0 {
            return Err(ClassifierError::InvalidOptions("batch_size must be >= 1".into()));
        }
        Ok(())
    }
}

/// A built or loaded classifier. Owned by one caller at a time.
pub trait Classifier: Send {
    fn algorithm(&self) -> Algorithm;

    fn input_shape(&self) -> InputShape;

    /// Train on `train`, monitoring accuracy on `validation` for early stopping.
    fn fit(
        &mut self,
        train: &Dataset,
        validation: &Dataset,
        options: &FitOptions,
        rng: &mut StdRng,
    ) -> Result<TrainingHistory, ClassifierError>;

    /// Per-class probabilities for each sample, in input order.
    fn predict(&self, samples: &[Sample]) -> Result<Vec<Probabilities>, ClassifierError>;

    /// Mean cross-entropy and accuracy over a labelled set.
    fn evaluate(&self, data: &Dataset) -> Result<Evaluation, ClassifierError> {
        if data.is_empty() {
            return Err(ClassifierError::EmptyDataset("evaluate"));
        }
        let probs = self.predict(&data.samples)?;
        Ok(Evaluation::score(&probs, &data.labels))
    }

    /// Serialize to an opaque artifact readable by the same backend's `load`.
    fn save(&self) -> Result<Vec<u8>, ClassifierError>;
}

/// Factory for one family of classifiers.
pub trait ClassifierBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// A fresh, untrained classifier.
    fn build(
        &self,
        algorithm: Algorithm,
        shape: InputShape,
        rng: &mut StdRng,
    ) -> Result<Box<dyn Classifier>, ClassifierError>;

    fn load(&self, artifact: &[u8]) -> Result<Box<dyn Classifier>, ClassifierError>;
}

/// Row-major flattening of one sample.
pub(crate) fn flatten(sample: &Sample) -> Vec<f64> {
    sample.iter().flatten().copied().collect()
}

/// Numerically stable softmax.
pub(crate) fn softmax(logits: &[f64; NUM_CLASSES]) -> Probabilities {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut out = [0.0; NUM_CLASSES];
    let mut sum = 0.0;
    for (o, &l) in out.iter_mut().zip(logits) {
        *o = (l - max).exp();
        sum += *o;
    }
    for o in out.iter_mut() {
        *o /= sum;
    }
    out
}

/// Index of the largest probability; the lowest index wins ties.
pub fn argmax(p: &Probabilities) -> usize {
    let mut best = 0;
    for (i, &v) in p.iter().enumerate().skip(1) {
        if v > p[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn softmax_sums_to_one() {
        let p = softmax(&[1.0, 2.0, 3.0, 1000.0, -5.0]);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert_eq!(argmax(&p), 3);
    }

    #[test]
    fn argmax_ties_go_low() {
        assert_eq!(argmax(&[0.2, 0.4, 0.4, 0.0, 0.0]), 1);
        assert_eq!(argmax(&[0.2; NUM_CLASSES]), 0);
    }

    #[test]
    fn shape_check() {
        let shape = InputShape::new(2, 3);
        let good = vec![vec![vec![0.0; 3]; 2]];
        let bad = vec![vec![vec![0.0; 3]; 1]];
        assert!(shape.check(&good).is_ok());
        assert!(shape.check(&[]).is_ok());
        assert!(matches!(
            shape.check(&bad),
            Err(ClassifierError::ShapeMismatch { .. })
        ));
        assert_eq!(shape.to_string(), "2x3");
    }

    #[test]
    fn fit_options_defaults() {
        let opts = FitOptions::default();
        assert_eq!((opts.epochs, opts.batch_size, opts.patience), (125, 64, 60));
        assert!(FitOptions { epochs: 0, ..opts }.validate().is_err());
    }
}
