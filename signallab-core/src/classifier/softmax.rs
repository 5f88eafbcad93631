//! Multinomial logistic regression over flattened samples.
//!
//! One dense layer from `timesteps * features` inputs to five logits, softmax
//! output, mini-batch gradient descent on cross-entropy. Weight initialization
//! and batch order draw from the caller's seeded RNG, so a fit is replayable.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::classifier::{
    flatten, softmax, Classifier, ClassifierBackend, ClassifierError, EarlyStopping,
    EpochMetrics, Evaluation, FitOptions, InputShape, Probabilities, TrainingHistory,
};
use crate::dataset::{Dataset, Sample};
use crate::domain::{Algorithm, NUM_CLASSES};

const BACKEND: &str = "softmax";

#[derive(Debug, Clone)]
pub struct SoftmaxBackend {
    pub learning_rate: f64,
}

impl Default for SoftmaxBackend {
    fn default() -> Self {
        Self { learning_rate: 0.1 }
    }
}

impl SoftmaxBackend {
    pub fn new(learning_rate: f64) -> Self {
        Self { learning_rate }
    }
}

impl ClassifierBackend for SoftmaxBackend {
    fn name(&self) -> &'static str {
        BACKEND
    }

    fn build(
        &self,
        algorithm: Algorithm,
        shape: InputShape,
        rng: &mut StdRng,
    ) -> Result<Box<dyn Classifier>, ClassifierError> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(ClassifierError::InvalidOptions(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        Ok(Box::new(SoftmaxClassifier::new(
            algorithm,
            shape,
            self.learning_rate,
            rng,
        )))
    }

    fn load(&self, artifact: &[u8]) -> Result<Box<dyn Classifier>, ClassifierError> {
        let model: SoftmaxClassifier = serde_json::from_slice(artifact)?;
        if model.backend != BACKEND {
            return Err(ClassifierError::WrongBackend { expected: BACKEND });
        }
        let expected_len = model.shape.flat_len();
        if model.weights.iter().any(|w| w.len() != expected_len) {
            return Err(ClassifierError::ShapeMismatch {
                expected: model.shape,
                actual: InputShape::new(1, model.weights.first().map_or(0, Vec::len)),
            });
        }
        Ok(Box::new(model))
    }
}

/// Trained weights. Serialized as-is into the artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoftmaxClassifier {
    backend: String,
    algorithm: Algorithm,
    shape: InputShape,
    learning_rate: f64,
    /// `NUM_CLASSES` rows of `shape.flat_len()` weights.
    weights: Vec<Vec<f64>>,
    bias: [f64; NUM_CLASSES],
}

impl SoftmaxClassifier {
    fn new(algorithm: Algorithm, shape: InputShape, learning_rate: f64, rng: &mut StdRng) -> Self {
        let d = shape.flat_len();
        let scale = if d == 0 { 0.0 } else { 1.0 / (d as f64).sqrt() };
        let weights = (0..NUM_CLASSES)
            .map(|_| (0..d).map(|_| rng.gen_range(-0.1..=0.1) * scale).collect())
            .collect();
        Self {
            backend: BACKEND.to_string(),
            algorithm,
            shape,
            learning_rate,
            weights,
            bias: [0.0; NUM_CLASSES],
        }
    }

    fn forward(&self, x: &[f64]) -> Probabilities {
        let mut logits = self.bias;
        for (logit, w) in logits.iter_mut().zip(&self.weights) {
            *logit += w.iter().zip(x).map(|(w, x)| w * x).sum::<f64>();
        }
        softmax(&logits)
    }

    fn step(&mut self, xs: &[Vec<f64>], batch: &[usize], ys: &[usize]) {
        let d = self.shape.flat_len();
        let mut grad_w = vec![vec![0.0; d]; NUM_CLASSES];
        let mut grad_b = [0.0; NUM_CLASSES];

        for &i in batch {
            let p = self.forward(&xs[i]);
            for c in 0..NUM_CLASSES {
                let err = p[c] - if ys[i] == c { 1.0 } else { 0.0 };
                grad_b[c] += err;
                for (g, &x) in grad_w[c].iter_mut().zip(&xs[i]) {
                    *g += err * x;
                }
            }
        }

        let lr = self.learning_rate / batch.len() as f64;
        for c in 0..NUM_CLASSES {
            self.bias[c] -= lr * grad_b[c];
            for (w, g) in self.weights[c].iter_mut().zip(&grad_w[c]) {
                *w -= lr * g;
            }
        }
    }

    fn score(&self, xs: &[Vec<f64>], data: &Dataset) -> Evaluation {
        let probs: Vec<Probabilities> = xs.iter().map(|x| self.forward(x)).collect();
        Evaluation::score(&probs, &data.labels)
    }

    fn is_finite(&self) -> bool {
        self.bias.iter().all(|b| b.is_finite())
            && self.weights.iter().flatten().all(|w| w.is_finite())
    }
}

impl Classifier for SoftmaxClassifier {
    fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    fn input_shape(&self) -> InputShape {
        self.shape
    }

    fn fit(
        &mut self,
        train: &Dataset,
        validation: &Dataset,
        options: &FitOptions,
        rng: &mut StdRng,
    ) -> Result<TrainingHistory, ClassifierError> {
        options.validate()?;
        if train.is_empty() {
            return Err(ClassifierError::EmptyDataset("fit"));
        }
        self.shape.check(&train.samples)?;
        self.shape.check(&validation.samples)?;

        let xs: Vec<Vec<f64>> = train.samples.iter().map(flatten).collect();
        let ys: Vec<usize> = train.labels.iter().map(|l| l.id()).collect();
        let val_xs: Vec<Vec<f64>> = validation.samples.iter().map(flatten).collect();

        let mut order: Vec<usize> = (0..xs.len()).collect();
        let mut stopper = EarlyStopping::new(options.patience);
        let mut history = TrainingHistory::default();

        for epoch in 0..options.epochs {
            order.shuffle(rng);
            for batch in order.chunks(options.batch_size) {
                self.step(&xs, batch, &ys);
            }
            if !self.is_finite() {
                return Err(ClassifierError::Diverged { epoch });
            }

            let fit = self.score(&xs, train);
            let val = if validation.is_empty() {
                fit
            } else {
                self.score(&val_xs, validation)
            };
            let metrics = EpochMetrics {
                epoch,
                loss: fit.loss,
                accuracy: fit.accuracy,
                val_loss: val.loss,
                val_accuracy: val.accuracy,
            };
            trace!(
                epoch,
                loss = metrics.loss,
                val_accuracy = metrics.val_accuracy,
                "epoch done"
            );
            history.epochs.push(metrics);

            if stopper.update(epoch, val.accuracy) {
                history.stopped_early = epoch + 1 < options.epochs;
                break;
            }
        }

        history.best_epoch = stopper.best_epoch();
        Ok(history)
    }

    fn predict(&self, samples: &[Sample]) -> Result<Vec<Probabilities>, ClassifierError> {
        self.shape.check(samples)?;
        Ok(samples.iter().map(|s| self.forward(&flatten(s))).collect())
    }

    fn save(&self) -> Result<Vec<u8>, ClassifierError> {
        Ok(serde_json::to_vec(self)?)
    }
}
