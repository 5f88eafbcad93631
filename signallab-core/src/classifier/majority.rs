//! Class-frequency baseline.
//!
//! Predicts the training label distribution for every input. Useful as a
//! floor to compare real backends against and as a cheap stand-in in tests.

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::classifier::{
    Classifier, ClassifierBackend, ClassifierError, EpochMetrics, Evaluation, FitOptions,
    InputShape, Probabilities, TrainingHistory,
};
use crate::dataset::{Dataset, Sample};
use crate::domain::{Algorithm, NUM_CLASSES};

const BACKEND: &str = "majority";

#[derive(Debug, Clone, Copy, Default)]
pub struct MajorityBackend;

impl ClassifierBackend for MajorityBackend {
    fn name(&self) -> &'static str {
        BACKEND
    }

    fn build(
        &self,
        algorithm: Algorithm,
        shape: InputShape,
        _rng: &mut StdRng,
    ) -> Result<Box<dyn Classifier>, ClassifierError> {
        Ok(Box::new(MajorityClassifier {
            backend: BACKEND.to_string(),
            algorithm,
            shape,
            priors: [1.0 / NUM_CLASSES as f64; NUM_CLASSES],
        }))
    }

    fn load(&self, artifact: &[u8]) -> Result<Box<dyn Classifier>, ClassifierError> {
        let model: MajorityClassifier = serde_json::from_slice(artifact)?;
        if model.backend != BACKEND {
            return Err(ClassifierError::WrongBackend { expected: BACKEND });
        }
        Ok(Box::new(model))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MajorityClassifier {
    backend: String,
    algorithm: Algorithm,
    shape: InputShape,
    priors: Probabilities,
}

impl Classifier for MajorityClassifier {
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
        _rng: &mut StdRng,
    ) -> Result<TrainingHistory, ClassifierError> {
        options.validate()?;
        if train.is_empty() {
            return Err(ClassifierError::EmptyDataset("fit"));
        }
        self.shape.check(&train.samples)?;

        let counts = train.counts();
        let total = counts.total() as f64;
        for (p, &n) in self.priors.iter_mut().zip(&counts.0) {
            *p = n as f64 / total;
        }

        let fit = Evaluation::score(&vec![self.priors; train.len()], &train.labels);
        let val = if validation.is_empty() {
            fit
        } else {
            Evaluation::score(&vec![self.priors; validation.len()], &validation.labels)
        };

        Ok(TrainingHistory {
            epochs: vec![EpochMetrics {
                epoch: 0,
                loss: fit.loss,
                accuracy: fit.accuracy,
                val_loss: val.loss,
                val_accuracy: val.accuracy,
            }],
            stopped_early: false,
            best_epoch: Some(0),
        })
    }

    fn predict(&self, samples: &[Sample]) -> Result<Vec<Probabilities>, ClassifierError> {
        self.shape.check(samples)?;
        Ok(vec![self.priors; samples.len()])
    }

    fn save(&self) -> Result<Vec<u8>, ClassifierError> {
        Ok(serde_json::to_vec(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SignalLabel;
    use rand::SeedableRng;

    #[test]
    fn predicts_training_frequencies() {
        let mut rng = StdRng::seed_from_u64(0);
        let labels = vec![
            SignalLabel::Buy,
            SignalLabel::Buy,
            SignalLabel::Buy,
            SignalLabel::Hold,
        ];
        let train = Dataset::new(vec![vec![vec![0.0]]; 4], labels).unwrap();
        let mut model = MajorityBackend
            .build(Algorithm::Jordan, InputShape::new(1, 1), &mut rng)
            .unwrap();
        let history = model
            .fit(&train, &Dataset::default(), &FitOptions::default(), &mut rng)
            .unwrap();

        assert_eq!(history.epochs_run(), 1);
        assert_eq!(history.epochs[0].accuracy, 0.75);
        let p = model.predict(&[vec![vec![1.0]]]).unwrap();
        assert_eq!(p[0], [0.0, 0.75, 0.25, 0.0, 0.0]);

        let loaded = MajorityBackend.load(&model.save().unwrap()).unwrap();
        assert_eq!(loaded.predict(&[vec![vec![1.0]]]).unwrap(), p);
    }
}
