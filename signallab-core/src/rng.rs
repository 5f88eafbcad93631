//! Deterministic RNG hierarchy.
//!
//! A master seed generates deterministic sub-seeds for each
//! `(data_source, symbol, model_id, stage)` tuple. Sub-seeds are derived via
//! BLAKE3 hashing, so retraining a model replays the same shuffles and the same
//! weight initialization no matter what else the process has done.

use crate::domain::{DataSource, ModelId};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// A consumer of randomness inside the training pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Per-bucket and global shuffles in the balancer.
    Balance,
    /// Classifier weight initialization and mini-batch order.
    Fit,
}

impl Stage {
    fn tag(self) -> &'static [u8] {
        match self {
            Stage::Balance => b"balance",
            Stage::Fit => b"fit",
        }
    }
}

/// Deterministic RNG hierarchy.
///
/// Derivation is hash-based, not order-dependent: the same master seed produces
/// identical sub-seeds regardless of which models were trained first.
#[derive(Debug, Clone)]
pub struct RngHierarchy {
    master_seed: u64,
}

impl RngHierarchy {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Derive a deterministic sub-seed for one model and pipeline stage.
    pub fn sub_seed(
        &self,
        data_source: DataSource,
        symbol: &str,
        model_id: ModelId,
        stage: Stage,
    ) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(data_source.as_str().as_bytes());
        hasher.update(&[0]);
        hasher.update(symbol.as_bytes());
        hasher.update(&[0]);
        hasher.update(&model_id.0.to_le_bytes());
        hasher.update(stage.tag());
        let hash = hasher.finalize();
        let mut head = [0u8; 8];
        head.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(head)
    }

    /// Create a seeded StdRng from a sub-seed.
    pub fn rng_for(
        &self,
        data_source: DataSource,
        symbol: &str,
        model_id: ModelId,
        stage: Stage,
    ) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(data_source, symbol, model_id, stage))
    }
}
