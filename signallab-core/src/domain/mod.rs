//! Domain types for SignalLab

pub mod bar;
pub mod codes;
pub mod ids;
pub mod label;
pub mod model;

pub use bar::Bar;
pub use codes::{CodeError, IntCode};
pub use ids::{ArtifactKey, ModelId, PredictionId};
pub use label::{LabelCounts, SignalLabel, NUM_CLASSES};
pub use model::{Algorithm, DataSource, ModelStatus, PredictionWindow};
