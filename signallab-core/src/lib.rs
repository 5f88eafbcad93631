//! SignalLab Core: the signal generation pipeline.
//!
//! This crate contains everything between raw daily bars and a trading signal:
//! - Domain types (bars, labels, model enums with integer codes, ids)
//! - Technical indicators and the feature table
//! - The 5-class labeler
//! - Sliding windows and class balancing
//! - Min-max normalization
//! - The trainable classifier capability and its reference backends
//! - Prediction aggregation into one label and a confidence
//! - Bar sources (CSV, synthetic) and the seeded RNG hierarchy

pub mod aggregate;
pub mod classifier;
pub mod data;
pub mod dataset;
pub mod domain;
pub mod error;
pub mod features;
pub mod indicators;
pub mod labeler;
pub mod normalize;
pub mod pipeline;
pub mod rng;
pub mod sequence;

pub use error::PipelineError;
