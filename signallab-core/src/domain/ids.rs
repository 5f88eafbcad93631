use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use super::model::{Algorithm, DataSource};

/// Model record id, assigned by the model store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModelId(pub u64);

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Prediction record id, assigned by the prediction log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PredictionId(pub u64);

impl fmt::Display for PredictionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Address of a trained classifier artifact.
///
/// The same 4-tuple is used to save, load and delete the artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactKey {
    pub data_source: DataSource,
    pub algorithm: Algorithm,
    pub symbol: String,
    pub model_id: ModelId,
}

impl ArtifactKey {
    pub fn new(
        data_source: DataSource,
        algorithm: Algorithm,
        symbol: impl Into<String>,
        model_id: ModelId,
    ) -> Self {
        Self {
            data_source,
            algorithm,
            symbol: symbol.into(),
            model_id,
        }
    }

    /// Relative path: `{data_source}/{ALGORITHM}/{SYMBOL}/{model_id}`.
    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(self.data_source.as_str())
            .join(self.algorithm.name())
            .join(&self.symbol)
            .join(self.model_id.to_string())
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.data_source, self.algorithm, self.symbol, self.model_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_key_path_layout() {
        let key = ArtifactKey::new(DataSource::Binance, Algorithm::LstmSeq, "BTCUSDT", ModelId(7));
        assert_eq!(
            key.relative_path(),
            PathBuf::from("binance").join("LSTM_SEQ").join("BTCUSDT").join("7")
        );
        assert_eq!(key.to_string(), "binance/LSTM_SEQ/BTCUSDT/7");
    }
}
