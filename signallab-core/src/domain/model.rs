//! Model configuration enums: algorithm, prediction window, lifecycle status, data source.

use serde::{Deserialize, Serialize};

use super::codes::{int_coded, CodeError};

/// Classifier algorithm requested for a model.
///
/// The `*_SEQ` variants are sequence-aware: their inputs are sliding windows of
/// feature rows and their training data is balanced. The plain variants see one
/// feature row per sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Algorithm {
    Lstm,
    Jordan,
    LstmSeq,
    JordanSeq,
}

int_coded!(Algorithm, "algorithm", {
    Lstm = 0 => "LSTM",
    Jordan = 1 => "JORDAN",
    LstmSeq = 2 => "LSTM_SEQ",
    JordanSeq = 3 => "JORDAN_SEQ",
});

impl Algorithm {
    pub const ALL: [Algorithm; 4] = [
        Algorithm::Lstm,
        Algorithm::Jordan,
        Algorithm::LstmSeq,
        Algorithm::JordanSeq,
    ];

    pub fn is_sequential(self) -> bool {
        matches!(self, Algorithm::LstmSeq | Algorithm::JordanSeq)
    }
}

/// Forward horizon over which labels are measured and predictions aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PredictionWindow {
    Tiny,
    Small,
    Medium,
}

int_coded!(PredictionWindow, "prediction window", {
    Tiny = 0 => "TINY",
    Small = 1 => "SMALL",
    Medium = 2 => "MEDIUM",
});

impl PredictionWindow {
    /// Horizon in trading days.
    pub fn days(self) -> usize {
        match self {
            PredictionWindow::Tiny => 1,
            PredictionWindow::Small => 7,
            PredictionWindow::Medium => 15,
        }
    }
}

impl Default for PredictionWindow {
    fn default() -> Self {
        PredictionWindow::Tiny
    }
}

/// Lifecycle of a model record.
///
/// ```text
/// CREATED ──▶ IN_TRAINING ──▶ TRAINED
///                  │   ▲          │
///                  ▼   └──────────┘ (retrain)
///               ERRORED ──▶ IN_TRAINING
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModelStatus {
    Created,
    InTraining,
    Trained,
    Errored,
}

int_coded!(ModelStatus, "model status", {
    Created = 0 => "CREATED",
    InTraining = 1 => "IN_TRAINING",
    Trained = 2 => "TRAINED",
    Errored = 3 => "ERRORED",
});

impl ModelStatus {
    /// Whether moving from `self` to `next` is a legal lifecycle step.
    pub fn can_transition_to(self, next: ModelStatus) -> bool {
        use ModelStatus::*;
        matches!(
            (self, next),
            (Created, InTraining)
                | (Trained, InTraining)
                | (Errored, InTraining)
                | (InTraining, Trained)
                | (InTraining, Errored)
        )
    }
}

/// Market-data provider a symbol's bars (and therefore its models) belong to.
///
/// Stored by name rather than integer code: it is part of the artifact path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Binance,
    YFinance,
}

impl DataSource {
    pub fn as_str(self) -> &'static str {
        match self {
            DataSource::Binance => "binance",
            DataSource::YFinance => "yfinance",
        }
    }
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for DataSource {
    type Err = CodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "binance" => Ok(DataSource::Binance),
            "yfinance" => Ok(DataSource::YFinance),
            _ => Err(CodeError::UnknownName {
                kind: "data source",
                name: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::codes::IntCode;

    #[test]
    fn algorithm_codes_roundtrip() {
        for algo in Algorithm::ALL {
            assert_eq!(Algorithm::decode(algo.encode()).unwrap(), algo);
        }
        assert_eq!(
            Algorithm::decode(9),
            Err(CodeError::UnknownCode {
                kind: "algorithm",
                code: 9
            })
        );
    }

    #[test]
    fn sequential_algorithms() {
        assert!(!Algorithm::Lstm.is_sequential());
        assert!(!Algorithm::Jordan.is_sequential());
        assert!(Algorithm::LstmSeq.is_sequential());
        assert!(Algorithm::JordanSeq.is_sequential());
    }

    #[test]
    fn window_days() {
        assert_eq!(PredictionWindow::Tiny.days(), 1);
        assert_eq!(PredictionWindow::Small.days(), 7);
        assert_eq!(PredictionWindow::Medium.days(), 15);
        assert_eq!(PredictionWindow::decode(2).unwrap(), PredictionWindow::Medium);
    }

    #[test]
    fn status_transitions() {
        use ModelStatus::*;
        assert!(Created.can_transition_to(InTraining));
        assert!(InTraining.can_transition_to(Trained));
        assert!(InTraining.can_transition_to(Errored));
        assert!(Trained.can_transition_to(InTraining));
        assert!(!InTraining.can_transition_to(InTraining));
        assert!(!Created.can_transition_to(Trained));
    }

    #[test]
    fn data_source_parse() {
        assert_eq!("Binance".parse::<DataSource>().unwrap(), DataSource::Binance);
        assert_eq!("yfinance".parse::<DataSource>().unwrap(), DataSource::YFinance);
        assert!("kraken".parse::<DataSource>().is_err());
    }

    #[test]
    fn algorithm_name_parse() {
        assert_eq!("lstm_seq".parse::<Algorithm>().unwrap(), Algorithm::LstmSeq);
        assert_eq!(Algorithm::JordanSeq.to_string(), "JORDAN_SEQ");
    }
}
