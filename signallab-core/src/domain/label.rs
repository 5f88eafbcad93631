//! The five trading signal classes.

use serde::{Deserialize, Serialize};

use super::codes::int_coded;

/// Number of label classes the classifier predicts.
pub const NUM_CLASSES: usize = 5;

/// Discrete trading signal. The class id doubles as the classifier's output index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalLabel {
    StrongBuy,
    Buy,
    Hold,
    Sell,
    StrongSell,
}

int_coded!(SignalLabel, "label", {
    StrongBuy = 0 => "STRONG_BUY",
    Buy = 1 => "BUY",
    Hold = 2 => "HOLD",
    Sell = 3 => "SELL",
    StrongSell = 4 => "STRONG_SELL",
});

impl SignalLabel {
    /// All labels in ascending class-id order.
    pub const ALL: [SignalLabel; NUM_CLASSES] = [
        SignalLabel::StrongBuy,
        SignalLabel::Buy,
        SignalLabel::Hold,
        SignalLabel::Sell,
        SignalLabel::StrongSell,
    ];

    /// Class id in `0..NUM_CLASSES`.
    pub fn id(self) -> usize {
        match self {
            SignalLabel::StrongBuy => 0,
            SignalLabel::Buy => 1,
            SignalLabel::Hold => 2,
            SignalLabel::Sell => 3,
            SignalLabel::StrongSell => 4,
        }
    }

    pub fn from_id(id: usize) -> Option<Self> {
        Self::ALL.get(id).copied()
    }

    pub fn is_bullish(self) -> bool {
        matches!(self, SignalLabel::StrongBuy | SignalLabel::Buy)
    }
}

/// Per-class counts of a labelled series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCounts(pub [usize; NUM_CLASSES]);

impl LabelCounts {
    pub fn from_labels<'a>(labels: impl IntoIterator<Item = &'a SignalLabel>) -> Self {
        let mut counts = [0usize; NUM_CLASSES];
        for label in labels {
            counts[label.id()] += 1;
        }
        Self(counts)
    }

    pub fn get(&self, label: SignalLabel) -> usize {
        self.0[label.id()]
    }

    pub fn total(&self) -> usize {
        self.0.iter().sum()
    }

    /// Labels with at least one occurrence, ascending by id.
    pub fn present(&self) -> Vec<SignalLabel> {
        SignalLabel::ALL
            .iter()
            .copied()
            .filter(|l| self.get(*l) > 0)
            .collect()
    }

    /// Fraction of the series labelled BUY or STRONG_BUY.
    pub fn bullish_share(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.get(SignalLabel::StrongBuy) + self.get(SignalLabel::Buy)) as f64 / total as f64
    }
}
