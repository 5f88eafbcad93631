//! Forward rate of change → 5-class trading label.
//!
//! | rocn                 | label       |
//! |----------------------|-------------|
//! | `< -0.05`            | STRONG_SELL |
//! | `[-0.05, -0.01)`     | SELL        |
//! | `[-0.01, 0.01)`      | HOLD        |
//! | `[0.01, 0.05)`       | BUY         |
//! | `>= 0.05`            | STRONG_BUY  |

use crate::domain::{LabelCounts, SignalLabel};
use crate::error::PipelineError;
use crate::features::FeatureTable;

pub const WEAK_MOVE: f64 = 0.01;
pub const STRONG_MOVE: f64 = 0.05;

/// Label one forward rate of change. `None` for NaN or infinite input.
pub fn classify(rocn: f64) -> Option<SignalLabel> {
    if !rocn.is_finite() {
        return None;
    }
    let label = if rocn < -STRONG_MOVE {
        SignalLabel::StrongSell
    } else if rocn < -WEAK_MOVE {
        SignalLabel::Sell
    } else if rocn < WEAK_MOVE {
        SignalLabel::Hold
    } else if rocn < STRONG_MOVE {
        SignalLabel::Buy
    } else {
        SignalLabel::StrongBuy
    };
    Some(label)
}

/// Label a full series, failing on the first non-finite value.
pub fn label_series(rocn: &[f64]) -> Result<Vec<SignalLabel>, PipelineError> {
    rocn.iter()
        .enumerate()
        .map(|(row, &value)| classify(value).ok_or(PipelineError::NonFiniteRocn { row, value }))
        .collect()
}

/// Feature rows paired with their labels.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelledRows {
    pub rows: Vec<Vec<f64>>,
    pub labels: Vec<SignalLabel>,
}

impl LabelledRows {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn counts(&self) -> LabelCounts {
        LabelCounts::from_labels(&self.labels)
    }
}

/// Label every row of the table whose forward horizon is known.
///
/// Trailing rows without `rocn` are left out.
pub fn label_table(table: &FeatureTable) -> Result<LabelledRows, PipelineError> {
    let n = table.labelled_len();
    let rocn: Vec<f64> = table.rocn[..n].iter().flatten().copied().collect();
    let labels = label_series(&rocn)?;
    Ok(LabelledRows {
        rows: table.rows[..n].to_vec(),
        labels,
    })
}
