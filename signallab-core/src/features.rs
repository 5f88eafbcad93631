//! Indicator engine: bars in, feature table out.
//!
//! The table has one row per bar that has full indicator history. The leading
//! warm-up rows (33 with default settings, set by MACD) are dropped. The
//! forward rate of change `rocn` rides alongside the rows and is `None` for
//! the trailing rows whose horizon runs past the last bar; those rows are
//! still usable for inference.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::validate_bars;
use crate::domain::Bar;
use crate::error::PipelineError;
use crate::indicators::{
    closes, forward_rocp, Adx, Bollinger, Indicator, Macd, MacdLine, Rocp, Rsi, WilliamsR,
};

/// Indicator periods. Defaults match the classic TA-Lib defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorSettings {
    pub bb_period: usize,
    pub bb_deviation: f64,
    pub willr_period: usize,
    pub rsi_period: usize,
    pub adx_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub rocp_period: usize,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        Self {
            bb_period: 5,
            bb_deviation: 2.0,
            willr_period: 14,
            rsi_period: 14,
            adx_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            rocp_period: 10,
        }
    }
}

impl IndicatorSettings {
    pub fn validate(&self) -> Result<(), PipelineError> {
        let periods = [
            ("bb_period", self.bb_period),
            ("willr_period", self.willr_period),
            ("rsi_period", self.rsi_period),
            ("adx_period", self.adx_period),
            ("macd_fast", self.macd_fast),
            ("macd_slow", self.macd_slow),
            ("macd_signal", self.macd_signal),
            ("rocp_period", self.rocp_period),
        ];
        for (name, value) in periods {
            if value == 0 {
                return Err(PipelineError::InvalidParameter(format!("{name} must be >= 1")));
            }
        }
        if self.macd_fast >= self.macd_slow {
            return Err(PipelineError::InvalidParameter(format!(
                "macd_fast ({}) must be shorter than macd_slow ({})",
                self.macd_fast, self.macd_slow
            )));
        }
        if !self.bb_deviation.is_finite() || self.bb_deviation <= 0.0 {
            return Err(PipelineError::InvalidParameter(format!(
                "bb_deviation must be positive, got {}",
                self.bb_deviation
            )));
        }
        Ok(())
    }
}

/// Feature rows for one symbol, ascending by day.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    pub columns: Vec<String>,
    pub days: Vec<NaiveDate>,
    pub rows: Vec<Vec<f64>>,
    /// Forward rate of change over the prediction horizon.
    pub rocn: Vec<Option<f64>>,
}

impl FeatureTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.columns.len()
    }

    /// Number of leading rows whose forward horizon is known.
    pub fn labelled_len(&self) -> usize {
        self.rocn.iter().take_while(|r| r.is_some()).count()
    }
}

/// Computes the configured indicators over a bar series.
pub struct IndicatorEngine {
    indicators: Vec<Box<dyn Indicator>>,
}

impl IndicatorEngine {
    pub fn new(settings: &IndicatorSettings) -> Result<Self, PipelineError> {
        settings.validate()?;
        let s = settings;
        let indicators: Vec<Box<dyn Indicator>> = vec![
            Box::new(Bollinger::upper(s.bb_period, s.bb_deviation)),
            Box::new(Bollinger::middle(s.bb_period, s.bb_deviation)),
            Box::new(Bollinger::lower(s.bb_period, s.bb_deviation)),
            Box::new(WilliamsR::new(s.willr_period)),
            Box::new(Rsi::new(s.rsi_period)),
            Box::new(Adx::new(s.adx_period)),
            Box::new(Macd::new(s.macd_fast, s.macd_slow, s.macd_signal, MacdLine::Macd)),
            Box::new(Macd::new(s.macd_fast, s.macd_slow, s.macd_signal, MacdLine::Signal)),
            Box::new(Macd::new(s.macd_fast, s.macd_slow, s.macd_signal, MacdLine::Histogram)),
            Box::new(Rocp::new(s.rocp_period)),
        ];
        Ok(Self { indicators })
    }

    /// Column names in row order: `close` followed by every indicator.
    pub fn columns(&self) -> Vec<String> {
        std::iter::once("close".to_string())
            .chain(self.indicators.iter().map(|i| i.name().to_string()))
            .collect()
    }

    /// Leading bars consumed before every feature is defined.
    pub fn warmup(&self) -> usize {
        self.indicators.iter().map(|i| i.lookback()).max().unwrap_or(0)
    }

    /// Build the feature table. `horizon` is the prediction window in bars.
    pub fn compute(&self, bars: &[Bar], horizon: usize) -> Result<FeatureTable, PipelineError> {
        validate_bars(bars)?;
        if horizon == 0 {
            return Err(PipelineError::InvalidParameter(
                "prediction horizon must be >= 1".into(),
            ));
        }

        let mut series = vec![closes(bars)];
        series.extend(self.indicators.iter().map(|i| i.compute(bars)));
        let rocn = forward_rocp(bars, horizon);

        let mut table = FeatureTable {
            columns: self.columns(),
            days: Vec::new(),
            rows: Vec::new(),
            rocn: Vec::new(),
        };

        let mut dropped = 0usize;
        for (i, bar) in bars.iter().enumerate() {
            let row: Vec<f64> = series.iter().map(|s| s[i]).collect();
            if row.iter().any(|v| !v.is_finite()) {
                dropped += 1;
                continue;
            }
            table.days.push(bar.day);
            table.rows.push(row);
            table.rocn.push(rocn[i]);
        }

        debug!(
            bars = bars.len(),
            rows = table.len(),
            dropped,
            horizon,
            "computed feature table"
        );
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars};

    fn wave(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + (i as f64 * 0.2).sin() * 5.0 + i as f64 * 0.05)
            .collect()
    }

    #[test]
    fn default_columns_and_warmup() {
        let engine = IndicatorEngine::new(&IndicatorSettings::default()).unwrap();
        assert_eq!(
            engine.columns(),
            vec![
                "close",
                "bb_upper",
                "bb_middle",
                "bb_lower",
                "willr",
                "rsi",
                "adx",
                "macd",
                "macd_signal",
                "macd_hist",
                "rocp"
            ]
        );
        assert_eq!(engine.warmup(), 33);
    }

    #[test]
    fn warmup_rows_are_dropped() {
        let engine = IndicatorEngine::new(&IndicatorSettings::default()).unwrap();
        let bars = make_bars(&wave(100));
        let table = engine.compute(&bars, 1).unwrap();

        assert_eq!(table.len(), 100 - 33);
        assert_eq!(table.days[0], bars[33].day);
        assert_eq!(table.n_features(), 11);
        assert!(table.rows.iter().all(|r| r.len() == 11));
        assert_approx(table.rows[0][0], bars[33].close, 1e-12);
    }

    #[test]
    fn shorter_than_warmup_gives_empty_table() {
        let engine = IndicatorEngine::new(&IndicatorSettings::default()).unwrap();
        let table = engine.compute(&make_bars(&wave(33)), 1).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn trailing_rows_have_no_rocn() {
        let engine = IndicatorEngine::new(&IndicatorSettings::default()).unwrap();
        let table = engine.compute(&make_bars(&wave(80)), 7).unwrap();
        assert_eq!(table.labelled_len(), table.len() - 7);
        assert!(table.rocn[table.len() - 7..].iter().all(Option::is_none));
    }

    #[test]
    fn rocn_is_forward_change() {
        let engine = IndicatorEngine::new(&IndicatorSettings::default()).unwrap();
        let closes = wave(60);
        let table = engine.compute(&make_bars(&closes), 2).unwrap();
        let expected = (closes[35] - closes[33]) / closes[33];
        assert_approx(table.rocn[0].unwrap(), expected, 1e-12);
    }

    #[test]
    fn unsorted_bars_rejected() {
        let engine = IndicatorEngine::new(&IndicatorSettings::default()).unwrap();
        let mut bars = make_bars(&wave(40));
        bars.swap(3, 4);
        assert!(matches!(
            engine.compute(&bars, 1),
            Err(PipelineError::UnsortedBars { .. })
        ));
    }

    #[test]
    fn bad_settings_rejected() {
        let settings = IndicatorSettings {
            macd_fast: 30,
            ..IndicatorSettings::default()
        };
        assert!(IndicatorEngine::new(&settings).is_err());
        let settings = IndicatorSettings {
            rsi_period: 0,
            ..IndicatorSettings::default()
        };
        assert!(IndicatorEngine::new(&settings).is_err());
    }
}
