//! Technical indicators feeding the feature table.
//!
//! Every indicator takes the full bar series and returns a series of the same
//! length. Values before the indicator has enough history are `f64::NAN`; the
//! feature engine drops those rows.
//!
//! Multi-output indicators (Bollinger, MACD) are exposed as separate named
//! instances per line, keeping the single-series `Indicator` trait.

pub mod adx;
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod roc;
pub mod rsi;
pub mod wilder;
pub mod willr;

pub use adx::Adx;
pub use bollinger::{Bollinger, BollingerBand};
pub use macd::{Macd, MacdLine};
pub use roc::{forward_rocp, Rocp};
pub use rsi::Rsi;
pub use willr::WilliamsR;

use crate::domain::Bar;

/// Trait for indicators.
///
/// # Look-ahead contamination guard
/// No indicator value at bar t may depend on price data from bar t+1 or later.
/// The one forward-looking series, `rocn`, is deliberately not an `Indicator`
/// (see [`forward_rocp`]).
pub trait Indicator: Send + Sync {
    /// Column name in the feature table (e.g. "rsi", "bb_upper").
    fn name(&self) -> &str;

    /// Number of leading bars that are NaN in the output.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Closing prices as a plain series.
pub fn closes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

/// Create synthetic bars from close prices for testing.
///
/// open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar::new(
                base_date + chrono::Duration::days(i as i64),
                open,
                open.max(close) + 1.0,
                open.min(close) - 1.0,
                close,
                1000.0,
            )
        })
        .collect()
}

/// Bars from explicit (open, high, low, close) tuples.
#[cfg(test)]
pub fn make_ohlc_bars(data: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    data.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| {
            Bar::new(
                base_date + chrono::Duration::days(i as i64),
                open,
                high,
                low,
                close,
                1000.0,
            )
        })
        .collect()
}

#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;

#[cfg(test)]
mod tests {
    use super::*;

    /// Truncating the series must not change earlier values.
    #[test]
    fn no_lookahead_in_any_indicator() {
        let closes: Vec<f64> = (0..120)
            .map(|i| 100.0 + (i as f64 * 0.3).sin() * 8.0 + i as f64 * 0.1)
            .collect();
        let full = make_bars(&closes);
        let truncated = &full[..80];

        let indicators: Vec<Box<dyn Indicator>> = vec![
            Box::new(Bollinger::upper(5, 2.0)),
            Box::new(WilliamsR::new(14)),
            Box::new(Rsi::new(14)),
            Box::new(Adx::new(14)),
            Box::new(Macd::new(12, 26, 9, MacdLine::Histogram)),
            Box::new(Rocp::new(10)),
        ];

        for ind in &indicators {
            let a = ind.compute(&full);
            let b = ind.compute(truncated);
            for i in 0..truncated.len() {
                if a[i].is_nan() {
                    assert!(b[i].is_nan(), "{} differs at {i}", ind.name());
                } else {
                    assert_approx(a[i], b[i], 1e-9);
                }
            }
        }
    }

    /// The first non-NaN value sits exactly at `lookback()`.
    #[test]
    fn lookback_matches_first_valid_index() {
        let closes: Vec<f64> = (0..100).map(|i| 50.0 + (i as f64 * 0.7).cos() * 3.0).collect();
        let bars = make_bars(&closes);
        let indicators: Vec<Box<dyn Indicator>> = vec![
            Box::new(Bollinger::middle(5, 2.0)),
            Box::new(WilliamsR::new(14)),
            Box::new(Rsi::new(14)),
            Box::new(Adx::new(14)),
            Box::new(Macd::new(12, 26, 9, MacdLine::Signal)),
            Box::new(Rocp::new(10)),
        ];
        for ind in &indicators {
            let out = ind.compute(&bars);
            let first = out.iter().position(|v| !v.is_nan()).unwrap();
            assert_eq!(first, ind.lookback(), "{}", ind.name());
        }
    }
}
