//! MACD: Moving Average Convergence/Divergence.
//!
//! - Macd line: EMA(close, fast) - EMA(close, slow)
//! - Signal: EMA(macd, signal)
//! - Histogram: macd - signal
//!
//! All three lines share the signal line's warm-up (slow - 1 + signal - 1),
//! so the feature row for a bar either has the full triple or none of it.

use crate::domain::Bar;
use crate::indicators::ema::ema_of_series;
use crate::indicators::{closes, Indicator};

/// Which MACD output line to expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacdLine {
    Macd,
    Signal,
    Histogram,
}

#[derive(Debug, Clone)]
pub struct Macd {
    fast: usize,
    slow: usize,
    signal: usize,
    line: MacdLine,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize, line: MacdLine) -> Self {
        assert!(fast >= 1 && signal >= 1, "MACD periods must be >= 1");
        assert!(fast < slow, "MACD fast period must be shorter than slow");
        Self {
            fast,
            slow,
            signal,
            line,
        }
    }

    /// The three lines computed in one pass, each already masked to the
    /// common warm-up.
    pub fn lines(&self, bars: &[Bar]) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let close = closes(bars);
        let fast = ema_of_series(&close, self.fast);
        let slow = ema_of_series(&close, self.slow);

        let mut macd: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
        let signal = ema_of_series(&macd, self.signal);
        let hist: Vec<f64> = macd.iter().zip(&signal).map(|(m, s)| m - s).collect();

        for (m, s) in macd.iter_mut().zip(&signal) {
            if s.is_nan() {
                *m = f64::NAN;
            }
        }

        (macd, signal, hist)
    }
}

impl Indicator for Macd {
    fn name(&self) -> &str {
        match self.line {
            MacdLine::Macd => "macd",
            MacdLine::Signal => "macd_signal",
            MacdLine::Histogram => "macd_hist",
        }
    }

    fn lookback(&self) -> usize {
        self.slow - 1 + self.signal - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let (macd, signal, hist) = self.lines(bars);
        match self.line {
            MacdLine::Macd => macd,
            MacdLine::Signal => signal,
            MacdLine::Histogram => hist,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn macd_constant_price_is_zero() {
        let bars = make_bars(&[50.0; 20]);
        let macd = Macd::new(3, 5, 2, MacdLine::Macd);
        let out = macd.compute(&bars);
        assert_eq!(macd.lookback(), 5);
        assert!(out[4].is_nan());
        assert_approx(out[5], 0.0, DEFAULT_EPSILON);
        assert_approx(out[19], 0.0, DEFAULT_EPSILON);
    }

    #[test]
    fn histogram_is_macd_minus_signal() {
        let closes: Vec<f64> = (0..50).map(|i| 100.0 + (i as f64 * 0.4).sin() * 5.0).collect();
        let bars = make_bars(&closes);
        let (macd, signal, hist) = Macd::new(3, 6, 3, MacdLine::Histogram).lines(&bars);
        for i in 0..bars.len() {
            if hist[i].is_nan() {
                assert!(macd[i].is_nan() && signal[i].is_nan());
            } else {
                assert_approx(hist[i], macd[i] - signal[i], DEFAULT_EPSILON);
            }
        }
    }

    #[test]
    fn uptrend_macd_positive() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let out = Macd::new(12, 26, 9, MacdLine::Macd).compute(&make_bars(&closes));
        assert!(out[59] > 0.0);
    }

    #[test]
    fn names() {
        assert_eq!(Macd::new(12, 26, 9, MacdLine::Signal).name(), "macd_signal");
        assert_eq!(Macd::new(12, 26, 9, MacdLine::Histogram).lookback(), 33);
    }
}
