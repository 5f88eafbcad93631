//! Williams %R.
//!
//! %R = -100 * (highest_high - close) / (highest_high - lowest_low)
//! over the last `period` bars. Range [-100, 0].
//! Flat window (highest_high == lowest_low) → 0.
//! Lookback: period - 1.

use crate::domain::Bar;
use crate::indicators::Indicator;

#[derive(Debug, Clone)]
pub struct WilliamsR {
    period: usize,
}

impl WilliamsR {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "Williams %R period must be >= 1");
        Self { period }
    }
}

impl Indicator for WilliamsR {
    fn name(&self) -> &str {
        "willr"
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];

        if n < self.period {
            return result;
        }

        for i in (self.period - 1)..n {
            let window = &bars[i + 1 - self.period..=i];
            let mut highest = f64::NEG_INFINITY;
            let mut lowest = f64::INFINITY;
            let mut has_nan = false;
            for bar in window {
                if bar.high.is_nan() || bar.low.is_nan() {
                    has_nan = true;
                    break;
                }
                highest = highest.max(bar.high);
                lowest = lowest.min(bar.low);
            }
            let close = bars[i].close;
            if has_nan || close.is_nan() {
                continue;
            }

            let range = highest - lowest;
            result[i] = if range == 0.0 {
                0.0
            } else {
                -100.0 * (highest - close) / range
            };
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_ohlc_bars, DEFAULT_EPSILON};

    #[test]
    fn willr_close_at_high_is_zero() {
        let bars = make_ohlc_bars(&[
            (10.0, 12.0, 9.0, 11.0),
            (11.0, 13.0, 10.0, 12.0),
            (12.0, 15.0, 11.0, 15.0),
        ]);
        let out = WilliamsR::new(3).compute(&bars);
        assert_approx(out[2], 0.0, DEFAULT_EPSILON);
    }

    #[test]
    fn willr_close_at_low_is_minus_100() {
        let bars = make_ohlc_bars(&[
            (10.0, 12.0, 9.0, 11.0),
            (11.0, 13.0, 10.0, 10.0),
            (10.0, 11.0, 8.0, 8.0),
        ]);
        let out = WilliamsR::new(3).compute(&bars);
        assert_approx(out[2], -100.0, DEFAULT_EPSILON);
    }

    #[test]
    fn willr_midpoint() {
        // HH = 14, LL = 10, close = 12 → -50
        let bars = make_ohlc_bars(&[(11.0, 14.0, 10.0, 12.0), (12.0, 13.0, 11.0, 12.0)]);
        let out = WilliamsR::new(2).compute(&bars);
        assert!(out[0].is_nan());
        assert_approx(out[1], -50.0, DEFAULT_EPSILON);
    }

    #[test]
    fn willr_flat_window() {
        let bars = make_ohlc_bars(&[(5.0, 5.0, 5.0, 5.0), (5.0, 5.0, 5.0, 5.0)]);
        let out = WilliamsR::new(2).compute(&bars);
        assert_approx(out[1], 0.0, DEFAULT_EPSILON);
    }
}
