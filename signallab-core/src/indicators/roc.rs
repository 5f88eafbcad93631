//! Rate of change as a fraction.
//!
//! `Rocp` looks backward and is a feature:
//! rocp[t] = (close[t] - close[t-period]) / close[t-period]
//!
//! `forward_rocp` looks forward over the prediction horizon and is only ever
//! used to label rows, never as a model input:
//! rocn[t] = (close[t+h] - close[t]) / close[t]

use crate::domain::Bar;
use crate::indicators::Indicator;

#[derive(Debug, Clone)]
pub struct Rocp {
    period: usize,
}

impl Rocp {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ROCP period must be >= 1");
        Self { period }
    }
}

impl Indicator for Rocp {
    fn name(&self) -> &str {
        "rocp"
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];

        for i in self.period..n {
            result[i] = fraction_change(bars[i - self.period].close, bars[i].close);
        }

        result
    }
}

/// Forward rate of change over `horizon` bars.
///
/// `None` for the trailing `horizon` rows whose future is unknown.
pub fn forward_rocp(bars: &[Bar], horizon: usize) -> Vec<Option<f64>> {
    let n = bars.len();
    (0..n)
        .map(|i| {
            let j = i.checked_add(horizon).filter(|&j| j < n)?;
            Some(fraction_change(bars[i].close, bars[j].close))
        })
        .collect()
}

fn fraction_change(from: f64, to: f64) -> f64 {
    if from.is_nan() || to.is_nan() || from == 0.0 {
        f64::NAN
    } else {
        (to - from) / from
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn rocp_basic() {
        let bars = make_bars(&[100.0, 110.0, 121.0]);
        let out = Rocp::new(1).compute(&bars);
        assert!(out[0].is_nan());
        assert_approx(out[1], 0.10, DEFAULT_EPSILON);
        assert_approx(out[2], 0.10, DEFAULT_EPSILON);
    }

    #[test]
    fn rocp_zero_base_is_nan() {
        let bars = make_bars(&[0.0, 5.0]);
        assert!(Rocp::new(1).compute(&bars)[1].is_nan());
    }

    #[test]
    fn forward_rocp_looks_ahead() {
        let bars = make_bars(&[100.0, 102.0, 95.0, 110.0]);
        let out = forward_rocp(&bars, 2);
        assert_approx(out[0].unwrap(), -0.05, DEFAULT_EPSILON);
        assert_approx(out[1].unwrap(), 8.0 / 102.0, DEFAULT_EPSILON);
        assert_eq!(out[2], None);
        assert_eq!(out[3], None);
    }

    #[test]
    fn forward_rocp_horizon_beyond_series() {
        let bars = make_bars(&[1.0, 2.0]);
        assert!(forward_rocp(&bars, 5).iter().all(Option::is_none));
    }
}
