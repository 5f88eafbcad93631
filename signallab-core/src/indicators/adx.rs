//! ADX: Average Directional Index (Wilder).
//!
//! 1. +DM / -DM from consecutive bars
//! 2. Wilder-smooth +DM, -DM and TR (alpha = 1/period)
//! 3. +DI = 100 * sm(+DM) / sm(TR), -DI likewise
//! 4. DX = 100 * |+DI - -DI| / (+DI + -DI)
//! 5. ADX = Wilder-smoothed DX
//!
//! Lookback: 2 * period - 1. The first bar has no directional movement, so
//! DI is first defined at `period` and ADX `period - 1` bars later.

use crate::domain::Bar;
use crate::indicators::wilder::{true_range, wilder_smooth};
use crate::indicators::Indicator;

#[derive(Debug, Clone)]
pub struct Adx {
    period: usize,
}

impl Adx {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ADX period must be >= 1");
        Self { period }
    }
}

impl Indicator for Adx {
    fn name(&self) -> &str {
        "adx"
    }

    fn lookback(&self) -> usize {
        2 * self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        if n < 2 {
            return vec![f64::NAN; n];
        }

        let mut plus_dm = vec![f64::NAN; n];
        let mut minus_dm = vec![f64::NAN; n];

        for i in 1..n {
            let (cur, prev) = (&bars[i], &bars[i - 1]);
            if cur.high.is_nan() || cur.low.is_nan() || prev.high.is_nan() || prev.low.is_nan() {
                continue;
            }
            let up = cur.high - prev.high;
            let down = prev.low - cur.low;

            plus_dm[i] = if up > down && up > 0.0 { up } else { 0.0 };
            minus_dm[i] = if down > up && down > 0.0 { down } else { 0.0 };
        }

        let smooth_tr = wilder_smooth(&true_range(bars), self.period);
        let smooth_plus = wilder_smooth(&plus_dm, self.period);
        let smooth_minus = wilder_smooth(&minus_dm, self.period);

        let dx: Vec<f64> = (0..n)
            .map(|i| {
                let (tr, p, m) = (smooth_tr[i], smooth_plus[i], smooth_minus[i]);
                if tr.is_nan() || p.is_nan() || m.is_nan() {
                    return f64::NAN;
                }
                if tr == 0.0 {
                    return 0.0;
                }
                let plus_di = 100.0 * p / tr;
                let minus_di = 100.0 * m / tr;
                let sum = plus_di + minus_di;
                if sum == 0.0 {
                    0.0
                } else {
                    100.0 * (plus_di - minus_di).abs() / sum
                }
            })
            .collect();

        wilder_smooth(&dx, self.period)
    }
}
