//! Min-max scaling into `[0, 1]`.
//!
//! 2-D tables get one fit per column over the whole table. Windows get an
//! independent fit per window, per column, using only that window's
//! timesteps. A constant column maps to 0.

use rayon::prelude::*;

use crate::dataset::Sample;

/// Observed range of one column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnRange {
    pub min: f64,
    pub max: f64,
}

impl ColumnRange {
    pub fn scale(&self, v: f64) -> f64 {
        let span = self.max - self.min;
        if span == 0.0 {
            0.0
        } else {
            ((v - self.min) / span).clamp(0.0, 1.0)
        }
    }
}

/// Per-column ranges of a row-major table. Empty for an empty table.
pub fn fit_columns(rows: &[Vec<f64>]) -> Vec<ColumnRange> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };
    let mut ranges: Vec<ColumnRange> = first
        .iter()
        .map(|&v| ColumnRange { min: v, max: v })
        .collect();
    for row in &rows[1..] {
        for (range, &v) in ranges.iter_mut().zip(row) {
            range.min = range.min.min(v);
            range.max = range.max.max(v);
        }
    }
    ranges
}

/// Scale a 2-D table in place, one fit per column.
pub fn normalize_table(rows: &mut [Vec<f64>]) {
    let ranges = fit_columns(rows);
    for row in rows.iter_mut() {
        for (v, range) in row.iter_mut().zip(&ranges) {
            *v = range.scale(*v);
        }
    }
}

/// Scale every window independently.
pub fn normalize_windows(samples: &mut [Sample]) {
    samples
        .par_iter_mut()
        .for_each(|window| normalize_table(window));
}
