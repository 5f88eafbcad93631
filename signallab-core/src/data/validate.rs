//! Bar series checks and date slicing.

use chrono::NaiveDate;

use crate::domain::Bar;
use crate::error::PipelineError;

/// Reject series that are not strictly ascending by day or carry non-finite values.
pub fn validate_bars(bars: &[Bar]) -> Result<(), PipelineError> {
    for (i, bar) in bars.iter().enumerate() {
        if bar.is_void() {
            return Err(PipelineError::VoidBar { day: bar.day });
        }
        if i > 0 {
            let prev = bars[i - 1].day;
            if bar.day == prev {
                return Err(PipelineError::DuplicateDay { index: i, day: bar.day });
            }
            if bar.day < prev {
                return Err(PipelineError::UnsortedBars {
                    index: i,
                    prev,
                    next: bar.day,
                });
            }
        }
    }
    Ok(())
}

/// Sub-slice of an ascending series restricted to `[start, end]` (both inclusive).
/// A missing bound leaves that side open.
pub fn slice_by_date(bars: &[Bar], start: Option<NaiveDate>, end: Option<NaiveDate>) -> &[Bar] {
    let lo = match start {
        Some(start) => bars.partition_point(|b| b.day < start),
        None => 0,
    };
    let hi = match end {
        Some(end) => bars.partition_point(|b| b.day <= end),
        None => bars.len(),
    };
    if lo >= hi {
        return &[];
    }
    &bars[lo..hi]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn accepts_ascending_series() {
        let bars = make_bars(&[1.0, 2.0, 3.0]);
        assert!(validate_bars(&bars).is_ok());
        assert!(validate_bars(&[]).is_ok());
    }

    #[test]
    fn rejects_unsorted() {
        let mut bars = make_bars(&[1.0, 2.0, 3.0]);
        bars.swap(1, 2);
        assert!(matches!(
            validate_bars(&bars),
            Err(PipelineError::UnsortedBars { index: 2, .. })
        ));
    }

    #[test]
    fn rejects_duplicate_day() {
        let mut bars = make_bars(&[1.0, 2.0]);
        bars[1].day = bars[0].day;
        assert!(matches!(
            validate_bars(&bars),
            Err(PipelineError::DuplicateDay { index: 1, .. })
        ));
    }

    #[test]
    fn rejects_non_finite() {
        let mut bars = make_bars(&[1.0, 2.0]);
        bars[1].close = f64::INFINITY;
        assert_eq!(
            validate_bars(&bars),
            Err(PipelineError::VoidBar { day: bars[1].day })
        );
    }

    #[test]
    fn slice_is_inclusive() {
        // make_bars starts on 2024-01-02
        let bars = make_bars(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let s = slice_by_date(&bars, Some(day(3)), Some(day(5)));
        assert_eq!(s.len(), 3);
        assert_eq!(s[0].day, day(3));
        assert_eq!(s[2].day, day(5));

        assert_eq!(slice_by_date(&bars, None, Some(day(3))).len(), 2);
        assert_eq!(slice_by_date(&bars, Some(day(5)), None).len(), 2);
        assert!(slice_by_date(&bars, Some(day(9)), Some(day(3))).is_empty());
    }
}
