use chrono::{DateTime, Datelike, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use crate::services::commission::round2;

/// Month-over-month growth in percent. A previous value of zero counts as 100% growth
/// when anything happened this period, otherwise as no growth.
pub fn growth_percent(current: Decimal, previous: Decimal) -> Decimal {
    if previous.is_zero() {
        return if current > Decimal::ZERO { Decimal::ONE_HUNDRED } else { Decimal::ZERO };
    }
    round2((current - previous) / previous.abs() * Decimal::ONE_HUNDRED)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyBucket {
    pub month: u32,
    pub value: Decimal,
    pub count: i64,
}

/// Twelve buckets (January..December) for `year`; points outside the year are ignored.
pub fn monthly_buckets<I>(points: I, year: i32) -> Vec<MonthlyBucket>
where
    I: IntoIterator<Item = (DateTime<Utc>, Decimal)>,
{
    let mut buckets: Vec<MonthlyBucket> = (1..=12)
        .map(|month| MonthlyBucket { month, value: Decimal::ZERO, count: 0 })
        .collect();

    for (at, value) in points {
        if at.year() != year {
            continue;
        }
        if let Some(bucket) = buckets.get_mut(at.month0() as usize) {
            bucket.value += value;
            bucket.count += 1;
        }
    }

    for bucket in &mut buckets {
        bucket.value = round2(bucket.value);
    }
    buckets
}

/// Start of the previous month, this month and next month, in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthWindow {
    pub previous_start: DateTime<Utc>,
    pub current_start: DateTime<Utc>,
    pub next_start: DateTime<Utc>,
}

impl MonthWindow {
    pub fn around(now: DateTime<Utc>) -> Self {
        let (y, m) = (now.year(), now.month());
        let (py, pm) = if m == 1 { (y - 1, 12) } else { (y, m - 1) };
        let (ny, nm) = if m == 12 { (y + 1, 1) } else { (y, m + 1) };
        Self {
            previous_start: month_start(py, pm),
            current_start: month_start(y, m),
            next_start: month_start(ny, nm),
        }
    }

    pub fn is_current(&self, at: DateTime<Utc>) -> bool {
        at >= self.current_start && at < self.next_start
    }

    pub fn is_previous(&self, at: DateTime<Utc>) -> bool {
        at >= self.previous_start && at < self.current_start
    }

    /// Sums values falling in (current month, previous month).
    pub fn split<I>(&self, points: I) -> PeriodTotals
    where
        I: IntoIterator<Item = (DateTime<Utc>, Decimal)>,
    {
        let mut totals = PeriodTotals::default();
        for (at, value) in points {
            if self.is_current(at) {
                totals.current += value;
                totals.current_count += 1;
            } else if self.is_previous(at) {
                totals.previous += value;
                totals.previous_count += 1;
            }
        }
        totals
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PeriodTotals {
    pub current: Decimal,
    pub previous: Decimal,
    pub current_count: i64,
    pub previous_count: i64,
}

fn month_start(year: i32, month: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).single().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn growth_handles_zero_baseline() {
        assert_eq!(growth_percent(Decimal::ZERO, Decimal::ZERO), Decimal::ZERO);
        assert_eq!(growth_percent(d("50"), Decimal::ZERO), d("100"));
    }

    #[test]
    fn growth_is_relative_to_previous() {
        assert_eq!(growth_percent(d("150"), d("100")), d("50"));
        assert_eq!(growth_percent(d("50"), d("200")), d("-75"));
        assert_eq!(growth_percent(d("1"), d("3")), d("-66.67"));
        assert_eq!(growth_percent(d("2"), d("3")), d("-33.33"));
    }

    #[test]
    fn buckets_cover_the_whole_year() {
        let points = vec![
            (at(2025, 1, 3), d("10")),
            (at(2025, 1, 31), d("5.25")),
            (at(2025, 12, 1), d("99")),
            (at(2024, 12, 31), d("1000")),
        ];
        let buckets = monthly_buckets(points, 2025);
        assert_eq!(buckets.len(), 12);
        assert_eq!(buckets[0], MonthlyBucket { month: 1, value: d("15.25"), count: 2 });
        assert_eq!(buckets[11].value, d("99"));
        assert_eq!(buckets[5], MonthlyBucket { month: 6, value: Decimal::ZERO, count: 0 });
    }

    #[test]
    fn month_window_wraps_year_boundaries() {
        let w = MonthWindow::around(at(2025, 1, 15));
        assert_eq!(w.previous_start, Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(w.current_start, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(w.next_start, Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap());

        let w = MonthWindow::around(at(2025, 12, 2));
        assert_eq!(w.next_start, Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn split_separates_current_and_previous_month() {
        let w = MonthWindow::around(at(2025, 3, 10));
        let totals = w.split(vec![
            (at(2025, 3, 1), d("100")),
            (at(2025, 3, 31), d("50")),
            (at(2025, 2, 28), d("40")),
            (at(2025, 1, 20), d("999")),
            (at(2025, 4, 1), d("999")),
        ]);
        assert_eq!(totals.current, d("150"));
        assert_eq!(totals.current_count, 2);
        assert_eq!(totals.previous, d("40"));
        assert_eq!(totals.previous_count, 1);
    }
}
