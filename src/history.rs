//! History aggregation: summary stats, the 7-day activity series, and
//! the filter/pagination used by the history table.
//!
//! Everything here is a pure function over a record list; the weekly
//! series additionally takes today's date so results are deterministic
//! under test.

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::types::{HistoryRecord, SEVERITY_THRESHOLD};

/// Fixed page size for the history table.
pub const PAGE_SIZE: usize = 5;

/// Severity filter for the history table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeverityFilter {
    High,
    Low,
}

/// Summary counts derived from the full history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerivedStats {
    pub total: usize,
    pub high_severity: usize,
    pub low_severity: usize,
    pub high_pct: u32,
    pub low_pct: u32,
}

/// One day of the trailing-week activity series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayBucket {
    pub day_label: String,
    pub count: usize,
}

fn is_high(record: &HistoryRecord) -> bool {
    record.prediction > SEVERITY_THRESHOLD
}

/// Compute summary counts and percentages.
///
/// Percentages are whole numbers; the low percentage is defined as the
/// complement of the high one so the pair always sums to 100 when any
/// records exist. Both are 0 for an empty history.
pub fn derive_stats(records: &[HistoryRecord]) -> DerivedStats {
    let total = records.len();
    let high_severity = records.iter().filter(|r| is_high(r)).count();
    let low_severity = total - high_severity;

    let (high_pct, low_pct) = if total == 0 {
        (0, 0)
    } else {
        let high_pct = (high_severity as f64 / total as f64 * 100.0).round() as u32;
        (high_pct, 100 - high_pct)
    };

    DerivedStats {
        total,
        high_severity,
        low_severity,
        high_pct,
        low_pct,
    }
}

/// Parse a stored timestamp to a calendar date. Accepts RFC 3339 and
/// the bare ISO form without an offset.
fn parse_timestamp(raw: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|dt| dt.date())
}

/// Build the 7-bucket activity series for the trailing week ending
/// `today`, oldest day first, zero-filled.
///
/// Records are matched on their exact calendar date inside the window;
/// anything older than 7 days (or with an unparseable timestamp) is
/// ignored rather than folded onto the same weekday of an earlier
/// week.
pub fn weekly_series(records: &[HistoryRecord], today: NaiveDate) -> Vec<DayBucket> {
    let days: Vec<NaiveDate> = (0..7u64)
        .rev()
        .filter_map(|back| today.checked_sub_days(Days::new(back)))
        .collect();

    let mut counts = vec![0usize; days.len()];
    for record in records {
        if let Some(date) = parse_timestamp(&record.timestamp) {
            if let Some(idx) = days.iter().position(|d| *d == date) {
                counts[idx] += 1;
            }
        }
    }

    days.iter()
        .zip(counts)
        .map(|(date, count)| DayBucket {
            day_label: date.format("%a").to_string(),
            count,
        })
        .collect()
}

/// Apply an optional severity filter using the fixed threshold.
pub fn filter_by_severity(
    records: &[HistoryRecord],
    filter: Option<SeverityFilter>,
) -> Vec<HistoryRecord> {
    records
        .iter()
        .filter(|r| match filter {
            None => true,
            Some(SeverityFilter::High) => is_high(r),
            Some(SeverityFilter::Low) => !is_high(r),
        })
        .cloned()
        .collect()
}

/// Number of pages for a list of `len` items.
pub fn page_count(len: usize, page_size: usize) -> usize {
    len.div_ceil(page_size)
}

/// Slice out a 1-based page. Out-of-range pages are empty.
pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    if page == 0 {
        return &[];
    }
    let start = (page - 1) * page_size;
    if start >= items.len() {
        return &[];
    }
    let end = (start + page_size).min(items.len());
    &items[start..end]
}
