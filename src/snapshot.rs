//! # Snapshot Lookups
//! Shared "latest snapshot at or before a cutoff" accessors plus
//! inclusive calendar-date enumeration.
//!
//! Every point-in-time lookup in the engine (series forward-fill, delta
//! endpoints, category rollups) goes through these helpers so the
//! forward-fill and precedence rules cannot drift between call sites.

use chrono::{Days, NaiveDate};

use crate::model::DailySnapshot;

/// Latest snapshot dated at or before `cutoff`. Snapshots must be
/// ascending by date; the reverse scan stops at the first hit.
pub fn latest_at_or_before(snaps: &[DailySnapshot], cutoff: NaiveDate) -> Option<&DailySnapshot> {
    snaps.iter().rev().find(|s| s.date <= cutoff)
}

/// Latest snapshot dated strictly before `cutoff`. Used for the delta
/// baseline: a snapshot dated exactly on the period start is period
/// activity, not pre-period state.
pub fn latest_before(snaps: &[DailySnapshot], cutoff: NaiveDate) -> Option<&DailySnapshot> {
    snaps.iter().rev().find(|s| s.date < cutoff)
}

/// Latest value of one metric at or before `cutoff`, scanning past
/// snapshots that do not carry that metric. A different snapshot may
/// supply each metric; callers invoke this once per metric.
pub fn latest_value_at_or_before<F>(
    snaps: &[DailySnapshot],
    cutoff: NaiveDate,
    extract: F,
) -> Option<i64>
where
    F: Fn(&DailySnapshot) -> Option<i64>,
{
    snaps
        .iter()
        .rev()
        .filter(|s| s.date <= cutoff)
        .find_map(|s| extract(s))
}

/// The snapshots dated within `[start, end]` inclusive.
pub fn in_range<'a>(
    snaps: &'a [DailySnapshot],
    start: NaiveDate,
    end: NaiveDate,
) -> impl Iterator<Item = &'a DailySnapshot> {
    snaps.iter().filter(move |s| s.date >= start && s.date <= end)
}

/// Every calendar date in `[start, end]` inclusive, ascending.
/// An inverted range (`end < start`) yields nothing; callers get empty
/// outputs rather than an error.
pub fn dates_in_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut day = start;
    while day <= end {
        dates.push(day);
        match day.checked_add_days(Days::new(1)) {
            Some(next) => day = next,
            None => break,
        }
    }
    dates
}
