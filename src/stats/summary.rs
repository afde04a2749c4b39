//! Activity summaries over local calendar days.
//!
//! Backs the "this week" dashboard line and the day-bounded history view.

use std::collections::BTreeSet;

use chrono::{DateTime, Days, Local, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::core::time::{local_date, start_of_day};
use crate::core::Activity;

/// Calendar days before today covered by the weekly summary.
pub const WEEK_SUMMARY_DAYS: u64 = 7;

/// Totals over a set of activities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub practice_count: usize,
    pub performance_count: usize,
    /// Distinct local calendar days with at least one activity.
    pub active_days: usize,
    /// Sum of recorded durations. Unrecorded and zero durations add nothing.
    pub total_minutes: u64,
}

/// Summarize `activities`, counting active days in `tz`.
pub fn summarize_in<Tz: TimeZone>(activities: &[Activity], tz: &Tz) -> ActivitySummary {
    let days: BTreeSet<NaiveDate> = activities
        .iter()
        .map(|a| local_date(a.timestamp, tz))
        .collect();

    ActivitySummary {
        practice_count: activities.iter().filter(|a| a.is_practice()).count(),
        performance_count: activities.iter().filter(|a| a.is_performance()).count(),
        active_days: days.len(),
        total_minutes: activities
            .iter()
            .filter_map(|a| a.minutes)
            .filter(|&m| m > 0)
            .map(u64::from)
            .sum(),
    }
}

/// Half-open `[start, end)` instants covering local days `first..=last`.
pub fn day_range<Tz: TimeZone>(
    first: NaiveDate,
    last: NaiveDate,
    tz: &Tz,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let end = match last.succ_opt() {
        Some(next) => start_of_day(next, tz),
        None => DateTime::<Utc>::MAX_UTC,
    };
    (start_of_day(first, tz), end)
}

/// The `days` local days ending today: `(first, today)`.
///
/// `days` below one is treated as one.
pub fn trailing_days<Tz: TimeZone>(now: DateTime<Utc>, days: u64, tz: &Tz) -> (NaiveDate, NaiveDate) {
    let today = local_date(now, tz);
    let first = today
        .checked_sub_days(Days::new(days.saturating_sub(1)))
        .unwrap_or(NaiveDate::MIN);
    (first, today)
}

/// Activities on local days `first..=last`, oldest first.
pub fn activities_on_days_in<Tz: TimeZone>(
    activities: &[Activity],
    first: NaiveDate,
    last: NaiveDate,
    tz: &Tz,
) -> Vec<Activity> {
    let mut result: Vec<Activity> = activities
        .iter()
        .filter(|a| (first..=last).contains(&local_date(a.timestamp, tz)))
        .cloned()
        .collect();
    result.sort_by_key(|a| (a.timestamp, a.id));
    result
}

/// Summary of the trailing week in the local time zone.
pub fn week_summary(activities: &[Activity], now: DateTime<Utc>) -> ActivitySummary {
    week_summary_in(activities, now, &Local)
}

/// Summary from local midnight [`WEEK_SUMMARY_DAYS`] days before today
/// through the end of today.
pub fn week_summary_in<Tz: TimeZone>(
    activities: &[Activity],
    now: DateTime<Utc>,
    tz: &Tz,
) -> ActivitySummary {
    let (first, today) = trailing_days(now, WEEK_SUMMARY_DAYS + 1, tz);
    let window = activities_on_days_in(activities, first, today, tz);

    tracing::debug!(%first, %today, activities = window.len(), "summarizing week");
    summarize_in(&window, tz)
}
