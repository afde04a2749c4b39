//! Practice streak calculation.
//!
//! A streak counts consecutive calendar days (local midnight boundaries)
//! with at least one activity of any type for any piece. The current streak
//! only looks at the tail of history; milestone dates scan the whole log and
//! are used to back-date streak achievements.

use std::collections::BTreeSet;

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::core::time::{local_date, start_of_day};
use crate::core::Activity;

/// A maximal run of consecutive active days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakPeriod {
    /// Number of days in the run.
    pub length: u32,
    /// Local midnight of the final day of the run.
    pub last_day: DateTime<Utc>,
}

/// Current streak length in the process's local time zone.
pub fn current_streak(activities: &[Activity], now: DateTime<Utc>) -> u32 {
    current_streak_in(activities, now, &Local)
}

/// Current streak length with day boundaries in `tz`.
///
/// The walk starts today when there is activity today, otherwise yesterday,
/// so an unfinished day never breaks the streak.
pub fn current_streak_in<Tz: TimeZone>(
    activities: &[Activity],
    now: DateTime<Utc>,
    tz: &Tz,
) -> u32 {
    let days = active_days(activities, tz);
    if days.is_empty() {
        return 0;
    }

    let today = local_date(now, tz);
    let mut day = if days.contains(&today) {
        Some(today)
    } else {
        today.pred_opt()
    };

    let mut streak = 0;
    while let Some(current) = day {
        if !days.contains(&current) {
            break;
        }
        streak += 1;
        day = current.pred_opt();
    }

    tracing::debug!(streak, "computed current streak");
    streak
}

/// Date on which history first reached `milestone` consecutive days, in the
/// local time zone.
pub fn find_streak_milestone_date(
    activities: &[Activity],
    milestone: i64,
) -> Option<DateTime<Utc>> {
    find_streak_milestone_date_in(activities, milestone, &Local)
}

/// Date on which history first reached `milestone` consecutive days.
///
/// Returns local midnight of that day, or `None` when no run is long enough
/// or `milestone` is not positive.
pub fn find_streak_milestone_date_in<Tz: TimeZone>(
    activities: &[Activity],
    milestone: i64,
    tz: &Tz,
) -> Option<DateTime<Utc>> {
    if milestone <= 0 {
        return None;
    }
    let milestone = usize::try_from(milestone).ok()?;

    let days: Vec<NaiveDate> = active_days(activities, tz).into_iter().collect();
    runs(&days)
        .into_iter()
        .find(|&(_, len)| len >= milestone)
        .map(|(start, _)| start_of_day(days[start + milestone - 1], tz))
}

/// Every run longer than one day, oldest first, in the local time zone.
pub fn streak_periods(activities: &[Activity]) -> Vec<StreakPeriod> {
    streak_periods_in(activities, &Local)
}

/// Every run longer than one day, oldest first.
pub fn streak_periods_in<Tz: TimeZone>(activities: &[Activity], tz: &Tz) -> Vec<StreakPeriod> {
    let days: Vec<NaiveDate> = active_days(activities, tz).into_iter().collect();
    runs(&days)
        .into_iter()
        .filter(|&(_, len)| len > 1)
        .map(|(start, len)| StreakPeriod {
            length: len as u32,
            last_day: start_of_day(days[start + len - 1], tz),
        })
        .collect()
}

/// Longest run of consecutive active days, in the local time zone.
pub fn longest_streak(activities: &[Activity]) -> u32 {
    longest_streak_in(activities, &Local)
}

/// Longest run of consecutive active days.
pub fn longest_streak_in<Tz: TimeZone>(activities: &[Activity], tz: &Tz) -> u32 {
    let days: Vec<NaiveDate> = active_days(activities, tz).into_iter().collect();
    runs(&days)
        .into_iter()
        .map(|(_, len)| len as u32)
        .max()
        .unwrap_or(0)
}

fn active_days<Tz: TimeZone>(activities: &[Activity], tz: &Tz) -> BTreeSet<NaiveDate> {
    activities
        .iter()
        .map(|a| local_date(a.timestamp, tz))
        .collect()
}

/// Split sorted distinct days into `(start_index, length)` runs of
/// calendar-consecutive days.
fn runs(days: &[NaiveDate]) -> Vec<(usize, usize)> {
    let mut result = Vec::new();
    let mut start = 0;

    for i in 1..=days.len() {
        let continues = i < days.len() && days[i - 1].succ_opt() == Some(days[i]);
        if !continues {
            if i > start {
                result.push((start, i - start));
            }
            start = i;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset};
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 18, 0, 0).unwrap()
    }

    fn on_day(offset: i64) -> Activity {
        Activity::practice(1, 3, now() + Duration::days(offset))
    }

    fn midnight(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_log_has_no_streak() {
        assert_eq!(current_streak_in(&[], now(), &Utc), 0);
    }

    #[test]
    fn test_gap_yesterday_resets_to_one() {
        let activities = vec![on_day(-2), on_day(0)];
        assert_eq!(current_streak_in(&activities, now(), &Utc), 1);
    }

    #[test]
    fn test_five_consecutive_days() {
        let activities: Vec<Activity> = (-4..=0).map(on_day).collect();
        assert_eq!(current_streak_in(&activities, now(), &Utc), 5);
    }

    #[test]
    fn test_streak_kept_until_today_elapses() {
        // Nothing yet today: yesterday's run still counts
        let activities = vec![on_day(-3), on_day(-2), on_day(-1)];
        assert_eq!(current_streak_in(&activities, now(), &Utc), 3);
    }

    #[test]
    fn test_streak_broken_when_yesterday_missing() {
        let activities = vec![on_day(-3), on_day(-2)];
        assert_eq!(current_streak_in(&activities, now(), &Utc), 0);
    }

    #[test]
    fn test_multiple_activities_same_day_count_once() {
        let activities = vec![
            on_day(-1),
            Activity::performance(2, 2, now() - Duration::days(1) + Duration::hours(1)),
            on_day(0),
        ];
        assert_eq!(current_streak_in(&activities, now(), &Utc), 2);
    }

    #[test]
    fn test_streak_uses_local_midnight() {
        // 22:30 UTC on the 14th is 00:30 on the 15th at UTC+2
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let late = Activity::practice(1, 3, Utc.with_ymd_and_hms(2024, 6, 14, 22, 30, 0).unwrap());
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 8, 0, 0).unwrap();

        assert_eq!(current_streak_in(&[late.clone()], now, &tz), 1);
        // In UTC the same activity is yesterday, which still counts
        assert_eq!(current_streak_in(&[late], now, &Utc), 1);
    }

    #[test]
    fn test_milestone_date_third_day() {
        let activities: Vec<Activity> = (-4..=0).map(on_day).collect();

        assert_eq!(
            find_streak_milestone_date_in(&activities, 3, &Utc),
            Some(midnight(2024, 6, 13))
        );
        assert_eq!(find_streak_milestone_date_in(&activities, 6, &Utc), None);
    }

    #[test]
    fn test_milestone_non_positive_is_none() {
        let activities: Vec<Activity> = (-4..=0).map(on_day).collect();
        assert_eq!(find_streak_milestone_date_in(&activities, 0, &Utc), None);
        assert_eq!(find_streak_milestone_date_in(&activities, -2, &Utc), None);
    }

    #[test]
    fn test_milestone_uses_first_qualifying_run() {
        // Runs: 3 days (June 1-3), gap, 4 days (June 10-13)
        let mut activities: Vec<Activity> = (1..=3)
            .map(|d| Activity::practice(1, 2, midnight(2024, 6, d) + Duration::hours(9)))
            .collect();
        activities.extend(
            (10..=13).map(|d| Activity::practice(1, 2, midnight(2024, 6, d) + Duration::hours(9))),
        );

        assert_eq!(
            find_streak_milestone_date_in(&activities, 2, &Utc),
            Some(midnight(2024, 6, 2))
        );
        assert_eq!(
            find_streak_milestone_date_in(&activities, 4, &Utc),
            Some(midnight(2024, 6, 13))
        );
    }

    #[test]
    fn test_milestone_independent_of_current_streak() {
        // An old 3-day run still yields a milestone date with no recent activity
        let activities: Vec<Activity> = (-30..=-28).map(on_day).collect();
        assert_eq!(current_streak_in(&activities, now(), &Utc), 0);
        assert!(find_streak_milestone_date_in(&activities, 3, &Utc).is_some());
    }

    #[test]
    fn test_runs_cross_month_boundary() {
        let activities = vec![
            Activity::practice(1, 2, midnight(2024, 2, 28) + Duration::hours(12)),
            Activity::practice(1, 2, midnight(2024, 2, 29) + Duration::hours(12)),
            Activity::practice(1, 2, midnight(2024, 3, 1) + Duration::hours(12)),
        ];
        assert_eq!(longest_streak_in(&activities, &Utc), 3);
    }

    #[test]
    fn test_streak_periods() {
        let mut activities: Vec<Activity> = (1..=3)
            .map(|d| Activity::practice(1, 2, midnight(2024, 6, d) + Duration::hours(9)))
            .collect();
        // Single-day run is not a period
        activities.push(Activity::practice(1, 2, midnight(2024, 6, 6)));
        activities.extend(
            (9..=10).map(|d| Activity::practice(1, 2, midnight(2024, 6, d) + Duration::hours(9))),
        );

        let periods = streak_periods_in(&activities, &Utc);
        assert_eq!(
            periods,
            vec![
                StreakPeriod {
                    length: 3,
                    last_day: midnight(2024, 6, 3)
                },
                StreakPeriod {
                    length: 2,
                    last_day: midnight(2024, 6, 10)
                },
            ]
        );
        assert_eq!(longest_streak_in(&activities, &Utc), 3);
    }

    #[test]
    fn test_longest_streak_empty() {
        assert_eq!(longest_streak_in(&[], &Utc), 0);
        assert!(streak_periods_in(&[], &Utc).is_empty());
    }

    proptest! {
        // Property: the current streak never exceeds the longest streak
        #[test]
        fn prop_current_bounded_by_longest(offsets in prop::collection::vec(-60i64..=0, 0..50)) {
            let activities: Vec<Activity> = offsets.into_iter().map(on_day).collect();
            let current = current_streak_in(&activities, now(), &Utc);
            let longest = longest_streak_in(&activities, &Utc);
            prop_assert!(current <= longest);
        }

        // Property: a milestone date exists exactly when some run reaches it
        #[test]
        fn prop_milestone_matches_longest(
            offsets in prop::collection::vec(-60i64..=0, 0..50),
            milestone in 1i64..10,
        ) {
            let activities: Vec<Activity> = offsets.into_iter().map(on_day).collect();
            let longest = longest_streak_in(&activities, &Utc) as i64;
            let found = find_streak_milestone_date_in(&activities, milestone, &Utc);
            prop_assert_eq!(found.is_some(), longest >= milestone);
        }
    }
}
