//! Calendar helpers shared by the analytics core.
//!
//! Day boundaries are local midnights in a caller-supplied time zone. Every
//! helper takes the zone explicitly so the pure computations never read the
//! process clock or the process zone on their own.

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};

/// Sentinel for "never active": an infinitely idle piece.
pub const NEVER_ACTIVE: i64 = i64::MAX;

/// The calendar day a timestamp falls on in the given zone.
pub fn local_date<Tz: TimeZone>(ts: DateTime<Utc>, tz: &Tz) -> NaiveDate {
    ts.with_timezone(tz).date_naive()
}

/// The instant local midnight begins `date` in the given zone.
///
/// When a DST jump skips midnight, the day starts at the first local time
/// that exists.
pub fn start_of_day<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let mut local = date.and_time(NaiveTime::MIN);
    for _ in 0..24 {
        match tz.from_local_datetime(&local) {
            LocalResult::Single(dt) => return dt.with_timezone(&Utc),
            LocalResult::Ambiguous(earliest, _) => return earliest.with_timezone(&Utc),
            LocalResult::None => local += Duration::hours(1),
        }
    }
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Local midnight of the day containing `now`.
pub fn start_of_today<Tz: TimeZone>(now: DateTime<Utc>, tz: &Tz) -> DateTime<Utc> {
    start_of_day(local_date(now, tz), tz)
}

/// Whole 24-hour periods elapsed between `then` and `now`, truncated toward zero.
pub fn days_between(then: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - then).num_days()
}

/// Days since `then`, or [`NEVER_ACTIVE`] when there is no date.
pub fn days_since(then: Option<DateTime<Utc>>, now: DateTime<Utc>) -> i64 {
    then.map(|ts| days_between(ts, now)).unwrap_or(NEVER_ACTIVE)
}

/// Convert epoch milliseconds into a UTC timestamp.
///
/// Out-of-range values clamp to the Unix epoch.
pub fn from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or(DateTime::UNIX_EPOCH)
}

/// Convert a UTC timestamp into epoch milliseconds.
pub fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}
