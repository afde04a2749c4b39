//! Practice and performance suggestions.
//!
//! The engine ranks pieces by how long they have been idle, using the cached
//! statistics block on each piece rather than re-scanning the activity log.
//! Suggestions are only as fresh as the most recent aggregation run.
//!
//! Practice suggestions come in two buckets:
//!
//! - **Favorites**: idle for more than two days and not touched today.
//! - **Non-favorites**: idle between 7 and 31 days (the staleness window).
//!
//! When a bucket under-fills its cap, a deterministic fallback tops it up:
//! the longest-idle favorites, and the most recently abandoned non-favorites.
//!
//! Performance suggestions are only produced when the tier allows them and
//! are limited to pieces that have been practiced well and often in the last
//! 28 days.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::core::time::{days_since, start_of_today};
use crate::core::{Activity, ActivityType, PieceId, PieceOrTechnique};
use crate::error::{PlayStreakError, Result};

/// Favorites must be idle longer than this to be suggested.
pub const FAVORITE_IDLE_DAYS: i64 = 2;
/// Non-favorites are stale from this many idle days on.
pub const STALE_AFTER_DAYS: i64 = 7;
/// Non-favorites idle at least this long are abandoned rather than stale.
pub const ABANDONED_AFTER_DAYS: i64 = 31;
/// Trailing window used by the performance readiness gate.
pub const PERFORMANCE_WINDOW_DAYS: i64 = 28;
/// Minimum practices inside the window to be performance-ready.
pub const PERFORMANCE_MIN_PRACTICES: usize = 3;
/// At least one practice in the window must reach this level.
pub const PERFORMANCE_READY_LEVEL: u8 = 4;

/// Caps handed to the engine by the caller.
///
/// The engine is tier-agnostic: it only consumes these numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLimits {
    /// Maximum favorite practice suggestions.
    pub favorite_cap: usize,
    /// Maximum non-favorite practice suggestions.
    pub non_favorite_cap: usize,
    /// Maximum performance suggestions.
    pub performance_cap: usize,
    /// Whether performance suggestions are produced at all.
    pub performance_suggestions: bool,
}

impl TierLimits {
    /// Limits of the free tier.
    pub fn free() -> Self {
        Self {
            favorite_cap: 1,
            non_favorite_cap: 2,
            performance_cap: 0,
            performance_suggestions: false,
        }
    }

    /// Limits of the pro tier.
    pub fn pro() -> Self {
        Self {
            favorite_cap: 4,
            non_favorite_cap: 4,
            performance_cap: 5,
            performance_suggestions: true,
        }
    }

    /// Cap applied to the non-favorite bucket of the combined list.
    pub fn combined_non_favorite_cap(&self) -> usize {
        self.non_favorite_cap.saturating_add(self.performance_cap)
    }
}

impl Default for TierLimits {
    fn default() -> Self {
        Self::free()
    }
}

/// Subscription tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Free,
    Pro,
}

impl Tier {
    /// The caps for this tier.
    pub fn limits(&self) -> TierLimits {
        match self {
            Tier::Free => TierLimits::free(),
            Tier::Pro => TierLimits::pro(),
        }
    }

    /// Get the display name for this tier.
    pub fn display_name(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Pro => "pro",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Tier {
    type Err = PlayStreakError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "free" => Ok(Tier::Free),
            "pro" => Ok(Tier::Pro),
            other => Err(PlayStreakError::config(format!(
                "unknown tier '{}', expected 'free' or 'pro'",
                other
            ))),
        }
    }
}

/// What a suggestion asks the user to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    Practice,
    Performance,
}

impl fmt::Display for SuggestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuggestionKind::Practice => f.write_str("practice"),
            SuggestionKind::Performance => f.write_str("performance"),
        }
    }
}

/// A single ranked suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionItem {
    /// The suggested piece, with its cached statistics.
    pub piece: PieceOrTechnique,
    /// Date the ranking was based on.
    pub last_activity_date: Option<DateTime<Utc>>,
    /// Whole days since that date, [`crate::core::NEVER_ACTIVE`] when missing.
    pub days_since_last_activity: i64,
    /// Human-readable reason.
    pub reason: String,
    /// Practice or performance.
    pub kind: SuggestionKind,
}

impl SuggestionItem {
    fn is_favorite_practice(&self) -> bool {
        self.kind == SuggestionKind::Practice && self.piece.is_favorite
    }
}

/// A piece paired with its most recent activity, as seen by the ranking.
struct Candidate<'a> {
    piece: &'a PieceOrTechnique,
    last: Option<(DateTime<Utc>, ActivityType)>,
    days: i64,
}

impl<'a> Candidate<'a> {
    fn new(piece: &'a PieceOrTechnique, now: DateTime<Utc>) -> Self {
        let last = piece.stats.last_activity();
        Self {
            piece,
            last,
            days: days_since(last.map(|(ts, _)| ts), now),
        }
    }

    fn last_date(&self) -> Option<DateTime<Utc>> {
        self.last.map(|(ts, _)| ts)
    }

    fn into_item(self) -> SuggestionItem {
        SuggestionItem {
            piece: self.piece.clone(),
            last_activity_date: self.last_date(),
            days_since_last_activity: self.days,
            reason: practice_reason(self.piece.is_favorite, self.last, self.days),
            kind: SuggestionKind::Practice,
        }
    }
}

/// Ranks pieces for practice and performance.
///
/// Built once per refresh from the caps, the current instant and the zone
/// that defines "today".
#[derive(Debug, Clone)]
pub struct SuggestionEngine {
    limits: TierLimits,
    now: DateTime<Utc>,
    start_of_today: DateTime<Utc>,
}

impl SuggestionEngine {
    /// Create an engine using the local time zone for "today".
    pub fn new(limits: TierLimits, now: DateTime<Utc>) -> Self {
        Self::with_timezone(limits, now, &Local)
    }

    /// Create an engine with an explicit time zone for "today".
    pub fn with_timezone<Tz: TimeZone>(limits: TierLimits, now: DateTime<Utc>, tz: &Tz) -> Self {
        Self {
            limits,
            now,
            start_of_today: start_of_today(now, tz),
        }
    }

    /// The caps this engine applies.
    pub fn limits(&self) -> &TierLimits {
        &self.limits
    }

    fn days_ago(&self, days: i64) -> DateTime<Utc> {
        self.now - Duration::days(days)
    }

    fn touched_today(&self, date: Option<DateTime<Utc>>) -> bool {
        date.is_some_and(|d| d >= self.start_of_today)
    }

    /// Practice suggestions: favorites first, then non-favorites.
    ///
    /// Only items of type piece are considered.
    pub fn practice_suggestions(&self, pieces: &[PieceOrTechnique]) -> Vec<SuggestionItem> {
        let candidates: Vec<Candidate<'_>> = pieces
            .iter()
            .filter(|p| p.is_piece())
            .map(|p| Candidate::new(p, self.now))
            .collect();
        let (favorites, non_favorites): (Vec<_>, Vec<_>) =
            candidates.into_iter().partition(|c| c.piece.is_favorite);

        let mut result = self.favorite_suggestions(favorites);
        result.extend(self.non_favorite_suggestions(non_favorites));

        tracing::debug!(count = result.len(), "generated practice suggestions");
        result
    }

    fn favorite_suggestions(&self, favorites: Vec<Candidate<'_>>) -> Vec<SuggestionItem> {
        let cap = self.limits.favorite_cap;
        let idle_cutoff = self.days_ago(FAVORITE_IDLE_DAYS);

        let (mut primary, rest): (Vec<_>, Vec<_>) = favorites.into_iter().partition(|c| {
            c.last_date()
                .map_or(true, |d| d < idle_cutoff && d < self.start_of_today)
        });
        primary.sort_by_key(|c| c.last_date());
        primary.truncate(cap);

        let needed = cap - primary.len();
        let mut chosen: Vec<SuggestionItem> = primary.into_iter().map(Candidate::into_item).collect();
        if needed == 0 {
            return chosen;
        }

        // Fallback: the longest-idle favorites not touched today
        let mut pool: Vec<Candidate<'_>> = rest
            .into_iter()
            .filter(|c| !self.touched_today(c.last_date()))
            .collect();
        let Some(max_days) = pool.iter().map(|c| c.days).max() else {
            return chosen;
        };
        pool.retain(|c| c.days == max_days);
        pool.sort_by_key(|c| (c.last_date(), c.piece.sort_name()));

        tracing::debug!(needed, pool = pool.len(), "filling favorites from fallback");
        chosen.extend(pool.into_iter().take(needed).map(Candidate::into_item));
        chosen
    }

    fn non_favorite_suggestions(&self, non_favorites: Vec<Candidate<'_>>) -> Vec<SuggestionItem> {
        let cap = self.limits.non_favorite_cap;
        let stale_cutoff = self.days_ago(STALE_AFTER_DAYS);
        let abandoned_cutoff = self.days_ago(ABANDONED_AFTER_DAYS);

        // Stale means 7 <= age < 31 days; 31 days and beyond is abandoned
        let (mut primary, rest): (Vec<_>, Vec<_>) = non_favorites.into_iter().partition(|c| {
            c.last_date()
                .is_some_and(|d| d <= stale_cutoff && d > abandoned_cutoff)
        });
        primary.sort_by_key(|c| c.last_date());
        primary.truncate(cap);

        let needed = cap - primary.len();
        let mut chosen: Vec<SuggestionItem> = primary.into_iter().map(Candidate::into_item).collect();
        if needed == 0 {
            return chosen;
        }

        // Fallback: the most recently abandoned pieces, never-active last
        let mut pool: Vec<Candidate<'_>> = rest
            .into_iter()
            .filter(|c| c.last_date().map_or(true, |d| d <= abandoned_cutoff))
            .collect();
        pool.sort_by_key(|c| (c.days, Reverse(c.last_date()), c.piece.sort_name()));

        tracing::debug!(needed, pool = pool.len(), "filling non-favorites from fallback");
        chosen.extend(pool.into_iter().take(needed).map(Candidate::into_item));
        chosen
    }

    /// Performance suggestions, empty when the tier disallows them.
    ///
    /// Tier 1 holds ready pieces not performed in the last 28 days, most
    /// recently practiced first. Tier 2 holds ready pieces performed within
    /// the window but not today, least recently performed first.
    pub fn performance_suggestions(
        &self,
        pieces: &[PieceOrTechnique],
        activities: &[Activity],
    ) -> Vec<SuggestionItem> {
        if !self.limits.performance_suggestions {
            tracing::debug!("performance suggestions disabled for tier");
            return Vec::new();
        }

        let window_start = self.days_ago(PERFORMANCE_WINDOW_DAYS);
        let readiness = recent_practice_summary(activities, window_start);

        let mut first_tier: Vec<(SuggestionItem, usize)> = Vec::new();
        let mut second_tier: Vec<(SuggestionItem, usize)> = Vec::new();

        for piece in pieces.iter().filter(|p| p.is_piece()) {
            let Some(&(count, has_ready_level)) = readiness.get(&piece.id) else {
                continue;
            };
            if count < PERFORMANCE_MIN_PRACTICES || !has_ready_level {
                continue;
            }

            let last_performance = piece.stats.last_performance_date;
            let last_practice = piece.stats.last_practice_date;
            let days_since_performance = days_since(last_performance, self.now);
            let star = if piece.is_favorite { "⭐ " } else { "" };

            match last_performance {
                Some(performed) if performed >= window_start => {
                    if performed < self.start_of_today {
                        let item = SuggestionItem {
                            piece: piece.clone(),
                            last_activity_date: Some(performed),
                            days_since_last_activity: days_since_performance,
                            reason: format!(
                                "{}{} practices, last performance {} days ago",
                                star, count, days_since_performance
                            ),
                            kind: SuggestionKind::Performance,
                        };
                        second_tier.push((item, count));
                    }
                }
                _ => {
                    let reason = match last_performance {
                        None => format!("{}{} practices, never performed", star, count),
                        Some(_) => format!(
                            "{}{} practices, last performance {} days ago",
                            star, count, days_since_performance
                        ),
                    };
                    let item = SuggestionItem {
                        piece: piece.clone(),
                        last_activity_date: last_practice,
                        days_since_last_activity: days_since(last_practice, self.now),
                        reason,
                        kind: SuggestionKind::Performance,
                    };
                    first_tier.push((item, count));
                }
            }
        }

        first_tier.sort_by_key(|(item, _)| (item.days_since_last_activity, item.piece.sort_name()));
        second_tier.sort_by_key(|(item, count)| {
            (
                Reverse(item.days_since_last_activity),
                Reverse(*count),
                item.piece.sort_name(),
            )
        });

        tracing::debug!(
            first_tier = first_tier.len(),
            second_tier = second_tier.len(),
            cap = self.limits.performance_cap,
            "ranked performance suggestions"
        );

        first_tier
            .into_iter()
            .chain(second_tier)
            .map(|(item, _)| item)
            .take(self.limits.performance_cap)
            .collect()
    }

    /// Practice then performance suggestions, re-capped as one list.
    ///
    /// Favorite practice suggestions are capped at `favorite_cap`; everything
    /// else (non-favorite practice plus all performance suggestions) is
    /// capped at `non_favorite_cap + performance_cap`. Relative order within
    /// each bucket is preserved and favorites come first.
    pub fn all_suggestions(
        &self,
        pieces: &[PieceOrTechnique],
        activities: &[Activity],
    ) -> Vec<SuggestionItem> {
        let mut all = self.practice_suggestions(pieces);
        all.extend(self.performance_suggestions(pieces, activities));

        let (favorites, others): (Vec<_>, Vec<_>) =
            all.into_iter().partition(SuggestionItem::is_favorite_practice);

        favorites
            .into_iter()
            .take(self.limits.favorite_cap)
            .chain(others.into_iter().take(self.limits.combined_non_favorite_cap()))
            .collect()
    }
}

/// Per piece: practices inside the window, and whether one reached the ready level.
fn recent_practice_summary(
    activities: &[Activity],
    window_start: DateTime<Utc>,
) -> HashMap<PieceId, (usize, bool)> {
    let mut summary: HashMap<PieceId, (usize, bool)> = HashMap::new();
    for activity in activities
        .iter()
        .filter(|a| a.is_practice() && a.timestamp >= window_start)
    {
        let entry = summary.entry(activity.piece_id).or_insert((0, false));
        entry.0 += 1;
        entry.1 |= activity.level == PERFORMANCE_READY_LEVEL;
    }
    summary
}

fn practice_reason(
    favorite: bool,
    last: Option<(DateTime<Utc>, ActivityType)>,
    days: i64,
) -> String {
    let prefix = if favorite { "Favorite piece - " } else { "" };
    match last {
        None => format!("{}Never practiced", prefix),
        Some((_, activity_type)) => {
            let label = match activity_type {
                ActivityType::Practice => "Last practice",
                ActivityType::Performance => "Last performance",
            };
            let unit = if days == 1 { "day" } else { "days" };
            format!("{}{} {} {} ago", prefix, label, days, unit)
        }
    }
}

/// Practice suggestions with "today" in the local time zone.
pub fn generate_practice_suggestions(
    pieces: &[PieceOrTechnique],
    limits: TierLimits,
    now: DateTime<Utc>,
) -> Vec<SuggestionItem> {
    SuggestionEngine::new(limits, now).practice_suggestions(pieces)
}

/// Performance suggestions with "today" in the local time zone.
pub fn generate_performance_suggestions(
    pieces: &[PieceOrTechnique],
    activities: &[Activity],
    limits: TierLimits,
    now: DateTime<Utc>,
) -> Vec<SuggestionItem> {
    SuggestionEngine::new(limits, now).performance_suggestions(pieces, activities)
}

/// Combined suggestions with "today" in the local time zone.
pub fn generate_all_suggestions(
    pieces: &[PieceOrTechnique],
    activities: &[Activity],
    limits: TierLimits,
    now: DateTime<Utc>,
) -> Vec<SuggestionItem> {
    SuggestionEngine::new(limits, now).all_suggestions(pieces, activities)
}
