//! CLI commands for PlayStreak.
//!
//! This module provides CLI commands for PlayStreak, organized into:
//! - **Journal commands**: piece, activity (log/edit/delete), history
//! - **Insight commands**: suggest, streak, achievements, stats
//!
//! Each command is built over a [`crate::journal::Journal`] and an explicit
//! `now`, runs to a serializable output struct, and formats that output as
//! JSON or human-readable text.

// Journal commands
pub mod activity;
pub mod history;
pub mod pieces;

// Insight commands
pub mod achievements;
pub mod stats;
pub mod streak;
pub mod suggest;

pub use achievements::AchievementsCommand;
pub use activity::ActivityCommand;
pub use history::HistoryCommand;
pub use pieces::PieceCommand;
pub use stats::StatsCommand;
pub use streak::StreakCommand;
pub use suggest::SuggestCommand;

use chrono::{DateTime, Local, Utc};

use crate::core::NEVER_ACTIVE;

/// Format an optional instant as a local calendar date.
pub(crate) fn format_date(ts: Option<DateTime<Utc>>) -> String {
    match ts {
        Some(ts) => ts.with_timezone(&Local).format("%Y-%m-%d").to_string(),
        None => "never".to_string(),
    }
}

/// Format a whole-days count for display.
pub(crate) fn format_days_ago(days: i64) -> String {
    match days {
        NEVER_ACTIVE => "never".to_string(),
        0 => "today".to_string(),
        1 => "1 day ago".to_string(),
        n => format!("{} days ago", n),
    }
}

/// Days since last activity for output, `None` when never active.
pub(crate) fn days_or_none(days: i64) -> Option<i64> {
    (days != NEVER_ACTIVE).then_some(days)
}
