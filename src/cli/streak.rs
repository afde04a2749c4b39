//! Streak command for PlayStreak.
//!
//! Shows the current and longest streak, the next streak milestone, and
//! optionally every past run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cli::format_date;
use crate::core::AchievementKind;
use crate::error::FailOpen;
use crate::journal::Journal;
use crate::stats::{current_streak, longest_streak, streak_periods, StreakPeriod};
use crate::storage::PracticeStore;

/// Options for the streak command.
#[derive(Debug, Clone, Default)]
pub struct StreakOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Include every past run longer than one day.
    pub history: bool,
}

/// The next streak achievement still ahead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneInfo {
    /// Which achievement.
    pub kind: AchievementKind,
    /// Achievement title.
    pub title: String,
    /// Streak length required.
    pub days: u32,
    /// Days still missing from the current streak.
    pub remaining: u32,
}

impl MilestoneInfo {
    /// First milestone longer than `current`, `None` past the last one.
    pub fn next_after(current: u32) -> Option<Self> {
        AchievementKind::streak_milestones()
            .iter()
            .find(|(_, days)| *days > current)
            .map(|&(kind, days)| Self {
                kind,
                title: kind.title().to_string(),
                days,
                remaining: days - current,
            })
    }
}

/// Output format for the streak command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreakOutput {
    /// Whether the streak was computed.
    pub success: bool,
    /// Consecutive active days ending today or yesterday.
    pub current_streak: u32,
    /// Longest run ever.
    pub longest_streak: u32,
    /// Next milestone, absent once every milestone is passed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_milestone: Option<MilestoneInfo>,
    /// Past runs, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<StreakPeriod>>,
    /// Error message if the command failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StreakOutput {
    /// Create a successful output.
    pub fn success(
        current_streak: u32,
        longest_streak: u32,
        history: Option<Vec<StreakPeriod>>,
    ) -> Self {
        Self {
            success: true,
            current_streak,
            longest_streak,
            next_milestone: MilestoneInfo::next_after(current_streak),
            history,
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            current_streak: 0,
            longest_streak: 0,
            next_milestone: None,
            history: None,
            error: Some(error.into()),
        }
    }
}

/// The streak command implementation.
pub struct StreakCommand<S: PracticeStore> {
    journal: Journal<S>,
    now: DateTime<Utc>,
}

impl<S: PracticeStore> StreakCommand<S> {
    /// Create a new streak command.
    pub fn new(journal: Journal<S>) -> Self {
        Self {
            journal,
            now: Utc::now(),
        }
    }

    /// Override the current instant.
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Run the streak command.
    pub fn run(&self, options: &StreakOptions) -> StreakOutput {
        let activities = self
            .journal
            .store()
            .list_activities()
            .fail_open_default("Failed to load activities");

        let current = current_streak(&activities, self.now);
        let longest = longest_streak(&activities);
        let history = options.history.then(|| streak_periods(&activities));

        StreakOutput::success(current, longest, history)
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &StreakOutput, options: &StreakOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    /// Format output as human-readable text.
    fn format_human_readable(&self, output: &StreakOutput) -> String {
        if !output.success {
            return format!(
                "Streak failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        let plural = |n: u32| if n == 1 { "day" } else { "days" };

        let mut lines = Vec::new();
        if output.current_streak == 0 {
            lines.push("No active streak. Log a session today to start one!".to_string());
        } else {
            lines.push(format!(
                "🔥 Current streak: {} {}",
                output.current_streak,
                plural(output.current_streak)
            ));
        }
        lines.push(format!(
            "   Longest streak: {} {}",
            output.longest_streak,
            plural(output.longest_streak)
        ));

        if let Some(next) = &output.next_milestone {
            lines.push(format!(
                "   Next milestone: {} ({} days) in {} {}",
                next.title,
                next.days,
                next.remaining,
                plural(next.remaining)
            ));
        }

        if let Some(history) = &output.history {
            lines.push(String::new());
            lines.push("📅 History".to_string());
            if history.is_empty() {
                lines.push("   No runs longer than a day yet".to_string());
            }
            for period in history {
                lines.push(format!(
                    "   {} days ending {}",
                    period.length,
                    format_date(Some(period.last_day))
                ));
            }
        }

        lines.join("\n")
    }
}
