//! History command for PlayStreak.
//!
//! Lists logged activities newest first, grouped by local day, under a
//! summary of the trailing week. The IDs shown here are the ones `edit` and
//! `delete` take.

use std::collections::HashMap;

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::cli::activity::ActivityInfo;
use crate::core::time::local_date;
use crate::core::{ActivityType, PieceId};
use crate::error::{FailOpen, Result};
use crate::journal::Journal;
use crate::stats::{day_range, trailing_days, week_summary_in, ActivitySummary};
use crate::storage::PracticeStore;

/// Options for the history command.
#[derive(Debug, Clone, Default)]
pub struct HistoryOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Only the last N local days, today included.
    pub days: Option<u32>,
    /// Hide practice sessions.
    pub performances_only: bool,
}

/// Output format for the history command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryOutput {
    /// Whether the history was loaded.
    pub success: bool,
    /// Totals for the trailing week, regardless of filters.
    pub week: ActivitySummary,
    /// Matching activities, newest first.
    pub activities: Vec<ActivityInfo>,
    /// Error message if the command failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HistoryOutput {
    /// Create a successful output.
    pub fn success(week: ActivitySummary, activities: Vec<ActivityInfo>) -> Self {
        Self {
            success: true,
            week,
            activities,
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            week: ActivitySummary::default(),
            activities: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// The history command implementation.
pub struct HistoryCommand<S: PracticeStore> {
    journal: Journal<S>,
    now: DateTime<Utc>,
}

impl<S: PracticeStore> HistoryCommand<S> {
    /// Create a new history command.
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

    /// Run the history command.
    pub fn run(&self, options: &HistoryOptions) -> HistoryOutput {
        match self.collect(options, &Local) {
            Ok(output) => output,
            Err(e) => HistoryOutput::failure(format!("Failed to load history: {}", e)),
        }
    }

    fn collect<Tz: TimeZone>(&self, options: &HistoryOptions, tz: &Tz) -> Result<HistoryOutput> {
        let store = self.journal.store();

        let all = store.list_activities()?;
        let week = week_summary_in(&all, self.now, tz);

        let mut activities = match options.days {
            Some(days) => {
                let (first, today) = trailing_days(self.now, u64::from(days), tz);
                let (start, end) = day_range(first, today, tz);
                store.activities_between(start, end)?
            }
            None => all,
        };
        if options.performances_only {
            activities.retain(|a| a.activity_type == ActivityType::Performance);
        }
        activities.sort_by_key(|a| std::cmp::Reverse((a.timestamp, a.id)));

        let names: HashMap<PieceId, String> = store
            .list_pieces()
            .fail_open_default("Failed to load piece names")
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect();

        let entries = activities
            .iter()
            .filter_map(|activity| match names.get(&activity.piece_id) {
                Some(name) => Some(ActivityInfo::from_activity(activity, Some(name.clone()))),
                None => {
                    tracing::debug!(
                        activity_id = activity.id,
                        piece_id = activity.piece_id,
                        "skipping activity of a missing piece"
                    );
                    None
                }
            })
            .collect();

        Ok(HistoryOutput::success(week, entries))
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &HistoryOutput, options: &HistoryOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output, options)
        }
    }

    /// Format output as human-readable text.
    fn format_human_readable(&self, output: &HistoryOutput, options: &HistoryOptions) -> String {
        if !output.success {
            return format!(
                "History failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        let mut lines = Vec::new();
        lines.push("=== Practice History ===\n".to_string());
        lines.push(describe_week(&output.week));
        lines.push(String::new());

        if output.activities.is_empty() {
            lines.push(if options.performances_only {
                "No performances logged.".to_string()
            } else {
                "No activities logged.".to_string()
            });
            return lines.join("\n");
        }

        let today = local_date(self.now, &Local);
        let mut current_day: Option<NaiveDate> = None;
        for entry in &output.activities {
            let local = entry.timestamp.with_timezone(&Local);
            let day = local.date_naive();
            if current_day != Some(day) {
                lines.push(day_label(day, today));
                current_day = Some(day);
            }

            let minutes = entry
                .minutes
                .filter(|&m| m > 0)
                .map(|m| format!(", {} min", m))
                .unwrap_or_default();
            let tag = if entry.activity_type == ActivityType::Performance.to_string() {
                format!(" {}", entry.performance_type)
            } else {
                String::new()
            };
            lines.push(format!(
                "   #{} {} {}{} {} (level {}{})",
                entry.id,
                local.format("%H:%M"),
                entry.piece_name.as_deref().unwrap_or("?"),
                tag,
                entry.activity_type,
                entry.level,
                minutes
            ));
        }

        lines.join("\n")
    }
}

/// "This week: ..." line with the tracked-time total when there is one.
fn describe_week(week: &ActivitySummary) -> String {
    let plural = |n: usize, one: &str, many: &str| {
        format!("{} {}", n, if n == 1 { one } else { many })
    };

    let mut line = format!(
        "This week: {}, {} across {}",
        plural(week.practice_count, "practice activity", "practice activities"),
        plural(week.performance_count, "performance", "performances"),
        plural(week.active_days, "day", "days")
    );
    if week.total_minutes > 0 {
        line.push_str(&format!("\nTotal tracked time: {} minutes", week.total_minutes));
    }
    line
}

fn day_label(day: NaiveDate, today: NaiveDate) -> String {
    if day == today {
        "Today".to_string()
    } else if Some(day) == today.pred_opt() {
        "Yesterday".to_string()
    } else {
        day.format("%Y-%m-%d").to_string()
    }
}
