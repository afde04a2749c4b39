//! Activity commands for PlayStreak: log, edit and delete.
//!
//! Every successful mutation also refreshes achievements and reports the
//! current streak, so a logged session shows its effect right away.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{Activity, ActivityId, ActivityType, PieceId};
use crate::error::{FailOpen, PlayStreakError, Result};
use crate::journal::Journal;
use crate::storage::PracticeStore;

/// A new practice or performance to record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRequest {
    pub piece_id: PieceId,
    pub activity_type: ActivityType,
    pub level: u8,
    pub minutes: Option<u32>,
    pub performance_type: Option<String>,
    pub notes: Option<String>,
    /// When it happened, defaults to now.
    pub at: Option<DateTime<Utc>>,
}

/// Changes to an existing activity. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditRequest {
    pub activity_id: ActivityId,
    pub piece_id: Option<PieceId>,
    pub level: Option<u8>,
    pub minutes: Option<u32>,
    /// Reset minutes to "not recorded". Wins over `minutes`.
    pub clear_minutes: bool,
    pub performance_type: Option<String>,
    pub notes: Option<String>,
    pub at: Option<DateTime<Utc>>,
}

/// What the activity command should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityAction {
    /// Record a new practice or performance.
    Log(LogRequest),
    /// Change fields of an existing activity.
    Edit(EditRequest),
    /// Delete an activity.
    Delete { activity_id: ActivityId },
}

impl ActivityAction {
    fn name(&self) -> &'static str {
        match self {
            ActivityAction::Log(_) => "log",
            ActivityAction::Edit(_) => "edit",
            ActivityAction::Delete { .. } => "delete",
        }
    }
}

/// Options for the activity command.
#[derive(Debug, Clone)]
pub struct ActivityOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Action to run.
    pub action: ActivityAction,
}

/// Simplified activity info for output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityInfo {
    /// Activity ID.
    pub id: ActivityId,
    /// Piece the activity belongs to.
    pub piece_id: PieceId,
    /// Piece name, when the piece still exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub piece_name: Option<String>,
    /// "practice" or "performance".
    pub activity_type: String,
    /// Self-rated level.
    pub level: u8,
    /// Performance tag.
    pub performance_type: String,
    /// Duration, when recorded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minutes: Option<u32>,
    /// When it happened.
    pub timestamp: DateTime<Utc>,
}

impl ActivityInfo {
    pub(crate) fn from_activity(activity: &Activity, piece_name: Option<String>) -> Self {
        Self {
            id: activity.id,
            piece_id: activity.piece_id,
            piece_name,
            activity_type: activity.activity_type.to_string(),
            level: activity.level,
            performance_type: activity.performance_type.clone(),
            minutes: activity.minutes,
            timestamp: activity.timestamp,
        }
    }
}

/// Output format for the activity command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityOutput {
    /// Whether the command succeeded.
    pub success: bool,
    /// Which action ran.
    pub action: String,
    /// The logged, edited or deleted activity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity: Option<ActivityInfo>,
    /// Current streak after the change.
    pub current_streak: u32,
    /// Titles of achievements unlocked by this change.
    pub newly_unlocked: Vec<String>,
    /// Error message if the command failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActivityOutput {
    /// Create a successful output.
    pub fn success(
        action: &str,
        activity: ActivityInfo,
        current_streak: u32,
        newly_unlocked: Vec<String>,
    ) -> Self {
        Self {
            success: true,
            action: action.to_string(),
            activity: Some(activity),
            current_streak,
            newly_unlocked,
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(action: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            action: action.to_string(),
            activity: None,
            current_streak: 0,
            newly_unlocked: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// The activity command implementation.
pub struct ActivityCommand<S: PracticeStore> {
    journal: Journal<S>,
    now: DateTime<Utc>,
}

impl<S: PracticeStore> ActivityCommand<S> {
    /// Create a new activity command.
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

    /// The journal this command operates on.
    pub fn journal(&self) -> &Journal<S> {
        &self.journal
    }

    /// Run the activity command.
    pub fn run(&self, options: &ActivityOptions) -> ActivityOutput {
        let action = options.action.name();

        let result = match &options.action {
            ActivityAction::Log(request) => self.log(request),
            ActivityAction::Edit(request) => self.edit(request),
            ActivityAction::Delete { activity_id } => {
                self.journal.delete_activity(*activity_id, self.now)
            }
        };

        let activity = match result {
            Ok(activity) => activity,
            Err(e) => return ActivityOutput::failure(action, e.to_string()),
        };

        let piece_name = self
            .journal
            .store()
            .get_piece(activity.piece_id)
            .fail_open_default("Failed to load piece")
            .map(|p| p.name);

        let newly_unlocked = self
            .journal
            .sync_achievements(self.now)
            .map(|sync| {
                sync.newly_unlocked
                    .iter()
                    .map(|a| a.kind.title().to_string())
                    .collect::<Vec<_>>()
            })
            .fail_open_default("Failed to sync achievements");

        let current_streak = self
            .journal
            .current_streak(self.now)
            .fail_open_default("Failed to compute streak");

        ActivityOutput::success(
            action,
            ActivityInfo::from_activity(&activity, piece_name),
            current_streak,
            newly_unlocked,
        )
    }

    fn log(&self, request: &LogRequest) -> Result<Activity> {
        let mut activity = Activity::new(
            request.piece_id,
            request.activity_type,
            request.level,
            request.at.unwrap_or(self.now),
        );
        if let Some(minutes) = request.minutes {
            activity = activity.with_minutes(minutes);
        }
        if let Some(performance_type) = &request.performance_type {
            activity = activity.with_performance_type(performance_type.as_str());
        }
        if let Some(notes) = &request.notes {
            activity = activity.with_notes(notes.as_str());
        }

        self.journal.add_activity(activity, self.now)
    }

    fn edit(&self, request: &EditRequest) -> Result<Activity> {
        let existing = self
            .journal
            .store()
            .get_activity(request.activity_id)?
            .ok_or_else(|| PlayStreakError::activity_not_found(request.activity_id))?;

        let updated = Activity {
            piece_id: request.piece_id.unwrap_or(existing.piece_id),
            level: request.level.unwrap_or(existing.level),
            minutes: if request.clear_minutes {
                None
            } else {
                request.minutes.or(existing.minutes)
            },
            performance_type: request
                .performance_type
                .clone()
                .unwrap_or_else(|| existing.performance_type.clone()),
            notes: request.notes.clone().unwrap_or_else(|| existing.notes.clone()),
            timestamp: request.at.unwrap_or(existing.timestamp),
            ..existing
        };

        self.journal.update_activity(updated, self.now)
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &ActivityOutput, options: &ActivityOptions) -> String {
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
    fn format_human_readable(&self, output: &ActivityOutput) -> String {
        if !output.success {
            return format!(
                "Activity {} failed: {}\n",
                output.action,
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        let mut lines = Vec::new();
        if let Some(activity) = &output.activity {
            let verb = match output.action.as_str() {
                "log" => "Logged",
                "edit" => "Updated",
                _ => "Deleted",
            };
            let piece = activity
                .piece_name
                .clone()
                .unwrap_or_else(|| format!("piece #{}", activity.piece_id));
            let minutes = activity
                .minutes
                .map(|m| format!(", {} min", m))
                .unwrap_or_default();
            lines.push(format!(
                "{} {} #{} for {} (level {}{})",
                verb, activity.activity_type, activity.id, piece, activity.level, minutes
            ));
        }

        if output.current_streak > 0 {
            lines.push(format!(
                "🔥 Streak: {} day{}",
                output.current_streak,
                if output.current_streak == 1 { "" } else { "s" }
            ));
        }

        for title in &output.newly_unlocked {
            lines.push(format!("🏆 Achievement unlocked: {}", title));
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ItemType;
    use crate::storage::MemoryStore;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn command() -> ActivityCommand<MemoryStore> {
        let journal = Journal::new(MemoryStore::new());
        journal
            .add_piece("Nocturne", ItemType::Piece, false, now() - Duration::days(30))
            .unwrap();
        journal
            .add_piece("Scales", ItemType::Technique, false, now() - Duration::days(30))
            .unwrap();
        ActivityCommand::new(journal).with_now(now())
    }

    fn options(action: ActivityAction) -> ActivityOptions {
        ActivityOptions {
            json: false,
            quiet: false,
            action,
        }
    }

    fn log_practice(piece_id: PieceId, level: u8) -> ActivityAction {
        ActivityAction::Log(LogRequest {
            piece_id,
            activity_type: ActivityType::Practice,
            level,
            minutes: Some(25),
            performance_type: None,
            notes: None,
            at: None,
        })
    }

    #[test]
    fn test_log_practice() {
        let cmd = command();

        let output = cmd.run(&options(log_practice(1, 4)));

        assert!(output.success);
        let activity = output.activity.unwrap();
        assert_eq!(activity.id, 1);
        assert_eq!(activity.piece_name.as_deref(), Some("Nocturne"));
        assert_eq!(activity.minutes, Some(25));
        assert_eq!(activity.timestamp, now());
        assert_eq!(output.current_streak, 1);

        let piece = cmd.journal().store().get_piece(1).unwrap().unwrap();
        assert_eq!(piece.stats.practice_count, 1);
    }

    #[test]
    fn test_log_reports_first_unlocks() {
        let cmd = command();

        let output = cmd.run(&options(log_practice(1, 2)));

        assert!(output
            .newly_unlocked
            .contains(&"Practice Makes Perfect".to_string()));

        let again = cmd.run(&options(log_practice(1, 2)));
        assert!(!again
            .newly_unlocked
            .contains(&"Practice Makes Perfect".to_string()));
    }

    #[test]
    fn test_log_performance_defaults_to_live() {
        let cmd = command();

        let output = cmd.run(&options(ActivityAction::Log(LogRequest {
            piece_id: 1,
            activity_type: ActivityType::Performance,
            level: 3,
            minutes: None,
            performance_type: None,
            notes: None,
            at: Some(now() - Duration::days(1)),
        })));

        assert!(output.success);
        assert_eq!(output.activity.unwrap().performance_type, "live");
    }

    #[test]
    fn test_log_invalid_level_fails() {
        let cmd = command();

        let output = cmd.run(&options(log_practice(1, 9)));

        assert!(!output.success);
        assert!(output.error.unwrap().contains("invalid activity"));
        assert!(cmd.journal().store().list_activities().unwrap().is_empty());
    }

    #[test]
    fn test_log_unknown_piece_fails() {
        let cmd = command();

        let output = cmd.run(&options(log_practice(42, 2)));

        assert!(!output.success);
        assert!(output.error.unwrap().contains("piece not found"));
    }

    #[test]
    fn test_edit_moves_activity_between_pieces() {
        let cmd = command();
        cmd.run(&options(log_practice(1, 3)));

        let output = cmd.run(&options(ActivityAction::Edit(EditRequest {
            activity_id: 1,
            piece_id: Some(2),
            level: Some(4),
            notes: Some("cleaner runs".to_string()),
            ..Default::default()
        })));

        assert!(output.success);
        let stored = cmd.journal().store().get_activity(1).unwrap().unwrap();
        assert_eq!(stored.piece_id, 2);
        assert_eq!(stored.level, 4);
        assert_eq!(stored.minutes, Some(25));
        assert_eq!(stored.notes, "cleaner runs");

        let first = cmd.journal().store().get_piece(1).unwrap().unwrap();
        let second = cmd.journal().store().get_piece(2).unwrap().unwrap();
        assert_eq!(first.stats.practice_count, 0);
        assert_eq!(second.stats.practice_count, 1);
    }

    #[test]
    fn test_edit_clears_minutes() {
        let cmd = command();
        cmd.run(&options(log_practice(1, 3)));

        let output = cmd.run(&options(ActivityAction::Edit(EditRequest {
            activity_id: 1,
            clear_minutes: true,
            ..Default::default()
        })));

        assert!(output.success);
        let stored = cmd.journal().store().get_activity(1).unwrap().unwrap();
        assert_eq!(stored.minutes, None);
        assert_eq!(stored.minutes_or_sentinel(), -1);
        assert_eq!(stored.level, 3);
    }

    #[test]
    fn test_edit_missing_activity_fails() {
        let cmd = command();

        let output = cmd.run(&options(ActivityAction::Edit(EditRequest {
            activity_id: 5,
            level: Some(2),
            ..Default::default()
        })));

        assert!(!output.success);
        assert!(output.error.unwrap().contains("activity not found"));
    }

    #[test]
    fn test_delete_activity() {
        let cmd = command();
        cmd.run(&options(log_practice(1, 3)));

        let output = cmd.run(&options(ActivityAction::Delete { activity_id: 1 }));

        assert!(output.success);
        assert_eq!(output.current_streak, 0);
        let piece = cmd.journal().store().get_piece(1).unwrap().unwrap();
        assert_eq!(piece.stats.practice_count, 0);
    }

    #[test]
    fn test_format_human_readable() {
        let cmd = command();
        let output = cmd.run(&options(log_practice(1, 4)));

        let human = cmd.format_output(&output, &options(log_practice(1, 4)));

        assert!(human.contains("Logged practice #1 for Nocturne (level 4, 25 min)"));
        assert!(human.contains("Streak: 1 day"));
    }

    #[test]
    fn test_format_failure() {
        let cmd = command();
        let output = ActivityOutput::failure("log", "boom");

        let human = cmd.format_output(&output, &options(log_practice(1, 4)));

        assert_eq!(human, "Activity log failed: boom\n");
    }
}
