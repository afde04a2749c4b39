//! Achievements command for PlayStreak.
//!
//! Reconciles stored unlocks with history, then lists every achievement
//! with its unlock date.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cli::format_date;
use crate::core::{AchievementCategory, AchievementKind, UnlockedAchievement};
use crate::error::FailOpen;
use crate::journal::{AchievementSync, Journal};
use crate::storage::PracticeStore;

/// Options for the achievements command.
#[derive(Debug, Clone, Default)]
pub struct AchievementsOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Hide locked achievements.
    pub unlocked_only: bool,
}

/// One achievement and its unlock state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AchievementInfo {
    pub kind: AchievementKind,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub category: AchievementCategory,
    /// When it was earned, absent while locked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unlocked_at: Option<DateTime<Utc>>,
}

impl AchievementInfo {
    fn new(kind: AchievementKind, unlocked_at: Option<DateTime<Utc>>) -> Self {
        Self {
            kind,
            title: kind.title().to_string(),
            description: kind.description(),
            icon: kind.icon().to_string(),
            category: kind.category(),
            unlocked_at,
        }
    }
}

/// Output format for the achievements command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AchievementsOutput {
    /// Whether achievements were loaded.
    pub success: bool,
    /// Number of unlocked achievements.
    pub unlocked_count: usize,
    /// Number of achievements that exist.
    pub total: usize,
    /// Achievements unlocked by this run.
    pub newly_unlocked: Vec<AchievementKind>,
    /// Achievements in display order.
    pub achievements: Vec<AchievementInfo>,
    /// Error message if the command failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AchievementsOutput {
    /// Create a successful output from a sync result.
    pub fn success(sync: &AchievementSync, unlocked_only: bool) -> Self {
        let unlocked_at = |kind: AchievementKind| {
            sync.unlocked
                .iter()
                .find(|a| a.kind == kind)
                .map(|a| a.unlocked_at)
        };

        let achievements: Vec<AchievementInfo> = AchievementKind::all()
            .iter()
            .map(|&kind| AchievementInfo::new(kind, unlocked_at(kind)))
            .filter(|a| !unlocked_only || a.unlocked_at.is_some())
            .collect();

        Self {
            success: true,
            unlocked_count: sync.unlocked.len(),
            total: AchievementKind::all().len(),
            newly_unlocked: sync.newly_unlocked.iter().map(|a| a.kind).collect(),
            achievements,
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            unlocked_count: 0,
            total: AchievementKind::all().len(),
            newly_unlocked: Vec::new(),
            achievements: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// The achievements command implementation.
pub struct AchievementsCommand<S: PracticeStore> {
    journal: Journal<S>,
    now: DateTime<Utc>,
}

impl<S: PracticeStore> AchievementsCommand<S> {
    /// Create a new achievements command.
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

    /// Run the achievements command.
    ///
    /// A failed sync falls back to the stored unlocks.
    pub fn run(&self, options: &AchievementsOptions) -> AchievementsOutput {
        let sync = match self.journal.sync_achievements(self.now) {
            Ok(sync) => sync,
            Err(e) => {
                tracing::warn!(error = %e, "achievement sync failed, showing stored unlocks");
                let unlocked: Vec<UnlockedAchievement> = self
                    .journal
                    .store()
                    .list_achievements()
                    .fail_open_default("Failed to load achievements");
                AchievementSync {
                    unlocked,
                    newly_unlocked: Vec::new(),
                }
            }
        };

        AchievementsOutput::success(&sync, options.unlocked_only)
    }

    /// Format output based on options.
    pub fn format_output(
        &self,
        output: &AchievementsOutput,
        options: &AchievementsOptions,
    ) -> String {
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
    fn format_human_readable(&self, output: &AchievementsOutput) -> String {
        if !output.success {
            return format!(
                "Achievements failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        let mut lines = Vec::new();
        lines.push(format!(
            "=== Achievements ({}/{}) ===\n",
            output.unlocked_count, output.total
        ));

        for achievement in &output.achievements {
            match achievement.unlocked_at {
                Some(at) => {
                    let new = if output.newly_unlocked.contains(&achievement.kind) {
                        " NEW"
                    } else {
                        ""
                    };
                    lines.push(format!(
                        "{} {} - {} ({}){}",
                        achievement.icon,
                        achievement.title,
                        achievement.description,
                        format_date(Some(at)),
                        new
                    ));
                }
                None => lines.push(format!(
                    "🔒 {} - {}",
                    achievement.title, achievement.description
                )),
            }
        }

        lines.join("\n")
    }
}
