//! Suggest command for PlayStreak.
//!
//! Shows what to practice or perform next, optionally followed by the
//! abandoned pieces list.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cli::{days_or_none, format_days_ago};
use crate::config::Config;
use crate::core::{PieceId, NEVER_ACTIVE};
use crate::error::FailOpen;
use crate::journal::Journal;
use crate::stats::{AbandonedPiece, SuggestionItem, SuggestionKind, Tier};
use crate::storage::PracticeStore;

/// Options for the suggest command.
#[derive(Debug, Clone, Default)]
pub struct SuggestOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Tier override for this run.
    pub tier: Option<Tier>,
    /// Also list abandoned pieces.
    pub abandoned: bool,
}

/// Simplified suggestion for output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionInfo {
    /// Suggested piece.
    pub piece_id: PieceId,
    /// Piece name.
    pub name: String,
    /// "practice" or "performance".
    pub kind: String,
    /// Favorite flag.
    pub is_favorite: bool,
    /// Why it was suggested.
    pub reason: String,
    /// Whole days since the ranking date, absent when never active.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_since_last_activity: Option<i64>,
}

impl From<&SuggestionItem> for SuggestionInfo {
    fn from(item: &SuggestionItem) -> Self {
        Self {
            piece_id: item.piece.id,
            name: item.piece.name.clone(),
            kind: item.kind.to_string(),
            is_favorite: item.piece.is_favorite,
            reason: item.reason.clone(),
            days_since_last_activity: days_or_none(item.days_since_last_activity),
        }
    }
}

/// Simplified abandoned piece for output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbandonedInfo {
    /// Piece ID.
    pub piece_id: PieceId,
    /// Piece name.
    pub name: String,
    /// Last activity of either type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<DateTime<Utc>>,
    /// Whole days since then, absent when never active.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_since_last_activity: Option<i64>,
}

impl From<&AbandonedPiece> for AbandonedInfo {
    fn from(abandoned: &AbandonedPiece) -> Self {
        Self {
            piece_id: abandoned.piece.id,
            name: abandoned.piece.name.clone(),
            last_activity: abandoned.last_activity_date,
            days_since_last_activity: days_or_none(abandoned.days_since_last_activity),
        }
    }
}

/// Output format for the suggest command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestOutput {
    /// Whether suggestions were produced.
    pub success: bool,
    /// Tier the caps came from.
    pub tier: String,
    /// Ranked suggestions, favorites first.
    pub suggestions: Vec<SuggestionInfo>,
    /// Abandoned pieces, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abandoned: Option<Vec<AbandonedInfo>>,
    /// Error message if the command failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SuggestOutput {
    /// Create a successful output.
    pub fn success(
        tier: Tier,
        suggestions: Vec<SuggestionInfo>,
        abandoned: Option<Vec<AbandonedInfo>>,
    ) -> Self {
        Self {
            success: true,
            tier: tier.to_string(),
            suggestions,
            abandoned,
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            tier: String::new(),
            suggestions: Vec::new(),
            abandoned: None,
            error: Some(error.into()),
        }
    }
}

/// The suggest command implementation.
pub struct SuggestCommand<S: PracticeStore> {
    journal: Journal<S>,
    config: Config,
    now: DateTime<Utc>,
}

impl<S: PracticeStore> SuggestCommand<S> {
    /// Create a new suggest command.
    pub fn new(journal: Journal<S>, config: Config) -> Self {
        Self {
            journal,
            config,
            now: Utc::now(),
        }
    }

    /// Override the current instant.
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Run the suggest command.
    pub fn run(&self, options: &SuggestOptions) -> SuggestOutput {
        let mut config = self.config.clone();
        if let Some(tier) = options.tier {
            config.suggestions.tier = tier;
        }
        let limits = config.tier_limits();

        let items = self
            .journal
            .suggestions(limits, self.now)
            .fail_open_default("Failed to generate suggestions");

        let abandoned = options.abandoned.then(|| {
            self.journal
                .abandoned(self.now)
                .fail_open_default("Failed to list abandoned pieces")
                .iter()
                .map(AbandonedInfo::from)
                .collect::<Vec<_>>()
        });

        SuggestOutput::success(
            config.suggestions.tier,
            items.iter().map(SuggestionInfo::from).collect(),
            abandoned,
        )
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &SuggestOutput, options: &SuggestOptions) -> String {
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
    fn format_human_readable(&self, output: &SuggestOutput) -> String {
        if !output.success {
            return format!(
                "Suggestions failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        let mut lines = Vec::new();
        lines.push(format!("=== Today's Suggestions ({}) ===\n", output.tier));

        if output.suggestions.is_empty() {
            lines.push("Nothing to suggest right now. You're all caught up!".to_string());
        }

        let practice = SuggestionKind::Practice.to_string();
        let sections = [("🎹 Practice", true), ("🎤 Perform", false)];
        for (title, is_practice) in sections {
            let section: Vec<&SuggestionInfo> = output
                .suggestions
                .iter()
                .filter(|s| (s.kind == practice) == is_practice)
                .collect();
            if section.is_empty() {
                continue;
            }

            lines.push(title.to_string());
            for suggestion in section {
                lines.push(format!("   {} - {}", suggestion.name, suggestion.reason));
            }
            lines.push(String::new());
        }

        if let Some(abandoned) = &output.abandoned {
            lines.push("💤 Abandoned".to_string());
            if abandoned.is_empty() {
                lines.push("   None".to_string());
            }
            for piece in abandoned {
                let days = piece.days_since_last_activity.unwrap_or(NEVER_ACTIVE);
                lines.push(format!("   {} - last played {}", piece.name, format_days_ago(days)));
            }
            lines.push(String::new());
        }

        lines.join("\n")
    }
}
