//! Stats command for PlayStreak.
//!
//! Displays each piece's cached statistics, and can check or rebuild the
//! cache against the activity log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cli::format_date;
use crate::core::{PieceId, PieceOrTechnique, PieceStatistics};
use crate::error::FailOpen;
use crate::journal::Journal;
use crate::storage::PracticeStore;

/// Options for the stats command.
#[derive(Debug, Clone, Default)]
pub struct StatsOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Only show this piece.
    pub piece_id: Option<PieceId>,
    /// Compare cached statistics with the activity log.
    pub validate: bool,
    /// Recompute every piece before reporting.
    pub rebuild: bool,
}

/// One piece and its cached statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PieceStatsInfo {
    /// Piece ID.
    pub id: PieceId,
    /// Display name.
    pub name: String,
    /// "piece" or "technique".
    pub item_type: String,
    /// Favorite flag.
    pub is_favorite: bool,
    /// The cached block.
    pub statistics: PieceStatistics,
}

impl From<&PieceOrTechnique> for PieceStatsInfo {
    fn from(piece: &PieceOrTechnique) -> Self {
        Self {
            id: piece.id,
            name: piece.name.clone(),
            item_type: piece.item_type.to_string(),
            is_favorite: piece.is_favorite,
            statistics: piece.stats.clone(),
        }
    }
}

/// Output format for the stats command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsOutput {
    /// Whether stats were loaded successfully.
    pub success: bool,
    /// Per-piece statistics.
    pub pieces: Vec<PieceStatsInfo>,
    /// Pieces recomputed by `--rebuild`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rebuilt: Option<usize>,
    /// Mismatches found by `--validate`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inconsistencies: Option<Vec<String>>,
    /// Error message if stats failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatsOutput {
    /// Create a successful output.
    pub fn success(pieces: Vec<PieceStatsInfo>) -> Self {
        Self {
            success: true,
            pieces,
            rebuilt: None,
            inconsistencies: None,
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            pieces: Vec::new(),
            rebuilt: None,
            inconsistencies: None,
            error: Some(error.into()),
        }
    }
}

/// The stats command implementation.
pub struct StatsCommand<S: PracticeStore> {
    journal: Journal<S>,
    now: DateTime<Utc>,
}

impl<S: PracticeStore> StatsCommand<S> {
    /// Create a new stats command.
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

    /// Run the stats command.
    ///
    /// Validation runs before a rebuild, so `--validate --rebuild` reports
    /// what the rebuild repaired.
    pub fn run(&self, options: &StatsOptions) -> StatsOutput {
        let inconsistencies = if options.validate {
            match self.journal.validate() {
                Ok(result) => Some(result.inconsistencies),
                Err(e) => return StatsOutput::failure(format!("Failed to validate: {}", e)),
            }
        } else {
            None
        };

        let rebuilt = if options.rebuild {
            match self.journal.recompute_all(self.now) {
                Ok(count) => Some(count),
                Err(e) => return StatsOutput::failure(format!("Failed to rebuild: {}", e)),
            }
        } else {
            None
        };

        let mut pieces = self
            .journal
            .store()
            .list_pieces()
            .fail_open_default("Failed to list pieces");

        if let Some(piece_id) = options.piece_id {
            pieces.retain(|p| p.id == piece_id);
            if pieces.is_empty() {
                return StatsOutput::failure(format!("piece not found: {}", piece_id));
            }
        }

        StatsOutput {
            rebuilt,
            inconsistencies,
            ..StatsOutput::success(pieces.iter().map(PieceStatsInfo::from).collect())
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &StatsOutput, options: &StatsOptions) -> String {
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
    fn format_human_readable(&self, output: &StatsOutput) -> String {
        if !output.success {
            return format!(
                "Stats failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        let mut lines = Vec::new();
        lines.push("=== PlayStreak Statistics ===\n".to_string());

        if let Some(inconsistencies) = &output.inconsistencies {
            if inconsistencies.is_empty() {
                lines.push("✓ Cached statistics match the activity log\n".to_string());
            } else {
                lines.push(format!("⚠ {} inconsistencies found", inconsistencies.len()));
                for inconsistency in inconsistencies {
                    lines.push(format!("   - {}", inconsistency));
                }
                lines.push(String::new());
            }
        }

        if let Some(count) = output.rebuilt {
            lines.push(format!("Rebuilt statistics for {} pieces\n", count));
        }

        if output.pieces.is_empty() {
            lines.push("No pieces yet.".to_string());
        }

        for piece in &output.pieces {
            let stats = &piece.statistics;
            let star = if piece.is_favorite { " ⭐" } else { "" };
            lines.push(format!("#{} {} ({}){}", piece.id, piece.name, piece.item_type, star));
            lines.push(format!(
                "   Practices: {} (recent: {})",
                stats.practice_count,
                format_recent(&stats.recent_practices())
            ));
            lines.push(format!(
                "   Performances: {} (recent: {})",
                stats.performance_count,
                format_recent(&stats.recent_performances())
            ));
            lines.push(format!(
                "   Last satisfactory: practice {}, performance {}",
                format_date(stats.last_satisfactory_practice),
                format_date(stats.last_satisfactory_performance)
            ));
            lines.push(String::new());
        }

        lines.join("\n")
    }
}

fn format_recent(dates: &[DateTime<Utc>]) -> String {
    if dates.is_empty() {
        return "none".to_string();
    }
    dates
        .iter()
        .map(|d| format_date(Some(*d)))
        .collect::<Vec<_>>()
        .join(", ")
}
