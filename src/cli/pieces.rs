//! Piece command for PlayStreak.
//!
//! Adds, lists, favorites and removes pieces and techniques.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cli::{days_or_none, format_days_ago};
use crate::core::{days_since, ItemType, PieceId, PieceOrTechnique, NEVER_ACTIVE};
use crate::error::FailOpen;
use crate::journal::Journal;
use crate::storage::PracticeStore;

/// What the piece command should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PieceAction {
    /// Add a new piece or technique.
    Add {
        name: String,
        item_type: ItemType,
        favorite: bool,
    },
    /// List tracked items.
    List {
        favorites_only: bool,
        item_type: Option<ItemType>,
    },
    /// Set or clear the favorite flag.
    Favorite { piece_id: PieceId, favorite: bool },
    /// Remove an item and its activities.
    Remove { piece_id: PieceId },
}

impl Default for PieceAction {
    fn default() -> Self {
        PieceAction::List {
            favorites_only: false,
            item_type: None,
        }
    }
}

impl PieceAction {
    fn name(&self) -> &'static str {
        match self {
            PieceAction::Add { .. } => "add",
            PieceAction::List { .. } => "list",
            PieceAction::Favorite { .. } => "favorite",
            PieceAction::Remove { .. } => "remove",
        }
    }
}

/// Options for the piece command.
#[derive(Debug, Clone, Default)]
pub struct PieceOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Action to run.
    pub action: PieceAction,
}

/// Simplified piece info for output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PieceInfo {
    /// Piece ID.
    pub id: PieceId,
    /// Display name.
    pub name: String,
    /// "piece" or "technique".
    pub item_type: String,
    /// Favorite flag.
    pub is_favorite: bool,
    /// Cached practice count.
    pub practice_count: u32,
    /// Cached performance count.
    pub performance_count: u32,
    /// Most recent activity of either type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<DateTime<Utc>>,
    /// Whole days since the last activity, absent when never active.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_since_last_activity: Option<i64>,
}

impl PieceInfo {
    /// Create from a piece and its cached statistics.
    pub fn from_piece(piece: &PieceOrTechnique, now: DateTime<Utc>) -> Self {
        let last = piece.stats.last_activity_date();
        Self {
            id: piece.id,
            name: piece.name.clone(),
            item_type: piece.item_type.to_string(),
            is_favorite: piece.is_favorite,
            practice_count: piece.stats.practice_count,
            performance_count: piece.stats.performance_count,
            last_activity: last,
            days_since_last_activity: days_or_none(days_since(last, now)),
        }
    }
}

/// Output format for the piece command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PieceOutput {
    /// Whether the command succeeded.
    pub success: bool,
    /// Which action ran.
    pub action: String,
    /// Number of pieces in `pieces`.
    pub count: usize,
    /// Affected or listed pieces.
    pub pieces: Vec<PieceInfo>,
    /// Activities deleted along with a removed piece.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed_activities: Option<usize>,
    /// Error message if the command failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PieceOutput {
    /// Create a successful output.
    pub fn success(action: &str, pieces: Vec<PieceInfo>) -> Self {
        Self {
            success: true,
            action: action.to_string(),
            count: pieces.len(),
            pieces,
            removed_activities: None,
            error: None,
        }
    }

    /// Create a successful removal output.
    pub fn removed(removed_activities: usize) -> Self {
        Self {
            removed_activities: Some(removed_activities),
            ..Self::success("remove", Vec::new())
        }
    }

    /// Create a failed output.
    pub fn failure(action: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            action: action.to_string(),
            count: 0,
            pieces: Vec::new(),
            removed_activities: None,
            error: Some(error.into()),
        }
    }
}

/// The piece command implementation.
pub struct PieceCommand<S: PracticeStore> {
    journal: Journal<S>,
    now: DateTime<Utc>,
}

impl<S: PracticeStore> PieceCommand<S> {
    /// Create a new piece command.
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

    /// Run the piece command.
    pub fn run(&self, options: &PieceOptions) -> PieceOutput {
        let action = options.action.name();

        match &options.action {
            PieceAction::Add {
                name,
                item_type,
                favorite,
            } => match self.journal.add_piece(name, *item_type, *favorite, self.now) {
                Ok(piece) => PieceOutput::success(action, vec![PieceInfo::from_piece(&piece, self.now)]),
                Err(e) => PieceOutput::failure(action, e.to_string()),
            },
            PieceAction::List {
                favorites_only,
                item_type,
            } => {
                let mut pieces = self
                    .journal
                    .store()
                    .list_pieces()
                    .fail_open_default("Failed to list pieces");

                pieces.retain(|p| !*favorites_only || p.is_favorite);
                if let Some(item_type) = item_type {
                    pieces.retain(|p| p.item_type == *item_type);
                }
                pieces.sort_by_key(|p| p.sort_name());

                let infos = pieces
                    .iter()
                    .map(|p| PieceInfo::from_piece(p, self.now))
                    .collect();
                PieceOutput::success(action, infos)
            }
            PieceAction::Favorite { piece_id, favorite } => {
                match self.journal.set_favorite(*piece_id, *favorite) {
                    Ok(piece) => {
                        PieceOutput::success(action, vec![PieceInfo::from_piece(&piece, self.now)])
                    }
                    Err(e) => PieceOutput::failure(action, e.to_string()),
                }
            }
            PieceAction::Remove { piece_id } => match self.journal.delete_piece(*piece_id) {
                Ok(removed) => PieceOutput::removed(removed),
                Err(e) => PieceOutput::failure(action, e.to_string()),
            },
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &PieceOutput, options: &PieceOptions) -> String {
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
    fn format_human_readable(&self, output: &PieceOutput) -> String {
        if !output.success {
            return format!(
                "Piece {} failed: {}\n",
                output.action,
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        match output.action.as_str() {
            "add" => output
                .pieces
                .first()
                .map(|p| format!("Added {} #{}: {}", p.item_type, p.id, p.name))
                .unwrap_or_default(),
            "favorite" => output
                .pieces
                .first()
                .map(|p| {
                    if p.is_favorite {
                        format!("⭐ #{} {} is now a favorite", p.id, p.name)
                    } else {
                        format!("#{} {} is no longer a favorite", p.id, p.name)
                    }
                })
                .unwrap_or_default(),
            "remove" => format!(
                "Removed piece and {} activit{}",
                output.removed_activities.unwrap_or(0),
                if output.removed_activities == Some(1) { "y" } else { "ies" }
            ),
            _ => {
                if output.pieces.is_empty() {
                    return "No pieces yet. Add one with 'playstreak piece add <name>'.".to_string();
                }

                let mut lines = Vec::new();
                lines.push(format!("=== Pieces ({}) ===\n", output.count));
                for piece in &output.pieces {
                    let star = if piece.is_favorite { "⭐ " } else { "" };
                    let days = piece.days_since_last_activity.unwrap_or(NEVER_ACTIVE);
                    lines.push(format!(
                        "{}#{} {} ({}) - {} practices, {} performances, last {}",
                        star,
                        piece.id,
                        piece.name,
                        piece.item_type,
                        piece.practice_count,
                        piece.performance_count,
                        format_days_ago(days)
                    ));
                }
                lines.join("\n")
            }
        }
    }
}
