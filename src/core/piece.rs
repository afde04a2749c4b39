//! Piece and technique entities with their cached statistics block.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::activity::{ActivityType, PieceId};
use crate::error::{PlayStreakError, Result};

/// Whether an item is a playable piece or a technique exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    /// A musical work.
    Piece,
    /// A technique exercise (scales, arpeggios, ...).
    Technique,
}

impl ItemType {
    /// Get the display name for this item type.
    pub fn display_name(&self) -> &'static str {
        match self {
            ItemType::Piece => "piece",
            ItemType::Technique => "technique",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ItemType {
    type Err = PlayStreakError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "piece" => Ok(ItemType::Piece),
            "technique" => Ok(ItemType::Technique),
            other => Err(PlayStreakError::config(format!(
                "unknown item type '{}'",
                other
            ))),
        }
    }
}

/// Cached statistics for one piece.
///
/// This is a materialized view over the piece's activities. It is only
/// accurate right after [`crate::stats::recompute`] ran for the piece.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PieceStatistics {
    /// Number of practice activities.
    pub practice_count: u32,
    /// Number of performance activities.
    pub performance_count: u32,
    /// Most recent practice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_practice_date: Option<DateTime<Utc>>,
    /// Second most recent practice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second_last_practice_date: Option<DateTime<Utc>>,
    /// Third most recent practice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub third_last_practice_date: Option<DateTime<Utc>>,
    /// Most recent performance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_performance_date: Option<DateTime<Utc>>,
    /// Second most recent performance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second_last_performance_date: Option<DateTime<Utc>>,
    /// Third most recent performance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub third_last_performance_date: Option<DateTime<Utc>>,
    /// Most recent practice at the satisfactory level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_satisfactory_practice: Option<DateTime<Utc>>,
    /// Most recent performance at the satisfactory level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_satisfactory_performance: Option<DateTime<Utc>>,
    /// When the block was last recomputed.
    #[serde(default)]
    pub last_updated: DateTime<Utc>,
}

impl PieceStatistics {
    /// The most recent activity of either type and which type it was.
    ///
    /// A practice and a performance at the same instant resolve to the
    /// performance.
    pub fn last_activity(&self) -> Option<(DateTime<Utc>, ActivityType)> {
        match (self.last_practice_date, self.last_performance_date) {
            (Some(practice), Some(performance)) => {
                if practice > performance {
                    Some((practice, ActivityType::Practice))
                } else {
                    Some((performance, ActivityType::Performance))
                }
            }
            (Some(practice), None) => Some((practice, ActivityType::Practice)),
            (None, Some(performance)) => Some((performance, ActivityType::Performance)),
            (None, None) => None,
        }
    }

    /// The most recent activity date of either type.
    pub fn last_activity_date(&self) -> Option<DateTime<Utc>> {
        self.last_activity().map(|(ts, _)| ts)
    }

    /// The three most recent practice dates, newest first, missing ones skipped.
    pub fn recent_practices(&self) -> Vec<DateTime<Utc>> {
        [
            self.last_practice_date,
            self.second_last_practice_date,
            self.third_last_practice_date,
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// The three most recent performance dates, newest first, missing ones skipped.
    pub fn recent_performances(&self) -> Vec<DateTime<Utc>> {
        [
            self.last_performance_date,
            self.second_last_performance_date,
            self.third_last_performance_date,
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// A tracked piece or technique.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PieceOrTechnique {
    /// Unique identifier (assigned by the store).
    pub id: PieceId,
    /// Display name.
    pub name: String,
    /// Piece or technique.
    #[serde(rename = "type")]
    pub item_type: ItemType,
    /// Whether the user marked this item as a favorite.
    #[serde(default)]
    pub is_favorite: bool,
    /// When the item was added.
    pub date_created: DateTime<Utc>,
    /// Cached statistics, recomputed after every activity mutation.
    #[serde(flatten)]
    pub stats: PieceStatistics,
}

impl PieceOrTechnique {
    /// Create a new item with zeroed statistics.
    ///
    /// The id is 0 until the store assigns one.
    pub fn new(name: impl Into<String>, item_type: ItemType, date_created: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            item_type,
            is_favorite: false,
            date_created,
            stats: PieceStatistics {
                last_updated: date_created,
                ..PieceStatistics::default()
            },
        }
    }

    /// Shorthand for a new piece.
    pub fn piece(name: impl Into<String>, date_created: DateTime<Utc>) -> Self {
        Self::new(name, ItemType::Piece, date_created)
    }

    /// Shorthand for a new technique.
    pub fn technique(name: impl Into<String>, date_created: DateTime<Utc>) -> Self {
        Self::new(name, ItemType::Technique, date_created)
    }

    /// Set the ID.
    pub fn with_id(mut self, id: PieceId) -> Self {
        self.id = id;
        self
    }

    /// Set the favorite flag.
    pub fn with_favorite(mut self, is_favorite: bool) -> Self {
        self.is_favorite = is_favorite;
        self
    }

    /// Replace the cached statistics block.
    pub fn with_statistics(mut self, stats: PieceStatistics) -> Self {
        self.stats = stats;
        self
    }

    /// Whether this item is a piece (techniques are never suggested).
    pub fn is_piece(&self) -> bool {
        self.item_type == ItemType::Piece
    }

    /// Lowercased name used for alphabetical tie-breaks.
    pub fn sort_name(&self) -> String {
        self.name.to_lowercase()
    }
}
