//! Activity entity: a single logged practice or performance.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PlayStreakError, Result};

/// Identifier of an activity.
pub type ActivityId = u64;

/// Identifier of a piece or technique.
pub type PieceId = u64;

/// Highest level a practice can be rated.
pub const MAX_PRACTICE_LEVEL: u8 = 4;
/// Highest level a performance can be rated.
pub const MAX_PERFORMANCE_LEVEL: u8 = 3;
/// Practices at or above this level count as satisfactory.
pub const SATISFACTORY_PRACTICE_LEVEL: u8 = 4;
/// Performances at or above this level count as satisfactory.
pub const SATISFACTORY_PERFORMANCE_LEVEL: u8 = 3;

/// Kind of activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    /// A practice session.
    Practice,
    /// A performance (online, live, or informal).
    Performance,
}

impl ActivityType {
    /// Get the display name for this activity type.
    pub fn display_name(&self) -> &'static str {
        match self {
            ActivityType::Practice => "practice",
            ActivityType::Performance => "performance",
        }
    }

    /// Highest valid level for this activity type.
    pub fn max_level(&self) -> u8 {
        match self {
            ActivityType::Practice => MAX_PRACTICE_LEVEL,
            ActivityType::Performance => MAX_PERFORMANCE_LEVEL,
        }
    }

    /// Lowest level that counts as satisfactory for this activity type.
    pub fn satisfactory_level(&self) -> u8 {
        match self {
            ActivityType::Practice => SATISFACTORY_PRACTICE_LEVEL,
            ActivityType::Performance => SATISFACTORY_PERFORMANCE_LEVEL,
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ActivityType {
    type Err = PlayStreakError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "practice" => Ok(ActivityType::Practice),
            "performance" => Ok(ActivityType::Performance),
            other => Err(PlayStreakError::invalid_activity(format!(
                "unknown activity type '{}'",
                other
            ))),
        }
    }
}

/// A logged practice or performance against one piece.
///
/// Activities are immutable records: edits replace the whole record and
/// must be followed by a statistics recompute for the affected piece(s).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Activity {
    /// Unique identifier (assigned by the store).
    pub id: ActivityId,
    /// When the activity happened.
    pub timestamp: DateTime<Utc>,
    /// The piece or technique this activity belongs to.
    pub piece_id: PieceId,
    /// Practice or performance.
    pub activity_type: ActivityType,
    /// Self-rated level: practice 1-4, performance 1-3.
    pub level: u8,
    /// Free-text tag such as "online", "live" or "practice".
    #[serde(default)]
    pub performance_type: String,
    /// Duration in minutes. `None` means not recorded.
    #[serde(default)]
    pub minutes: Option<u32>,
    /// Free-form notes.
    #[serde(default)]
    pub notes: String,
}

impl Activity {
    /// Create a new activity with no duration and no notes.
    ///
    /// The id is 0 until the store assigns one.
    pub fn new(
        piece_id: PieceId,
        activity_type: ActivityType,
        level: u8,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let performance_type = match activity_type {
            ActivityType::Practice => "practice",
            ActivityType::Performance => "live",
        };
        Self {
            id: 0,
            timestamp,
            piece_id,
            activity_type,
            level,
            performance_type: performance_type.to_string(),
            minutes: None,
            notes: String::new(),
        }
    }

    /// Shorthand for a practice activity.
    pub fn practice(piece_id: PieceId, level: u8, timestamp: DateTime<Utc>) -> Self {
        Self::new(piece_id, ActivityType::Practice, level, timestamp)
    }

    /// Shorthand for a performance activity.
    pub fn performance(piece_id: PieceId, level: u8, timestamp: DateTime<Utc>) -> Self {
        Self::new(piece_id, ActivityType::Performance, level, timestamp)
    }

    /// Set the activity ID.
    pub fn with_id(mut self, id: ActivityId) -> Self {
        self.id = id;
        self
    }

    /// Set the performance type tag.
    pub fn with_performance_type(mut self, performance_type: impl Into<String>) -> Self {
        self.performance_type = performance_type.into();
        self
    }

    /// Set the recorded duration.
    pub fn with_minutes(mut self, minutes: u32) -> Self {
        self.minutes = Some(minutes);
        self
    }

    /// Set the notes.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Whether this is a practice activity.
    pub fn is_practice(&self) -> bool {
        self.activity_type == ActivityType::Practice
    }

    /// Whether this is a performance activity.
    pub fn is_performance(&self) -> bool {
        self.activity_type == ActivityType::Performance
    }

    /// Whether this activity reached the satisfactory level for its type.
    pub fn is_satisfactory(&self) -> bool {
        self.level >= self.activity_type.satisfactory_level()
    }

    /// Whether the performance type tag matches (case-insensitive).
    pub fn has_performance_type(&self, tag: &str) -> bool {
        self.performance_type.eq_ignore_ascii_case(tag)
    }

    /// Duration in the exported form: `-1` when not recorded.
    pub fn minutes_or_sentinel(&self) -> i64 {
        self.minutes.map(i64::from).unwrap_or(-1)
    }

    /// Check level bounds for the activity type.
    pub fn validate(&self) -> Result<()> {
        let max = self.activity_type.max_level();
        if self.level == 0 || self.level > max {
            return Err(PlayStreakError::invalid_activity(format!(
                "{} level {} out of range 1-{}",
                self.activity_type, self.level, max
            )));
        }
        Ok(())
    }
}
