//! Achievement definitions.
//!
//! Achievements are either "first action" unlocks (first piece, first
//! performance, ...) or streak milestones. Only the unlock record is
//! persisted; titles and icons come from the definitions here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Every achievement the app knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AchievementKind {
    FirstPiece,
    FirstTechnique,
    FirstPractice,
    FirstPerformance,
    FirstOnlinePerformance,
    FirstLivePerformance,
    #[serde(rename = "STREAK_3_DAYS")]
    Streak3Days,
    #[serde(rename = "STREAK_5_DAYS")]
    Streak5Days,
    #[serde(rename = "STREAK_8_DAYS")]
    Streak8Days,
    #[serde(rename = "STREAK_14_DAYS")]
    Streak14Days,
    #[serde(rename = "STREAK_30_DAYS")]
    Streak30Days,
    #[serde(rename = "STREAK_61_DAYS")]
    Streak61Days,
    #[serde(rename = "STREAK_100_DAYS")]
    Streak100Days,
}

/// Grouping used when reporting unlocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementCategory {
    FirstAction,
    StreakMilestone,
}

impl AchievementKind {
    /// Get all achievement variants in display order.
    pub fn all() -> &'static [AchievementKind] {
        &[
            AchievementKind::FirstPiece,
            AchievementKind::FirstTechnique,
            AchievementKind::FirstPractice,
            AchievementKind::FirstPerformance,
            AchievementKind::FirstOnlinePerformance,
            AchievementKind::FirstLivePerformance,
            AchievementKind::Streak3Days,
            AchievementKind::Streak5Days,
            AchievementKind::Streak8Days,
            AchievementKind::Streak14Days,
            AchievementKind::Streak30Days,
            AchievementKind::Streak61Days,
            AchievementKind::Streak100Days,
        ]
    }

    /// Streak achievements paired with the number of days they require.
    pub fn streak_milestones() -> &'static [(AchievementKind, u32)] {
        &[
            (AchievementKind::Streak3Days, 3),
            (AchievementKind::Streak5Days, 5),
            (AchievementKind::Streak8Days, 8),
            (AchievementKind::Streak14Days, 14),
            (AchievementKind::Streak30Days, 30),
            (AchievementKind::Streak61Days, 61),
            (AchievementKind::Streak100Days, 100),
        ]
    }

    /// Days required for a streak achievement, `None` for first-action ones.
    pub fn streak_days(&self) -> Option<u32> {
        Self::streak_milestones()
            .iter()
            .find(|(kind, _)| kind == self)
            .map(|(_, days)| *days)
    }

    /// Category of this achievement.
    pub fn category(&self) -> AchievementCategory {
        if self.streak_days().is_some() {
            AchievementCategory::StreakMilestone
        } else {
            AchievementCategory::FirstAction
        }
    }

    /// Short title.
    pub fn title(&self) -> &'static str {
        match self {
            AchievementKind::FirstPiece => "First Steps",
            AchievementKind::FirstTechnique => "Skill Builder",
            AchievementKind::FirstPractice => "Practice Makes Perfect",
            AchievementKind::FirstPerformance => "Debut Performance",
            AchievementKind::FirstOnlinePerformance => "Digital Debut",
            AchievementKind::FirstLivePerformance => "Stage Presence",
            AchievementKind::Streak3Days => "Getting Started",
            AchievementKind::Streak5Days => "Building Momentum",
            AchievementKind::Streak8Days => "Consistency Counts",
            AchievementKind::Streak14Days => "Two Week Warrior",
            AchievementKind::Streak30Days => "Monthly Master",
            AchievementKind::Streak61Days => "Diamond Dedication",
            AchievementKind::Streak100Days => "Elite Performer",
        }
    }

    /// One-line description.
    pub fn description(&self) -> String {
        match self {
            AchievementKind::FirstPiece => "Added your first piece".to_string(),
            AchievementKind::FirstTechnique => "Added your first technique".to_string(),
            AchievementKind::FirstPractice => "Completed your first practice session".to_string(),
            AchievementKind::FirstPerformance => "Completed your first performance".to_string(),
            AchievementKind::FirstOnlinePerformance => {
                "Completed your first online performance".to_string()
            }
            AchievementKind::FirstLivePerformance => {
                "Completed your first live performance".to_string()
            }
            streak => {
                let days = streak.streak_days().unwrap_or_default();
                let article = if days == 8 { "an" } else { "a" };
                format!("Maintained {} {}-day practice streak", article, days)
            }
        }
    }

    /// Display icon.
    pub fn icon(&self) -> &'static str {
        match self {
            AchievementKind::FirstPiece => "🎹",
            AchievementKind::FirstTechnique => "🛠️",
            AchievementKind::FirstPractice => "💪",
            AchievementKind::FirstPerformance => "🎭",
            AchievementKind::FirstOnlinePerformance => "💻",
            AchievementKind::FirstLivePerformance => "🎤",
            AchievementKind::Streak3Days => "🎵",
            AchievementKind::Streak5Days => "🎶",
            AchievementKind::Streak8Days => "🔥",
            AchievementKind::Streak14Days => "🔥🔥🔥",
            AchievementKind::Streak30Days => "⭐⭐⭐",
            AchievementKind::Streak61Days => "💎💎💎",
            AchievementKind::Streak100Days => "🚀🚀🚀",
        }
    }
}

/// A persisted unlock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnlockedAchievement {
    /// Which achievement.
    pub kind: AchievementKind,
    /// When it was earned (back-dated for retroactive unlocks).
    pub unlocked_at: DateTime<Utc>,
}

impl UnlockedAchievement {
    /// Create a new unlock record.
    pub fn new(kind: AchievementKind, unlocked_at: DateTime<Utc>) -> Self {
        Self { kind, unlocked_at }
    }
}
