//! Core types for PlayStreak.
//!
//! This module contains the data model shared by the analytics core and the
//! storage layer: activities, pieces with their cached statistics block,
//! achievement definitions, and calendar helpers.

pub mod achievement;
pub mod activity;
pub mod piece;
pub mod time;

pub use achievement::{AchievementCategory, AchievementKind, UnlockedAchievement};
pub use activity::{
    Activity, ActivityId, ActivityType, PieceId, MAX_PERFORMANCE_LEVEL, MAX_PRACTICE_LEVEL,
    SATISFACTORY_PERFORMANCE_LEVEL, SATISFACTORY_PRACTICE_LEVEL,
};
pub use piece::{ItemType, PieceOrTechnique, PieceStatistics};
pub use time::{days_since, local_date, start_of_day, start_of_today, NEVER_ACTIVE};
