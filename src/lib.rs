//! PlayStreak - practice and performance tracking for musicians
//!
//! PlayStreak records practice sessions and performances against a library
//! of pieces and techniques. From that history it keeps per-piece statistics,
//! suggests what to practice or perform next, tracks daily streaks and
//! unlocks achievements.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod journal;
pub mod stats;
pub mod storage;

pub use config::Config;
pub use core::{
    AchievementCategory, AchievementKind, Activity, ActivityId, ActivityType, ItemType, PieceId,
    PieceOrTechnique, PieceStatistics, UnlockedAchievement,
};
pub use error::{PlayStreakError, Result};
pub use journal::{AchievementSync, Journal};
pub use stats::{
    abandoned_pieces, compute_statistics, current_streak, detect_achievements,
    find_streak_milestone_date, generate_all_suggestions, longest_streak, week_summary,
    AbandonedPiece, ActivitySummary, StreakPeriod, SuggestionEngine, SuggestionItem,
    SuggestionKind, Tier, TierLimits,
};
pub use storage::{FileStore, MemoryStore, PracticeStore};

// CLI commands
pub use cli::{
    AchievementsCommand, ActivityCommand, HistoryCommand, PieceCommand, StatsCommand,
    StreakCommand, SuggestCommand,
};
