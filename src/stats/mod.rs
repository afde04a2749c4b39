//! Practice analytics for PlayStreak.
//!
//! Every computation here is a pure function of snapshot inputs and an
//! explicit `now`:
//!
//! - [`aggregator`] rebuilds a piece's cached statistics from its activities.
//! - [`streak`] computes the current streak and historical milestone dates.
//! - [`suggestions`] ranks pieces to practice or perform next.
//! - [`abandoned`] lists non-favorites idle past the staleness window.
//! - [`achievements`] derives back-dated unlocks from history.
//! - [`summary`] totals activity over local calendar days.

pub mod abandoned;
pub mod achievements;
pub mod aggregator;
pub mod streak;
pub mod suggestions;
pub mod summary;

pub use abandoned::{abandoned_pieces, AbandonedPiece};
pub use achievements::{detect_achievements, merge_unlocks};
pub use aggregator::{compute_statistics, recompute, validate_statistics, ValidationResult};
pub use streak::{
    current_streak, current_streak_in, find_streak_milestone_date, find_streak_milestone_date_in,
    longest_streak, longest_streak_in, streak_periods, streak_periods_in, StreakPeriod,
};
pub use suggestions::{
    generate_all_suggestions, generate_performance_suggestions, generate_practice_suggestions,
    SuggestionEngine, SuggestionItem, SuggestionKind, Tier, TierLimits, ABANDONED_AFTER_DAYS,
};
pub use summary::{
    activities_on_days_in, day_range, summarize_in, trailing_days, week_summary, week_summary_in,
    ActivitySummary, WEEK_SUMMARY_DAYS,
};
