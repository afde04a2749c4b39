//! Per-piece statistics aggregation.
//!
//! The cached statistics block on a piece is a materialized view over that
//! piece's activities. It is always rebuilt from scratch: counts, the three
//! most recent dates per activity type, and the most recent satisfactory
//! practice and performance. Rebuilding (instead of patching) keeps the
//! result identical no matter how the activity subset was edited, reordered
//! or trimmed.

use chrono::{DateTime, Utc};

use crate::core::{Activity, ActivityType, PieceId, PieceOrTechnique, PieceStatistics};

/// Compute a fresh statistics block for `piece_id`.
///
/// Activities belonging to other pieces are ignored, so the full activity
/// log can be passed as well as a pre-filtered subset.
pub fn compute_statistics(
    piece_id: PieceId,
    activities: &[Activity],
    now: DateTime<Utc>,
) -> PieceStatistics {
    let mut practices: Vec<&Activity> = Vec::new();
    let mut performances: Vec<&Activity> = Vec::new();

    for activity in activities.iter().filter(|a| a.piece_id == piece_id) {
        match activity.activity_type {
            ActivityType::Practice => practices.push(activity),
            ActivityType::Performance => performances.push(activity),
        }
    }

    // Newest first
    practices.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    performances.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let nth = |list: &[&Activity], n: usize| list.get(n).map(|a| a.timestamp);
    let last_satisfactory =
        |list: &[&Activity]| list.iter().find(|a| a.is_satisfactory()).map(|a| a.timestamp);

    PieceStatistics {
        practice_count: practices.len() as u32,
        performance_count: performances.len() as u32,
        last_practice_date: nth(&practices, 0),
        second_last_practice_date: nth(&practices, 1),
        third_last_practice_date: nth(&practices, 2),
        last_performance_date: nth(&performances, 0),
        second_last_performance_date: nth(&performances, 1),
        third_last_performance_date: nth(&performances, 2),
        last_satisfactory_practice: last_satisfactory(&practices),
        last_satisfactory_performance: last_satisfactory(&performances),
        last_updated: now,
    }
}

/// Return a copy of `piece` with its statistics rebuilt from `activities`.
///
/// The input piece is never mutated; the caller persists the result.
pub fn recompute(
    piece: &PieceOrTechnique,
    activities: &[Activity],
    now: DateTime<Utc>,
) -> PieceOrTechnique {
    let stats = compute_statistics(piece.id, activities, now);
    tracing::debug!(
        piece_id = piece.id,
        practices = stats.practice_count,
        performances = stats.performance_count,
        "recomputed piece statistics"
    );
    piece.clone().with_statistics(stats)
}

/// Outcome of comparing cached statistics with the activity log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    /// Human-readable descriptions of every mismatch found.
    pub inconsistencies: Vec<String>,
}

impl ValidationResult {
    /// Whether every cached block matched.
    pub fn is_valid(&self) -> bool {
        self.inconsistencies.is_empty()
    }
}

/// Compare every piece's cached statistics with a fresh computation.
///
/// `last_updated` is not compared.
pub fn validate_statistics(
    pieces: &[PieceOrTechnique],
    activities: &[Activity],
) -> ValidationResult {
    let mut inconsistencies = Vec::new();

    for piece in pieces {
        let stored = &piece.stats;
        let actual = compute_statistics(piece.id, activities, stored.last_updated);

        let mut check = |field: &str, stored: String, actual: String| {
            if stored != actual {
                inconsistencies.push(format!(
                    "Piece '{}': {} mismatch (stored: {}, actual: {})",
                    piece.name, field, stored, actual
                ));
            }
        };

        check(
            "practice count",
            stored.practice_count.to_string(),
            actual.practice_count.to_string(),
        );
        check(
            "performance count",
            stored.performance_count.to_string(),
            actual.performance_count.to_string(),
        );

        let dates = [
            (
                "last practice date",
                stored.last_practice_date,
                actual.last_practice_date,
            ),
            (
                "second last practice date",
                stored.second_last_practice_date,
                actual.second_last_practice_date,
            ),
            (
                "third last practice date",
                stored.third_last_practice_date,
                actual.third_last_practice_date,
            ),
            (
                "last performance date",
                stored.last_performance_date,
                actual.last_performance_date,
            ),
            (
                "second last performance date",
                stored.second_last_performance_date,
                actual.second_last_performance_date,
            ),
            (
                "third last performance date",
                stored.third_last_performance_date,
                actual.third_last_performance_date,
            ),
            (
                "last satisfactory practice",
                stored.last_satisfactory_practice,
                actual.last_satisfactory_practice,
            ),
            (
                "last satisfactory performance",
                stored.last_satisfactory_performance,
                actual.last_satisfactory_performance,
            ),
        ];
        for (field, stored, actual) in dates {
            check(field, format_date(stored), format_date(actual));
        }
    }

    if !inconsistencies.is_empty() {
        tracing::warn!(
            "found {} piece statistics inconsistencies",
            inconsistencies.len()
        );
    }

    ValidationResult { inconsistencies }
}

fn format_date(date: Option<DateTime<Utc>>) -> String {
    date.map(|d| d.to_rfc3339())
        .unwrap_or_else(|| "none".to_string())
}
