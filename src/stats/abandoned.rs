//! Abandoned pieces: non-favorites idle past the staleness window.
//!
//! Shares [`ABANDONED_AFTER_DAYS`] with the suggestion engine, so a
//! non-favorite piece is either recent (under 7 days), stale (7 days up to
//! but excluding 31), or abandoned (31 days or more, or never active).

use std::cmp::Reverse;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::core::time::days_since;
use crate::core::PieceOrTechnique;
use crate::stats::suggestions::ABANDONED_AFTER_DAYS;

/// A non-favorite piece that has gone quiet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbandonedPiece {
    pub piece: PieceOrTechnique,
    pub last_activity_date: Option<DateTime<Utc>>,
    pub days_since_last_activity: i64,
}

/// Non-favorite pieces idle at least [`ABANDONED_AFTER_DAYS`] days or never
/// active.
///
/// Pieces with history come first, most recently abandoned first; never
/// active pieces follow alphabetically.
pub fn abandoned_pieces(pieces: &[PieceOrTechnique], now: DateTime<Utc>) -> Vec<AbandonedPiece> {
    let cutoff = now - Duration::days(ABANDONED_AFTER_DAYS);

    let mut result: Vec<AbandonedPiece> = pieces
        .iter()
        .filter(|p| p.is_piece() && !p.is_favorite)
        .filter_map(|piece| {
            let last = piece.stats.last_activity_date();
            if last.is_some_and(|d| d > cutoff) {
                return None;
            }
            Some(AbandonedPiece {
                piece: piece.clone(),
                last_activity_date: last,
                days_since_last_activity: days_since(last, now),
            })
        })
        .collect();

    result.sort_by_key(|a| {
        (
            a.last_activity_date.is_none(),
            Reverse(a.last_activity_date),
            a.piece.sort_name(),
        )
    });
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PieceStatistics, NEVER_ACTIVE};
    use crate::stats::suggestions::{SuggestionEngine, TierLimits};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn idle(id: u64, name: &str, days: Option<i64>) -> PieceOrTechnique {
        PieceOrTechnique::piece(name, now() - Duration::days(500))
            .with_id(id)
            .with_statistics(PieceStatistics {
                last_practice_date: days.map(|d| now() - Duration::days(d) - Duration::hours(12)),
                ..PieceStatistics::default()
            })
    }

    #[test]
    fn test_threshold() {
        let pieces = vec![
            idle(1, "Thirty", Some(30)),
            idle(2, "ThirtyOne", Some(31)),
        ];

        let abandoned = abandoned_pieces(&pieces, now());

        assert_eq!(abandoned.len(), 1);
        assert_eq!(abandoned[0].piece.id, 2);
        assert_eq!(abandoned[0].days_since_last_activity, 31);
    }

    #[test]
    fn test_exactly_thirty_one_days_is_abandoned() {
        let exactly = |id: u64, name: &str, age: Duration| {
            PieceOrTechnique::piece(name, now() - Duration::days(500))
                .with_id(id)
                .with_statistics(PieceStatistics {
                    last_practice_date: Some(now() - age),
                    ..PieceStatistics::default()
                })
        };
        let pieces = vec![
            exactly(1, "Exactly Thirty-One", Duration::days(31)),
            exactly(2, "Just Under", Duration::days(31) - Duration::minutes(1)),
            exactly(3, "Exactly Seven", Duration::days(7)),
        ];

        let abandoned: Vec<u64> = abandoned_pieces(&pieces, now())
            .into_iter()
            .map(|a| a.piece.id)
            .collect();
        let suggested: Vec<u64> = SuggestionEngine::with_timezone(
            TierLimits {
                non_favorite_cap: 3,
                ..TierLimits::free()
            },
            now(),
            &Utc,
        )
        .practice_suggestions(&pieces[1..])
        .into_iter()
        .map(|s| s.piece.id)
        .collect();

        // 31 days is abandoned; just under 31 and exactly 7 are stale
        assert_eq!(abandoned, vec![1]);
        assert_eq!(suggested, vec![2, 3]);
    }

    #[test]
    fn test_ordering() {
        let pieces = vec![
            idle(1, "zebra", None),
            idle(2, "Old", Some(200)),
            idle(3, "Apple", None),
            idle(4, "Newer", Some(45)),
        ];

        let abandoned = abandoned_pieces(&pieces, now());
        let ids: Vec<u64> = abandoned.iter().map(|a| a.piece.id).collect();

        assert_eq!(ids, vec![4, 2, 3, 1]);
        assert_eq!(abandoned[2].days_since_last_activity, NEVER_ACTIVE);
    }

    #[test]
    fn test_favorites_and_techniques_excluded() {
        let pieces = vec![
            idle(1, "Fav", None).with_favorite(true),
            PieceOrTechnique::technique("Scales", now()).with_id(2),
        ];
        assert!(abandoned_pieces(&pieces, now()).is_empty());
    }

    #[test]
    fn test_disjoint_from_staleness_window() {
        let pieces: Vec<PieceOrTechnique> = (0..60)
            .map(|d| idle(d as u64 + 1, &format!("P{d}"), Some(d)))
            .collect();
        let limits = TierLimits {
            non_favorite_cap: 100,
            ..TierLimits::free()
        };

        let stale: Vec<u64> = SuggestionEngine::with_timezone(limits, now(), &Utc)
            .practice_suggestions(&pieces)
            .into_iter()
            .filter(|s| (7..31).contains(&s.days_since_last_activity))
            .map(|s| s.piece.id)
            .collect();
        let abandoned: Vec<u64> = abandoned_pieces(&pieces, now())
            .into_iter()
            .map(|a| a.piece.id)
            .collect();

        assert_eq!(stale.len(), 24);
        assert!(stale.iter().all(|id| !abandoned.contains(id)));
        assert_eq!(abandoned.len(), 29);
    }
}
