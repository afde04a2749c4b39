//! Retroactive achievement detection.
//!
//! Every unlock is derived from history and back-dated: first-action
//! achievements to the earliest matching piece or activity, streak
//! achievements to the day the milestone was first reached.

use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};

use crate::core::{
    Activity, AchievementKind, ItemType, PieceOrTechnique, UnlockedAchievement,
};
use crate::stats::streak::find_streak_milestone_date_in;

/// Every achievement the history supports, in [`AchievementKind::all`] order.
pub fn detect_achievements<Tz: TimeZone>(
    pieces: &[PieceOrTechnique],
    activities: &[Activity],
    tz: &Tz,
) -> Vec<UnlockedAchievement> {
    let earliest_created = |item_type: ItemType| {
        pieces
            .iter()
            .filter(|p| p.item_type == item_type)
            .map(|p| p.date_created)
            .min()
    };

    let mut unlocked = Vec::new();
    for &kind in AchievementKind::all() {
        let date = match kind {
            AchievementKind::FirstPiece => earliest_created(ItemType::Piece),
            AchievementKind::FirstTechnique => earliest_created(ItemType::Technique),
            AchievementKind::FirstPractice => earliest_activity(activities, |a| a.is_practice()),
            AchievementKind::FirstPerformance => earliest_activity(activities, |a| a.is_performance()),
            AchievementKind::FirstOnlinePerformance => {
                earliest_activity(activities, |a| {
                    a.is_performance() && a.has_performance_type("online")
                })
            }
            AchievementKind::FirstLivePerformance => {
                earliest_activity(activities, |a| {
                    a.is_performance() && a.has_performance_type("live")
                })
            }
            streak => streak.streak_days().and_then(|days| {
                find_streak_milestone_date_in(activities, i64::from(days), tz)
            }),
        };

        if let Some(unlocked_at) = date {
            unlocked.push(UnlockedAchievement::new(kind, unlocked_at));
        }
    }

    tracing::debug!(count = unlocked.len(), "detected achievements from history");
    unlocked
}

fn earliest_activity(
    activities: &[Activity],
    matches: impl Fn(&Activity) -> bool,
) -> Option<DateTime<Utc>> {
    activities
        .iter()
        .filter(|a| matches(a))
        .map(|a| a.timestamp)
        .min()
}

/// Merge detected unlocks into stored ones.
///
/// Stored unlock dates never move. Returns the merged list (sorted by
/// unlock date, then kind) and the unlocks that were not stored before.
pub fn merge_unlocks(
    stored: &[UnlockedAchievement],
    detected: &[UnlockedAchievement],
) -> (Vec<UnlockedAchievement>, Vec<UnlockedAchievement>) {
    let mut by_kind: HashMap<AchievementKind, DateTime<Utc>> =
        stored.iter().map(|a| (a.kind, a.unlocked_at)).collect();

    let mut newly = Vec::new();
    for unlock in detected {
        if !by_kind.contains_key(&unlock.kind) {
            by_kind.insert(unlock.kind, unlock.unlocked_at);
            newly.push(unlock.clone());
        }
    }

    let mut merged: Vec<UnlockedAchievement> = by_kind
        .into_iter()
        .map(|(kind, at)| UnlockedAchievement::new(kind, at))
        .collect();
    merged.sort_by_key(|a| (a.unlocked_at, a.kind));

    (merged, newly)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, 10, 0, 0).unwrap()
    }

    fn midnight(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, 0, 0, 0).unwrap()
    }

    fn kinds(unlocks: &[UnlockedAchievement]) -> Vec<AchievementKind> {
        unlocks.iter().map(|a| a.kind).collect()
    }

    #[test]
    fn test_nothing_on_empty_history() {
        assert!(detect_achievements(&[], &[], &Utc).is_empty());
    }

    #[test]
    fn test_first_actions_use_earliest_dates() {
        let pieces = vec![
            PieceOrTechnique::piece("Later", day(5)).with_id(1),
            PieceOrTechnique::piece("Earlier", day(2)).with_id(2),
            PieceOrTechnique::technique("Scales", day(7)).with_id(3),
        ];
        let activities = vec![
            Activity::practice(1, 2, day(9)),
            Activity::practice(2, 2, day(6)),
            Activity::performance(1, 3, day(10)).with_performance_type("Online"),
            Activity::performance(1, 2, day(8)).with_performance_type("casual"),
        ];

        let unlocks = detect_achievements(&pieces, &activities, &Utc);
        let find = |kind| unlocks.iter().find(|a| a.kind == kind).map(|a| a.unlocked_at);

        assert_eq!(find(AchievementKind::FirstPiece), Some(day(2)));
        assert_eq!(find(AchievementKind::FirstTechnique), Some(day(7)));
        assert_eq!(find(AchievementKind::FirstPractice), Some(day(6)));
        assert_eq!(find(AchievementKind::FirstPerformance), Some(day(8)));
        assert_eq!(find(AchievementKind::FirstOnlinePerformance), Some(day(10)));
        assert_eq!(find(AchievementKind::FirstLivePerformance), None);
    }

    #[test]
    fn test_streak_milestones_back_dated() {
        let activities: Vec<Activity> = (1..=9)
            .map(|d| Activity::practice(1, 3, day(d)))
            .collect();

        let unlocks = detect_achievements(&[], &activities, &Utc);

        assert_eq!(
            kinds(&unlocks),
            vec![
                AchievementKind::FirstPractice,
                AchievementKind::Streak3Days,
                AchievementKind::Streak5Days,
                AchievementKind::Streak8Days,
            ]
        );
        assert_eq!(unlocks[1].unlocked_at, midnight(3));
        assert_eq!(unlocks[3].unlocked_at, midnight(8));
    }

    #[test]
    fn test_merge_keeps_stored_dates() {
        let stored = vec![UnlockedAchievement::new(
            AchievementKind::FirstPractice,
            day(20),
        )];
        let detected = vec![
            UnlockedAchievement::new(AchievementKind::FirstPractice, day(1)),
            UnlockedAchievement::new(AchievementKind::Streak3Days, day(3)),
        ];

        let (merged, newly) = merge_unlocks(&stored, &detected);

        assert_eq!(kinds(&newly), vec![AchievementKind::Streak3Days]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].kind, AchievementKind::Streak3Days);
        assert_eq!(merged[1].unlocked_at, day(20));
    }

    #[test]
    fn test_merge_is_stable_on_repeat() {
        let activities: Vec<Activity> = (1..=4)
            .map(|d| Activity::practice(1, 3, day(d) + Duration::hours(1)))
            .collect();
        let detected = detect_achievements(&[], &activities, &Utc);

        let (first, newly) = merge_unlocks(&[], &detected);
        assert_eq!(newly.len(), 2);

        let (second, newly) = merge_unlocks(&first, &detected);
        assert!(newly.is_empty());
        assert_eq!(first, second);
    }
}
