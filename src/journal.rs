//! The practice journal: storage plus the bookkeeping the analytics need.
//!
//! Every activity mutation is paired with a statistics recompute for the
//! piece(s) it touches. Writes go through a journal-wide lock so two
//! writers never interleave a recompute for the same piece.

use std::sync::Mutex;

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::Serialize;

use crate::core::{
    Activity, ActivityId, ItemType, PieceId, PieceOrTechnique, UnlockedAchievement,
};
use crate::error::{PlayStreakError, Result};
use crate::stats::{
    abandoned_pieces, current_streak_in, detect_achievements, merge_unlocks, recompute,
    validate_statistics, AbandonedPiece, SuggestionEngine, SuggestionItem, TierLimits,
    ValidationResult,
};
use crate::storage::PracticeStore;

/// Result of reconciling stored achievements with history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AchievementSync {
    /// Every stored unlock after the merge, oldest first.
    pub unlocked: Vec<UnlockedAchievement>,
    /// Unlocks added by this sync.
    pub newly_unlocked: Vec<UnlockedAchievement>,
}

/// Practice journal over a [`PracticeStore`].
#[derive(Debug)]
pub struct Journal<S: PracticeStore> {
    store: S,
    write_lock: Mutex<()>,
}

impl<S: PracticeStore> Journal<S> {
    /// Create a journal over a store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Add a piece or technique with zeroed statistics.
    pub fn add_piece(
        &self,
        name: &str,
        item_type: ItemType,
        is_favorite: bool,
        now: DateTime<Utc>,
    ) -> Result<PieceOrTechnique> {
        let _guard = self.write_lock.lock().unwrap();

        let name = name.trim();
        if name.is_empty() {
            return Err(PlayStreakError::invalid_piece("name cannot be empty"));
        }

        let piece = self.batched(|| {
            let id = self.store.next_piece_id()?;
            let piece = PieceOrTechnique::new(name, item_type, now)
                .with_id(id)
                .with_favorite(is_favorite);
            self.store.put_piece(&piece)?;
            Ok(piece)
        })?;
        let id = piece.id;

        tracing::debug!(piece_id = id, %item_type, "added piece");
        Ok(piece)
    }

    /// Set or clear the favorite flag.
    pub fn set_favorite(&self, piece_id: PieceId, is_favorite: bool) -> Result<PieceOrTechnique> {
        let _guard = self.write_lock.lock().unwrap();

        let piece = self
            .store
            .get_piece(piece_id)?
            .ok_or_else(|| PlayStreakError::piece_not_found(piece_id))?
            .with_favorite(is_favorite);
        self.store.put_piece(&piece)?;
        Ok(piece)
    }

    /// Delete a piece together with its activities.
    ///
    /// Returns the number of activities removed.
    pub fn delete_piece(&self, piece_id: PieceId) -> Result<usize> {
        let _guard = self.write_lock.lock().unwrap();

        if !self.store.piece_exists(piece_id)? {
            return Err(PlayStreakError::piece_not_found(piece_id));
        }

        let activities = self.store.activities_for_piece(piece_id)?;
        self.batched(|| {
            for activity in &activities {
                self.store.delete_activity(activity.id)?;
            }
            self.store.delete_piece(piece_id)
        })?;

        tracing::debug!(piece_id, removed = activities.len(), "deleted piece");
        Ok(activities.len())
    }

    /// Record a new activity and refresh its piece's statistics.
    ///
    /// The activity's ID is assigned here; any ID on the input is ignored.
    pub fn add_activity(&self, activity: Activity, now: DateTime<Utc>) -> Result<Activity> {
        let _guard = self.write_lock.lock().unwrap();

        activity.validate()?;
        if !self.store.piece_exists(activity.piece_id)? {
            return Err(PlayStreakError::piece_not_found(activity.piece_id));
        }

        self.batched(|| {
            let activity = activity.with_id(self.store.next_activity_id()?);
            self.store.put_activity(&activity)?;
            self.recompute_locked(activity.piece_id, now)?;
            Ok(activity)
        })
    }

    /// Replace an existing activity.
    ///
    /// When the activity moves to another piece, both pieces are recomputed.
    pub fn update_activity(&self, activity: Activity, now: DateTime<Utc>) -> Result<Activity> {
        let _guard = self.write_lock.lock().unwrap();

        activity.validate()?;
        let previous = self
            .store
            .get_activity(activity.id)?
            .ok_or_else(|| PlayStreakError::activity_not_found(activity.id))?;
        if !self.store.piece_exists(activity.piece_id)? {
            return Err(PlayStreakError::piece_not_found(activity.piece_id));
        }

        self.batched(|| {
            self.store.put_activity(&activity)?;
            self.recompute_locked(activity.piece_id, now)?;
            if previous.piece_id != activity.piece_id {
                self.recompute_locked(previous.piece_id, now)?;
            }
            Ok(activity)
        })
    }

    /// Delete an activity and refresh its piece's statistics.
    pub fn delete_activity(&self, activity_id: ActivityId, now: DateTime<Utc>) -> Result<Activity> {
        let _guard = self.write_lock.lock().unwrap();

        let activity = self
            .store
            .get_activity(activity_id)?
            .ok_or_else(|| PlayStreakError::activity_not_found(activity_id))?;
        self.batched(|| {
            self.store.delete_activity(activity_id)?;
            self.recompute_locked(activity.piece_id, now)?;
            Ok(activity)
        })
    }

    /// Recompute one piece's statistics.
    ///
    /// A piece that no longer exists is skipped with a warning.
    pub fn recompute_piece(
        &self,
        piece_id: PieceId,
        now: DateTime<Utc>,
    ) -> Result<Option<PieceOrTechnique>> {
        let _guard = self.write_lock.lock().unwrap();
        self.recompute_locked(piece_id, now)
    }

    /// Recompute every piece's statistics. Returns the number of pieces.
    pub fn recompute_all(&self, now: DateTime<Utc>) -> Result<usize> {
        let _guard = self.write_lock.lock().unwrap();

        let pieces = self.store.list_pieces()?;
        let activities = self.store.list_activities()?;
        self.batched(|| {
            pieces
                .iter()
                .try_for_each(|piece| self.store.put_piece(&recompute(piece, &activities, now)))
        })?;

        tracing::debug!(pieces = pieces.len(), "recomputed all statistics");
        Ok(pieces.len())
    }

    /// Run `op` as one store batch: one write on success, none on error.
    fn batched<T>(&self, op: impl FnOnce() -> Result<T>) -> Result<T> {
        self.store.begin_batch()?;
        match op() {
            Ok(value) => {
                self.store.commit_batch()?;
                Ok(value)
            }
            Err(e) => {
                self.store.rollback_batch();
                Err(e)
            }
        }
    }

    fn recompute_locked(
        &self,
        piece_id: PieceId,
        now: DateTime<Utc>,
    ) -> Result<Option<PieceOrTechnique>> {
        let Some(piece) = self.store.get_piece(piece_id)? else {
            tracing::warn!(piece_id, "piece no longer exists, skipping statistics update");
            return Ok(None);
        };

        let activities = self.store.activities_for_piece(piece_id)?;
        let updated = recompute(&piece, &activities, now);
        self.store.put_piece(&updated)?;
        Ok(Some(updated))
    }

    /// Ranked suggestions with "today" in the local time zone.
    pub fn suggestions(&self, limits: TierLimits, now: DateTime<Utc>) -> Result<Vec<SuggestionItem>> {
        self.suggestions_in(limits, now, &Local)
    }

    /// Ranked suggestions with "today" in `tz`.
    pub fn suggestions_in<Tz: TimeZone>(
        &self,
        limits: TierLimits,
        now: DateTime<Utc>,
        tz: &Tz,
    ) -> Result<Vec<SuggestionItem>> {
        let pieces = self.store.list_pieces()?;
        let activities = self.store.list_activities()?;
        Ok(SuggestionEngine::with_timezone(limits, now, tz).all_suggestions(&pieces, &activities))
    }

    /// Non-favorite pieces that have gone quiet.
    pub fn abandoned(&self, now: DateTime<Utc>) -> Result<Vec<AbandonedPiece>> {
        Ok(abandoned_pieces(&self.store.list_pieces()?, now))
    }

    /// Current streak in the local time zone.
    pub fn current_streak(&self, now: DateTime<Utc>) -> Result<u32> {
        self.current_streak_in(now, &Local)
    }

    /// Current streak with day boundaries in `tz`.
    pub fn current_streak_in<Tz: TimeZone>(&self, now: DateTime<Utc>, tz: &Tz) -> Result<u32> {
        Ok(current_streak_in(&self.store.list_activities()?, now, tz))
    }

    /// Reconcile stored achievements with history, local time zone.
    pub fn sync_achievements(&self, now: DateTime<Utc>) -> Result<AchievementSync> {
        self.sync_achievements_in(now, &Local)
    }

    /// Reconcile stored achievements with history.
    ///
    /// Pieces and activities dated after `now` do not unlock anything yet.
    /// Stored unlock dates never move.
    pub fn sync_achievements_in<Tz: TimeZone>(
        &self,
        now: DateTime<Utc>,
        tz: &Tz,
    ) -> Result<AchievementSync> {
        let _guard = self.write_lock.lock().unwrap();

        let pieces: Vec<PieceOrTechnique> = self
            .store
            .list_pieces()?
            .into_iter()
            .filter(|p| p.date_created <= now)
            .collect();
        let activities: Vec<Activity> = self
            .store
            .list_activities()?
            .into_iter()
            .filter(|a| a.timestamp <= now)
            .collect();

        let detected = detect_achievements(&pieces, &activities, tz);
        let stored = self.store.list_achievements()?;
        let (unlocked, newly_unlocked) = merge_unlocks(&stored, &detected);

        if !newly_unlocked.is_empty() {
            self.store.put_achievements(&unlocked)?;
            for unlock in &newly_unlocked {
                tracing::debug!(kind = ?unlock.kind, "achievement unlocked");
            }
        }

        Ok(AchievementSync {
            unlocked,
            newly_unlocked,
        })
    }

    /// Compare cached statistics with the activity log.
    pub fn validate(&self) -> Result<ValidationResult> {
        let pieces = self.store.list_pieces()?;
        let activities = self.store.list_activities()?;
        Ok(validate_statistics(&pieces, &activities))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AchievementKind;
    use crate::storage::{FileStore, MemoryStore};
    use chrono::Duration;
    use std::sync::Arc;
    use std::thread;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 18, 0, 0).unwrap()
    }

    fn days_ago(days: i64) -> DateTime<Utc> {
        now() - Duration::days(days)
    }

    fn journal() -> Journal<MemoryStore> {
        Journal::new(MemoryStore::new())
    }

    #[test]
    fn test_add_piece_assigns_ids() {
        let journal = journal();

        let first = journal
            .add_piece("Nocturne", ItemType::Piece, false, now())
            .unwrap();
        let second = journal
            .add_piece("Scales", ItemType::Technique, true, now())
            .unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert!(second.is_favorite);
        assert_eq!(first.stats.practice_count, 0);
    }

    #[test]
    fn test_add_piece_rejects_blank_name() {
        let journal = journal();
        let err = journal
            .add_piece("   ", ItemType::Piece, false, now())
            .unwrap_err();
        assert!(matches!(err, PlayStreakError::InvalidPiece { .. }));
    }

    #[test]
    fn test_add_activity_recomputes_statistics() {
        let journal = journal();
        let piece = journal.add_piece("Etude", ItemType::Piece, false, days_ago(30)).unwrap();

        let activity = journal
            .add_activity(Activity::practice(piece.id, 4, days_ago(2)), now())
            .unwrap();

        assert_eq!(activity.id, 1);
        let stored = journal.store().get_piece(piece.id).unwrap().unwrap();
        assert_eq!(stored.stats.practice_count, 1);
        assert_eq!(stored.stats.last_practice_date, Some(days_ago(2)));
        assert_eq!(stored.stats.last_satisfactory_practice, Some(days_ago(2)));
        assert_eq!(stored.stats.last_updated, now());
    }

    #[test]
    fn test_add_activity_validates() {
        let journal = journal();
        let piece = journal.add_piece("Etude", ItemType::Piece, false, now()).unwrap();

        let err = journal
            .add_activity(Activity::performance(piece.id, 4, now()), now())
            .unwrap_err();
        assert!(matches!(err, PlayStreakError::InvalidActivity { .. }));

        let err = journal
            .add_activity(Activity::practice(99, 2, now()), now())
            .unwrap_err();
        assert!(matches!(err, PlayStreakError::PieceNotFound { piece_id: 99 }));
    }

    #[test]
    fn test_update_moving_piece_recomputes_both() {
        let journal = journal();
        let a = journal.add_piece("A", ItemType::Piece, false, days_ago(10)).unwrap();
        let b = journal.add_piece("B", ItemType::Piece, false, days_ago(10)).unwrap();
        let activity = journal
            .add_activity(Activity::practice(a.id, 3, days_ago(1)), now())
            .unwrap();

        let moved = Activity {
            piece_id: b.id,
            ..activity
        };
        journal.update_activity(moved, now()).unwrap();

        let a = journal.store().get_piece(a.id).unwrap().unwrap();
        let b = journal.store().get_piece(b.id).unwrap().unwrap();
        assert_eq!(a.stats.practice_count, 0);
        assert_eq!(a.stats.last_practice_date, None);
        assert_eq!(b.stats.practice_count, 1);
        assert!(journal.validate().unwrap().is_valid());
    }

    #[test]
    fn test_update_missing_activity() {
        let journal = journal();
        let piece = journal.add_piece("A", ItemType::Piece, false, now()).unwrap();

        let err = journal
            .update_activity(Activity::practice(piece.id, 2, now()).with_id(7), now())
            .unwrap_err();
        assert!(matches!(err, PlayStreakError::ActivityNotFound { activity_id: 7 }));
    }

    #[test]
    fn test_delete_activity_recomputes() {
        let journal = journal();
        let piece = journal.add_piece("A", ItemType::Piece, false, days_ago(5)).unwrap();
        let first = journal
            .add_activity(Activity::performance(piece.id, 3, days_ago(3)), now())
            .unwrap();
        journal
            .add_activity(Activity::performance(piece.id, 1, days_ago(1)), now())
            .unwrap();

        journal.delete_activity(first.id, now()).unwrap();

        let piece = journal.store().get_piece(piece.id).unwrap().unwrap();
        assert_eq!(piece.stats.performance_count, 1);
        assert_eq!(piece.stats.last_satisfactory_performance, None);
        assert!(journal.delete_activity(first.id, now()).unwrap_err().is_not_found());
    }

    #[test]
    fn test_delete_piece_removes_activities() {
        let journal = journal();
        let keep = journal.add_piece("Keep", ItemType::Piece, false, days_ago(5)).unwrap();
        let gone = journal.add_piece("Gone", ItemType::Piece, false, days_ago(5)).unwrap();
        journal
            .add_activity(Activity::practice(keep.id, 2, days_ago(1)), now())
            .unwrap();
        for d in 1..=3 {
            journal
                .add_activity(Activity::practice(gone.id, 2, days_ago(d)), now())
                .unwrap();
        }

        assert_eq!(journal.delete_piece(gone.id).unwrap(), 3);
        assert_eq!(journal.store().list_activities().unwrap().len(), 1);
        assert!(journal.delete_piece(gone.id).is_err());
    }

    #[test]
    fn test_recompute_missing_piece_is_noop() {
        let journal = journal();
        assert_eq!(journal.recompute_piece(42, now()).unwrap(), None);
    }

    #[test]
    fn test_recompute_all_repairs_stale_cache() {
        let journal = journal();
        let piece = journal.add_piece("A", ItemType::Piece, false, days_ago(5)).unwrap();
        // Written behind the journal's back
        journal
            .store()
            .put_activity(&Activity::practice(piece.id, 2, days_ago(1)).with_id(50))
            .unwrap();
        assert!(!journal.validate().unwrap().is_valid());

        assert_eq!(journal.recompute_all(now()).unwrap(), 1);

        assert!(journal.validate().unwrap().is_valid());
    }

    #[test]
    fn test_set_favorite() {
        let journal = journal();
        let piece = journal.add_piece("A", ItemType::Piece, false, now()).unwrap();

        assert!(journal.set_favorite(piece.id, true).unwrap().is_favorite);
        assert!(journal.store().get_piece(piece.id).unwrap().unwrap().is_favorite);
        assert!(journal.set_favorite(77, true).is_err());
    }

    #[test]
    fn test_suggestions_read_cached_statistics() {
        let journal = journal();
        let fav = journal.add_piece("Fav", ItemType::Piece, true, days_ago(60)).unwrap();
        let stale = journal.add_piece("Stale", ItemType::Piece, false, days_ago(60)).unwrap();
        journal
            .add_activity(Activity::practice(stale.id, 2, days_ago(10)), now())
            .unwrap();

        let items = journal.suggestions_in(TierLimits::free(), now(), &Utc).unwrap();

        let ids: Vec<PieceId> = items.iter().map(|i| i.piece.id).collect();
        assert_eq!(ids, vec![fav.id, stale.id]);
    }

    #[test]
    fn test_current_streak() {
        let journal = journal();
        let piece = journal.add_piece("A", ItemType::Piece, false, days_ago(10)).unwrap();
        for d in 0..3 {
            journal
                .add_activity(Activity::practice(piece.id, 2, days_ago(d)), now())
                .unwrap();
        }

        assert_eq!(journal.current_streak_in(now(), &Utc).unwrap(), 3);
    }

    #[test]
    fn test_sync_achievements_merges_and_persists() {
        let journal = journal();
        let piece = journal.add_piece("A", ItemType::Piece, false, days_ago(10)).unwrap();
        for d in 1..=3 {
            journal
                .add_activity(Activity::practice(piece.id, 2, days_ago(d)), now())
                .unwrap();
        }

        let first = journal.sync_achievements_in(now(), &Utc).unwrap();
        let kinds: Vec<AchievementKind> = first.newly_unlocked.iter().map(|a| a.kind).collect();
        assert_eq!(
            kinds,
            vec![
                AchievementKind::FirstPiece,
                AchievementKind::FirstPractice,
                AchievementKind::Streak3Days,
            ]
        );
        assert_eq!(journal.store().list_achievements().unwrap().len(), 3);

        let second = journal.sync_achievements_in(now(), &Utc).unwrap();
        assert!(second.newly_unlocked.is_empty());
        assert_eq!(second.unlocked, first.unlocked);
    }

    #[test]
    fn test_sync_ignores_future_entries() {
        let journal = journal();
        let piece = journal.add_piece("A", ItemType::Piece, false, days_ago(1)).unwrap();
        journal
            .add_activity(
                Activity::performance(piece.id, 2, now() + Duration::days(2)),
                now(),
            )
            .unwrap();

        let sync = journal.sync_achievements_in(now(), &Utc).unwrap();

        assert!(sync
            .unlocked
            .iter()
            .all(|a| a.kind != AchievementKind::FirstPerformance));
    }

    #[test]
    fn test_concurrent_writers_keep_cache_consistent() {
        let journal = Arc::new(journal());
        let piece = journal.add_piece("Shared", ItemType::Piece, false, days_ago(30)).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let journal = Arc::clone(&journal);
                thread::spawn(move || {
                    for i in 0..10 {
                        let ts = days_ago(20) + Duration::hours(t * 10 + i);
                        journal
                            .add_activity(Activity::practice(piece.id, 2, ts), now())
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let stored = journal.store().get_piece(piece.id).unwrap().unwrap();
        assert_eq!(stored.stats.practice_count, 40);
        assert!(journal.validate().unwrap().is_valid());
    }

    #[test]
    fn test_file_backed_activity_is_written_with_statistics() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("practice.json");
        let journal = Journal::new(FileStore::open(&path).unwrap());
        let piece = journal.add_piece("Arabesque", ItemType::Piece, false, days_ago(5)).unwrap();

        journal
            .add_activity(Activity::practice(piece.id, 4, days_ago(1)), now())
            .unwrap();

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.list_activities().unwrap().len(), 1);
        let stored = reopened.get_piece(piece.id).unwrap().unwrap();
        assert_eq!(stored.stats.practice_count, 1);
        assert_eq!(stored.stats.last_satisfactory_practice, Some(days_ago(1)));
    }

    #[test]
    fn test_failed_write_leaves_journal_unchanged() {
        let dir = tempfile::TempDir::new().unwrap();
        let data_dir = dir.path().join("data");
        let journal = Journal::new(FileStore::open(data_dir.join("practice.json")).unwrap());
        let piece = journal.add_piece("Arabesque", ItemType::Piece, false, days_ago(5)).unwrap();
        std::fs::remove_dir_all(&data_dir).unwrap();

        let result = journal.add_activity(Activity::practice(piece.id, 4, days_ago(1)), now());

        assert!(matches!(result, Err(PlayStreakError::Storage { .. })));
        assert!(journal.store().list_activities().unwrap().is_empty());
        let stored = journal.store().get_piece(piece.id).unwrap().unwrap();
        assert_eq!(stored.stats.practice_count, 0);
        assert!(journal.validate().unwrap().is_valid());
    }
}
