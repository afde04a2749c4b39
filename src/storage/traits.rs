//! Storage trait for the practice journal.
//!
//! The analytics core only consumes snapshots; this trait is the seam where
//! any persistence technology plugs in.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::core::{Activity, ActivityId, PieceId, PieceOrTechnique, UnlockedAchievement};
use crate::error::Result;

/// Trait for practice data backends.
///
/// Implementations store pieces, activities and achievement unlocks, and
/// hand out identifiers. Mutations are not paired with statistics updates
/// here; that is the journal's job.
pub trait PracticeStore: Send + Sync {
    /// Retrieve a piece by ID.
    ///
    /// Returns `Ok(None)` if the piece doesn't exist.
    fn get_piece(&self, id: PieceId) -> Result<Option<PieceOrTechnique>>;

    /// List every piece and technique, ordered by ID.
    fn list_pieces(&self) -> Result<Vec<PieceOrTechnique>>;

    /// Create or replace a piece.
    fn put_piece(&self, piece: &PieceOrTechnique) -> Result<()>;

    /// Delete a piece.
    ///
    /// Returns `Ok(())` even if the piece doesn't exist. Its activities are
    /// left alone.
    fn delete_piece(&self, id: PieceId) -> Result<()>;

    /// Retrieve an activity by ID.
    fn get_activity(&self, id: ActivityId) -> Result<Option<Activity>>;

    /// List every activity, oldest first.
    fn list_activities(&self) -> Result<Vec<Activity>>;

    /// Create or replace an activity.
    fn put_activity(&self, activity: &Activity) -> Result<()>;

    /// Delete an activity.
    ///
    /// Returns `Ok(())` even if the activity doesn't exist.
    fn delete_activity(&self, id: ActivityId) -> Result<()>;

    /// Stored achievement unlocks.
    fn list_achievements(&self) -> Result<Vec<UnlockedAchievement>>;

    /// Replace the stored achievement unlocks.
    fn put_achievements(&self, achievements: &[UnlockedAchievement]) -> Result<()>;

    /// Reserve a fresh piece ID.
    fn next_piece_id(&self) -> Result<PieceId>;

    /// Reserve a fresh activity ID.
    fn next_activity_id(&self) -> Result<ActivityId>;

    /// Activities of one piece, oldest first.
    fn activities_for_piece(&self, piece_id: PieceId) -> Result<Vec<Activity>> {
        Ok(self
            .list_activities()?
            .into_iter()
            .filter(|a| a.piece_id == piece_id)
            .collect())
    }

    /// Activities with `start <= timestamp < end`, oldest first.
    fn activities_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Activity>> {
        Ok(self
            .list_activities()?
            .into_iter()
            .filter(|a| a.timestamp >= start && a.timestamp < end)
            .collect())
    }

    /// Check if a piece exists.
    fn piece_exists(&self, id: PieceId) -> Result<bool> {
        Ok(self.get_piece(id)?.is_some())
    }

    /// Start a unit of work.
    ///
    /// Backends that persist may hold writes back until
    /// [`commit_batch`](Self::commit_batch). Batches nest; only the outermost
    /// commit persists.
    fn begin_batch(&self) -> Result<()> {
        Ok(())
    }

    /// Persist everything written since the matching `begin_batch`.
    fn commit_batch(&self) -> Result<()> {
        Ok(())
    }

    /// Discard everything written since the outermost `begin_batch`.
    fn rollback_batch(&self) {}
}

/// Blanket implementation of PracticeStore for Arc-wrapped stores.
///
/// Lets a test keep a handle on the store it gave to a journal or command.
impl<T: PracticeStore + ?Sized> PracticeStore for Arc<T> {
    fn get_piece(&self, id: PieceId) -> Result<Option<PieceOrTechnique>> {
        (**self).get_piece(id)
    }

    fn list_pieces(&self) -> Result<Vec<PieceOrTechnique>> {
        (**self).list_pieces()
    }

    fn put_piece(&self, piece: &PieceOrTechnique) -> Result<()> {
        (**self).put_piece(piece)
    }

    fn delete_piece(&self, id: PieceId) -> Result<()> {
        (**self).delete_piece(id)
    }

    fn get_activity(&self, id: ActivityId) -> Result<Option<Activity>> {
        (**self).get_activity(id)
    }

    fn list_activities(&self) -> Result<Vec<Activity>> {
        (**self).list_activities()
    }

    fn put_activity(&self, activity: &Activity) -> Result<()> {
        (**self).put_activity(activity)
    }

    fn delete_activity(&self, id: ActivityId) -> Result<()> {
        (**self).delete_activity(id)
    }

    fn list_achievements(&self) -> Result<Vec<UnlockedAchievement>> {
        (**self).list_achievements()
    }

    fn put_achievements(&self, achievements: &[UnlockedAchievement]) -> Result<()> {
        (**self).put_achievements(achievements)
    }

    fn next_piece_id(&self) -> Result<PieceId> {
        (**self).next_piece_id()
    }

    fn next_activity_id(&self) -> Result<ActivityId> {
        (**self).next_activity_id()
    }

    fn activities_for_piece(&self, piece_id: PieceId) -> Result<Vec<Activity>> {
        (**self).activities_for_piece(piece_id)
    }

    fn activities_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Activity>> {
        (**self).activities_between(start, end)
    }

    fn begin_batch(&self) -> Result<()> {
        (**self).begin_batch()
    }

    fn commit_batch(&self) -> Result<()> {
        (**self).commit_batch()
    }

    fn rollback_batch(&self) {
        (**self).rollback_batch()
    }
}

/// Test utilities for PracticeStore implementations.
#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::core::AchievementKind;
    use chrono::{Duration, TimeZone};

    /// Test helper to verify PracticeStore implementations.
    pub fn test_practice_store_crud<S: PracticeStore>(store: &S) {
        let created = Utc.with_ymd_and_hms(2024, 2, 1, 8, 0, 0).unwrap();

        // IDs are unique and increasing
        let first_id = store.next_piece_id().unwrap();
        let second_id = store.next_piece_id().unwrap();
        assert!(second_id > first_id);

        let piece = PieceOrTechnique::piece("Gymnopédie", created).with_id(first_id);
        assert!(!store.piece_exists(piece.id).unwrap());
        assert!(store.get_piece(piece.id).unwrap().is_none());

        store.put_piece(&piece).unwrap();
        assert!(store.piece_exists(piece.id).unwrap());
        assert_eq!(store.get_piece(piece.id).unwrap().unwrap(), piece);

        // Put replaces
        let favorite = piece.clone().with_favorite(true);
        store.put_piece(&favorite).unwrap();
        assert!(store.get_piece(piece.id).unwrap().unwrap().is_favorite);

        let other = PieceOrTechnique::technique("Arpeggios", created).with_id(second_id);
        store.put_piece(&other).unwrap();
        let ids: Vec<PieceId> = store.list_pieces().unwrap().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![first_id, second_id]);

        // Activities
        let late = Activity::practice(first_id, 3, created + Duration::days(3))
            .with_id(store.next_activity_id().unwrap());
        let early = Activity::performance(first_id, 2, created + Duration::days(1))
            .with_id(store.next_activity_id().unwrap());
        let elsewhere = Activity::practice(second_id, 4, created + Duration::days(2))
            .with_id(store.next_activity_id().unwrap());
        for activity in [&late, &early, &elsewhere] {
            store.put_activity(activity).unwrap();
        }

        assert_eq!(store.get_activity(early.id).unwrap().unwrap(), early);
        let all: Vec<ActivityId> = store
            .list_activities()
            .unwrap()
            .iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(all, vec![early.id, elsewhere.id, late.id]);

        let for_first = store.activities_for_piece(first_id).unwrap();
        assert_eq!(for_first.len(), 2);
        assert_eq!(for_first[0].id, early.id);

        let window = store
            .activities_between(created + Duration::days(1), created + Duration::days(3))
            .unwrap();
        let window_ids: Vec<ActivityId> = window.iter().map(|a| a.id).collect();
        assert_eq!(window_ids, vec![early.id, elsewhere.id]);

        store.delete_activity(late.id).unwrap();
        assert!(store.get_activity(late.id).unwrap().is_none());
        // Delete again should succeed
        store.delete_activity(late.id).unwrap();

        // Achievements
        assert!(store.list_achievements().unwrap().is_empty());
        let unlocks = vec![UnlockedAchievement::new(AchievementKind::FirstPiece, created)];
        store.put_achievements(&unlocks).unwrap();
        assert_eq!(store.list_achievements().unwrap(), unlocks);

        // Delete piece
        store.delete_piece(first_id).unwrap();
        assert!(!store.piece_exists(first_id).unwrap());
        store.delete_piece(first_id).unwrap();
    }
}
