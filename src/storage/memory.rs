//! In-memory practice storage.
//!
//! Thread-safe implementation of [`PracticeStore`] used by tests, and as the
//! working set behind the file-backed store.

use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::core::{Activity, ActivityId, PieceId, PieceOrTechnique, UnlockedAchievement};
use crate::error::Result;
use crate::storage::file::StoreDocument;
use crate::storage::PracticeStore;

#[derive(Debug, Default)]
struct State {
    pieces: BTreeMap<PieceId, PieceOrTechnique>,
    activities: BTreeMap<ActivityId, Activity>,
    achievements: Vec<UnlockedAchievement>,
    next_piece_id: PieceId,
    next_activity_id: ActivityId,
}

impl State {
    fn from_document(document: StoreDocument) -> Self {
        let pieces: BTreeMap<PieceId, PieceOrTechnique> =
            document.pieces.into_iter().map(|p| (p.id, p)).collect();
        let activities: BTreeMap<ActivityId, Activity> =
            document.activities.into_iter().map(|a| (a.id, a)).collect();

        let max_piece = pieces.keys().next_back().copied().unwrap_or(0);
        let max_activity = activities.keys().next_back().copied().unwrap_or(0);

        Self {
            pieces,
            activities,
            achievements: document.achievements,
            next_piece_id: document.next_piece_id.max(max_piece),
            next_activity_id: document.next_activity_id.max(max_activity),
        }
    }
}

/// In-memory practice store.
///
/// Thread-safe implementation using `RwLock`. Data is lost when the store is
/// dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a persisted document.
    ///
    /// ID counters never go below the highest stored ID.
    pub fn from_document(document: StoreDocument) -> Self {
        Self {
            state: RwLock::new(State::from_document(document)),
        }
    }

    /// Replace the whole contents with a document.
    pub fn restore(&self, document: StoreDocument) {
        *self.state.write().unwrap() = State::from_document(document);
    }

    /// Snapshot the store as a document.
    pub fn to_document(&self) -> StoreDocument {
        let state = self.state.read().unwrap();
        StoreDocument {
            pieces: state.pieces.values().cloned().collect(),
            activities: state.activities.values().cloned().collect(),
            achievements: state.achievements.clone(),
            next_piece_id: state.next_piece_id,
            next_activity_id: state.next_activity_id,
            ..StoreDocument::default()
        }
    }

    /// Number of pieces and techniques in the store.
    pub fn piece_count(&self) -> usize {
        self.state.read().unwrap().pieces.len()
    }

    /// Number of activities in the store.
    pub fn activity_count(&self) -> usize {
        self.state.read().unwrap().activities.len()
    }
}

impl PracticeStore for MemoryStore {
    fn get_piece(&self, id: PieceId) -> Result<Option<PieceOrTechnique>> {
        Ok(self.state.read().unwrap().pieces.get(&id).cloned())
    }

    fn list_pieces(&self) -> Result<Vec<PieceOrTechnique>> {
        Ok(self.state.read().unwrap().pieces.values().cloned().collect())
    }

    fn put_piece(&self, piece: &PieceOrTechnique) -> Result<()> {
        let mut state = self.state.write().unwrap();
        state.next_piece_id = state.next_piece_id.max(piece.id);
        state.pieces.insert(piece.id, piece.clone());
        Ok(())
    }

    fn delete_piece(&self, id: PieceId) -> Result<()> {
        self.state.write().unwrap().pieces.remove(&id);
        Ok(())
    }

    fn get_activity(&self, id: ActivityId) -> Result<Option<Activity>> {
        Ok(self.state.read().unwrap().activities.get(&id).cloned())
    }

    fn list_activities(&self) -> Result<Vec<Activity>> {
        let state = self.state.read().unwrap();
        let mut result: Vec<Activity> = state.activities.values().cloned().collect();
        // Oldest first, ID breaks ties
        result.sort_by_key(|a| (a.timestamp, a.id));
        Ok(result)
    }

    fn put_activity(&self, activity: &Activity) -> Result<()> {
        let mut state = self.state.write().unwrap();
        state.next_activity_id = state.next_activity_id.max(activity.id);
        state.activities.insert(activity.id, activity.clone());
        Ok(())
    }

    fn delete_activity(&self, id: ActivityId) -> Result<()> {
        self.state.write().unwrap().activities.remove(&id);
        Ok(())
    }

    fn list_achievements(&self) -> Result<Vec<UnlockedAchievement>> {
        Ok(self.state.read().unwrap().achievements.clone())
    }

    fn put_achievements(&self, achievements: &[UnlockedAchievement]) -> Result<()> {
        self.state.write().unwrap().achievements = achievements.to_vec();
        Ok(())
    }

    fn next_piece_id(&self) -> Result<PieceId> {
        let mut state = self.state.write().unwrap();
        state.next_piece_id += 1;
        Ok(state.next_piece_id)
    }

    fn next_activity_id(&self) -> Result<ActivityId> {
        let mut state = self.state.write().unwrap();
        state.next_activity_id += 1;
        Ok(state.next_activity_id)
    }
}
