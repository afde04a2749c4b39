//! File-backed practice storage.
//!
//! The whole journal lives in one JSON document (`practice.json` under the
//! PlayStreak home by default). It is loaded once when the store opens and
//! rewritten after every mutation, or once per batch. Atomic writes use the
//! temp file + rename pattern, so a crash never leaves a half-written
//! document behind. A failed write rolls the working set back, so memory
//! never runs ahead of disk.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::config::default_data_file;
use crate::core::{Activity, ActivityId, PieceId, PieceOrTechnique, UnlockedAchievement};
use crate::error::{PlayStreakError, Result};
use crate::storage::{MemoryStore, PracticeStore};

/// Current schema version of the data document.
pub const STORE_SCHEMA_VERSION: u32 = 1;

/// On-disk shape of the journal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreDocument {
    /// Schema version for forward compatibility.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// Highest piece ID handed out so far.
    #[serde(default)]
    pub next_piece_id: PieceId,
    /// Highest activity ID handed out so far.
    #[serde(default)]
    pub next_activity_id: ActivityId,
    #[serde(default)]
    pub pieces: Vec<PieceOrTechnique>,
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(default)]
    pub achievements: Vec<UnlockedAchievement>,
}

fn default_schema_version() -> u32 {
    STORE_SCHEMA_VERSION
}

impl Default for StoreDocument {
    fn default() -> Self {
        Self {
            schema_version: STORE_SCHEMA_VERSION,
            next_piece_id: 0,
            next_activity_id: 0,
            pieces: Vec::new(),
            activities: Vec::new(),
            achievements: Vec::new(),
        }
    }
}

/// An open batch: the document as it was before the batch began.
#[derive(Debug)]
struct Batch {
    snapshot: StoreDocument,
    depth: usize,
}

/// File-backed practice store.
///
/// Reads are served from memory; every mutation rewrites the document
/// unless a batch is open. Writes are serialized so two threads never
/// interleave a mutation with another thread's persist.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    inner: MemoryStore,
    write_lock: Mutex<()>,
    batch: Mutex<Option<Batch>>,
}

impl FileStore {
    /// Open the store at the default location.
    ///
    /// Uses `~/.playstreak/practice.json` or `$PLAYSTREAK_HOME/practice.json`.
    pub fn new() -> Result<Self> {
        let path = default_data_file().ok_or_else(|| {
            PlayStreakError::config("Could not determine data file location (no home directory)")
        })?;
        Self::open(path)
    }

    /// Open the store at `path`, creating parent directories as needed.
    ///
    /// A missing file is an empty journal. A file from a newer schema is
    /// rejected rather than silently rewritten.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| PlayStreakError::storage(parent, e))?;
            }
        }

        let document = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| PlayStreakError::storage(&path, e))?;
            let document: StoreDocument = serde_json::from_str(&content)?;
            if document.schema_version > STORE_SCHEMA_VERSION {
                return Err(PlayStreakError::serde(format!(
                    "{} has schema version {}, this build supports up to {}",
                    path.display(),
                    document.schema_version,
                    STORE_SCHEMA_VERSION
                )));
            }
            document
        } else {
            StoreDocument::default()
        };

        tracing::debug!(
            path = %path.display(),
            pieces = document.pieces.len(),
            activities = document.activities.len(),
            "opened practice store"
        );

        Ok(Self {
            path,
            inner: MemoryStore::from_document(document),
            write_lock: Mutex::new(()),
            batch: Mutex::new(None),
        })
    }

    /// Path of the data document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the path for the temp file used during atomic writes.
    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "practice.json".to_string());
        self.path.with_file_name(format!(".{}.tmp", name))
    }

    /// Write the document atomically using temp file + rename.
    fn persist(&self) -> Result<()> {
        let temp_path = self.temp_path();
        let json = serde_json::to_string_pretty(&self.inner.to_document())?;

        {
            let mut file =
                fs::File::create(&temp_path).map_err(|e| PlayStreakError::storage(&temp_path, e))?;
            file.write_all(json.as_bytes())
                .map_err(|e| PlayStreakError::storage(&temp_path, e))?;
            file.sync_all()
                .map_err(|e| PlayStreakError::storage(&temp_path, e))?;
        }

        // Rename temp file to final path (atomic on POSIX)
        fs::rename(&temp_path, &self.path).map_err(|e| PlayStreakError::storage(&self.path, e))?;

        Ok(())
    }

    /// Apply a mutation to the working set and persist it.
    ///
    /// Inside a batch the persist is left to `commit_batch`. Outside one, a
    /// failed persist restores the working set.
    fn mutate<T>(&self, op: impl FnOnce(&MemoryStore) -> Result<T>) -> Result<T> {
        let _guard = self.write_lock.lock().unwrap();
        if self.batch.lock().unwrap().is_some() {
            return op(&self.inner);
        }

        let snapshot = self.inner.to_document();
        let result = op(&self.inner).and_then(|value| {
            self.persist()?;
            Ok(value)
        });
        if let Err(e) = &result {
            tracing::warn!(path = %self.path.display(), error = %e, "write failed, rolling back");
            self.inner.restore(snapshot);
        }
        result
    }
}

impl PracticeStore for FileStore {
    fn get_piece(&self, id: PieceId) -> Result<Option<PieceOrTechnique>> {
        self.inner.get_piece(id)
    }

    fn list_pieces(&self) -> Result<Vec<PieceOrTechnique>> {
        self.inner.list_pieces()
    }

    fn put_piece(&self, piece: &PieceOrTechnique) -> Result<()> {
        self.mutate(|store| store.put_piece(piece))
    }

    fn delete_piece(&self, id: PieceId) -> Result<()> {
        self.mutate(|store| store.delete_piece(id))
    }

    fn get_activity(&self, id: ActivityId) -> Result<Option<Activity>> {
        self.inner.get_activity(id)
    }

    fn list_activities(&self) -> Result<Vec<Activity>> {
        self.inner.list_activities()
    }

    fn put_activity(&self, activity: &Activity) -> Result<()> {
        self.mutate(|store| store.put_activity(activity))
    }

    fn delete_activity(&self, id: ActivityId) -> Result<()> {
        self.mutate(|store| store.delete_activity(id))
    }

    fn list_achievements(&self) -> Result<Vec<UnlockedAchievement>> {
        self.inner.list_achievements()
    }

    fn put_achievements(&self, achievements: &[UnlockedAchievement]) -> Result<()> {
        self.mutate(|store| store.put_achievements(achievements))
    }

    fn next_piece_id(&self) -> Result<PieceId> {
        self.mutate(|store| store.next_piece_id())
    }

    fn next_activity_id(&self) -> Result<ActivityId> {
        self.mutate(|store| store.next_activity_id())
    }

    fn begin_batch(&self) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap();
        let mut batch = self.batch.lock().unwrap();
        match batch.as_mut() {
            Some(open) => open.depth += 1,
            None => {
                *batch = Some(Batch {
                    snapshot: self.inner.to_document(),
                    depth: 1,
                })
            }
        }
        Ok(())
    }

    fn commit_batch(&self) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap();
        let mut batch = self.batch.lock().unwrap();
        let Some(open) = batch.as_mut() else {
            return Ok(());
        };
        if open.depth > 1 {
            open.depth -= 1;
            return Ok(());
        }

        let Some(open) = batch.take() else {
            return Ok(());
        };
        if let Err(e) = self.persist() {
            tracing::warn!(path = %self.path.display(), error = %e, "batch write failed, rolling back");
            self.inner.restore(open.snapshot);
            return Err(e);
        }
        Ok(())
    }

    fn rollback_batch(&self) {
        let _guard = self.write_lock.lock().unwrap();
        if let Some(open) = self.batch.lock().unwrap().take() {
            self.inner.restore(open.snapshot);
        }
    }
}
