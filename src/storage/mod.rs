//! Practice data storage for PlayStreak.
//!
//! This module provides persistence for pieces, activities and achievement
//! unlocks, with file-backed and in-memory backends.

pub mod file;
pub mod memory;
pub mod traits;

pub use file::{FileStore, StoreDocument, STORE_SCHEMA_VERSION};
pub use memory::MemoryStore;
pub use traits::PracticeStore;
