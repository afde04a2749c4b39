//! Unified error types for PlayStreak.
//!
//! The analytics core (statistics, streaks, suggestions) never fails: it maps
//! degenerate input to sentinel values. Errors only come from the layers
//! around it: storage, configuration and activity validation. Read paths in
//! the CLI use [`FailOpen`] so a broken data file degrades to an empty view
//! instead of an error screen.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for PlayStreak operations.
#[derive(Error, Debug)]
pub enum PlayStreakError {
    /// I/O errors from data file operations.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// JSON or TOML parsing/serialization errors.
    #[error("serialization error: {message}")]
    Serde { message: String },

    /// Configuration loading errors.
    #[error("config error: {message}")]
    Config { message: String },

    /// An activity failed validation (level out of range, etc).
    #[error("invalid activity: {message}")]
    InvalidActivity { message: String },

    /// A piece or technique failed validation (blank name).
    #[error("invalid piece: {message}")]
    InvalidPiece { message: String },

    /// Piece or technique not found in storage.
    #[error("piece not found: {piece_id}")]
    PieceNotFound { piece_id: u64 },

    /// Activity not found in storage.
    #[error("activity not found: {activity_id}")]
    ActivityNotFound { activity_id: u64 },
}

/// A specialized Result type for PlayStreak operations.
pub type Result<T> = std::result::Result<T, PlayStreakError>;

impl PlayStreakError {
    /// Create a storage error from an I/O error.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create a serialization error.
    pub fn serde(message: impl Into<String>) -> Self {
        Self::Serde {
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid activity error.
    pub fn invalid_activity(message: impl Into<String>) -> Self {
        Self::InvalidActivity {
            message: message.into(),
        }
    }

    /// Create an invalid piece error.
    pub fn invalid_piece(message: impl Into<String>) -> Self {
        Self::InvalidPiece {
            message: message.into(),
        }
    }

    /// Create a piece not found error.
    pub fn piece_not_found(piece_id: u64) -> Self {
        Self::PieceNotFound { piece_id }
    }

    /// Create an activity not found error.
    pub fn activity_not_found(activity_id: u64) -> Self {
        Self::ActivityNotFound { activity_id }
    }

    /// Whether the error refers to a missing record rather than a broken store.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::PieceNotFound { .. } | Self::ActivityNotFound { .. }
        )
    }
}

impl From<io::Error> for PlayStreakError {
    fn from(err: io::Error) -> Self {
        Self::Storage {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for PlayStreakError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde {
            message: err.to_string(),
        }
    }
}

/// Trait for fail-open error handling.
///
/// Log the error and return a safe default. Used on read paths where an
/// empty dashboard is better than no dashboard.
pub trait FailOpen<T> {
    /// Handle an error by logging a warning and returning the default value.
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default;

    /// Handle an error by logging a warning and returning the provided fallback.
    fn fail_open_with(self, context: &str, fallback: T) -> T;
}

impl<T> FailOpen<T> for Result<T> {
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default,
    {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using default)", context, err);
                T::default()
            }
        }
    }

    fn fail_open_with(self, context: &str, fallback: T) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using fallback)", context, err);
                fallback
            }
        }
    }
}

/// Exit codes for the `playstreak` binary.
pub mod exit_codes {
    /// Command completed.
    pub const SUCCESS: i32 = 0;

    /// Command ran but reported a failure (unknown piece, invalid level, ...).
    pub const ERROR: i32 = 1;

    /// The process panicked.
    pub const CRASH: i32 = 3;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display() {
        let err = PlayStreakError::storage(
            "/tmp/playstreak.json",
            io::Error::new(io::ErrorKind::NotFound, "file not found"),
        );
        assert!(err.to_string().contains("storage error"));
        assert!(err.to_string().contains("/tmp/playstreak.json"));
    }

    #[test]
    fn test_serde_error_display() {
        let err = PlayStreakError::serde("invalid JSON");
        assert_eq!(err.to_string(), "serialization error: invalid JSON");
    }

    #[test]
    fn test_config_error_display() {
        let err = PlayStreakError::config("invalid TOML");
        assert_eq!(err.to_string(), "config error: invalid TOML");
    }

    #[test]
    fn test_invalid_activity_display() {
        let err = PlayStreakError::invalid_activity("practice level 5 out of range 1-4");
        assert_eq!(
            err.to_string(),
            "invalid activity: practice level 5 out of range 1-4"
        );
    }

    #[test]
    fn test_not_found_display() {
        assert_eq!(
            PlayStreakError::piece_not_found(7).to_string(),
            "piece not found: 7"
        );
        assert_eq!(
            PlayStreakError::activity_not_found(12).to_string(),
            "activity not found: 12"
        );
    }

    #[test]
    fn test_is_not_found() {
        assert!(PlayStreakError::piece_not_found(1).is_not_found());
        assert!(PlayStreakError::activity_not_found(1).is_not_found());
        assert!(!PlayStreakError::config("x").is_not_found());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err: PlayStreakError = io_err.into();
        assert!(matches!(err, PlayStreakError::Storage { .. }));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: PlayStreakError = json_err.into();
        assert!(matches!(err, PlayStreakError::Serde { .. }));
    }

    #[test]
    fn test_fail_open_default() {
        let result: Result<Vec<String>> = Err(PlayStreakError::serde("test"));
        let value = result.fail_open_default("test context");
        assert!(value.is_empty());
    }

    #[test]
    fn test_fail_open_with() {
        let result: Result<i32> = Err(PlayStreakError::config("test"));
        let value = result.fail_open_with("test context", 42);
        assert_eq!(value, 42);
    }

    #[test]
    fn test_fail_open_success() {
        let result: Result<i32> = Ok(100);
        let value = result.fail_open_default("test context");
        assert_eq!(value, 100);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_codes::SUCCESS, 0);
        assert_eq!(exit_codes::ERROR, 1);
        assert_eq!(exit_codes::CRASH, 3);
    }
}
