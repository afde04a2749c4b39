//! Configuration loading for PlayStreak.
//!
//! Configuration follows a precedence chain:
//! 1. Environment variables (highest priority)
//! 2. Project config (`.playstreak/config.toml`)
//! 3. User config (`~/.playstreak/config.toml`)
//! 4. Defaults (lowest priority)
//!
//! All configuration is optional. With no config the free tier applies and
//! data lives in `~/.playstreak/practice.json`.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{FailOpen, PlayStreakError, Result};
use crate::stats::{Tier, TierLimits};

/// Name of the per-user and per-project configuration directory.
pub const CONFIG_DIR_NAME: &str = ".playstreak";

/// File name of the data document inside the PlayStreak home.
pub const DATA_FILE_NAME: &str = "practice.json";

/// Main configuration struct for PlayStreak.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Suggestion tier and cap overrides.
    pub suggestions: SuggestionsConfig,
    /// Data file location.
    pub storage: StorageConfig,
}

/// Suggestion tier configuration.
///
/// The tier picks the base caps; any cap set here replaces the tier's value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SuggestionsConfig {
    /// "free" or "pro".
    pub tier: Tier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favorite_cap: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub non_favorite_cap: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance_cap: Option<usize>,
}

/// Storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Path of the data document. Defaults to `<home>/practice.json`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration with full precedence chain.
    ///
    /// Precedence (highest to lowest):
    /// 1. Environment variables
    /// 2. Project config (`.playstreak/config.toml` in cwd or an ancestor)
    /// 3. User config (`~/.playstreak/config.toml`)
    /// 4. Defaults
    pub fn load() -> Self {
        match env::current_dir() {
            Ok(cwd) => Self::load_from_cwd(&cwd),
            Err(_) => {
                let mut config = Config::default();
                if let Some(user_config) = Self::load_user_config() {
                    config = config.merge(user_config);
                }
                config.apply_env_overrides();
                config
            }
        }
    }

    /// Load configuration with a specific working directory.
    pub fn load_from_cwd(cwd: &Path) -> Self {
        let mut config = Config::default();

        // Layer 4 → 3: Apply user config
        if let Some(user_config) = Self::load_user_config() {
            config = config.merge(user_config);
        }

        // Layer 3 → 2: Apply project config
        if let Some(project_config) = Self::load_project_config(cwd) {
            config = config.merge(project_config);
        }

        // Layer 2 → 1: Apply environment variables
        config.apply_env_overrides();

        config
    }

    /// Load user config from `<home>/config.toml`.
    fn load_user_config() -> Option<Config> {
        let home = playstreak_home()?;
        Self::load_optional(&home.join("config.toml"))
    }

    /// Load project config from `.playstreak/config.toml`.
    fn load_project_config(cwd: &Path) -> Option<Config> {
        Self::load_optional(&project_config_dir(cwd).join("config.toml"))
    }

    /// Load a config file that may legitimately be absent.
    ///
    /// A file that exists but does not parse is reported and skipped.
    fn load_optional(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        Self::load_from_file(path)
            .map(Some)
            .fail_open_with(&format!("loading {}", path.display()), None)
    }

    /// Load config from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| PlayStreakError::storage(path, e))?;
        toml::from_str(&content).map_err(|e| PlayStreakError::config(e.to_string()))
    }

    /// Apply environment variable overrides.
    ///
    /// `PLAYSTREAK_HOME` is read directly by [`playstreak_home`].
    fn apply_env_overrides(&mut self) {
        // PLAYSTREAK_TIER
        if let Ok(val) = env::var("PLAYSTREAK_TIER") {
            match val.parse::<Tier>() {
                Ok(tier) => self.suggestions.tier = tier,
                Err(_) => tracing::warn!(
                    "Invalid PLAYSTREAK_TIER value '{}'. Expected 'free' or 'pro'. Using '{}'.",
                    val,
                    self.suggestions.tier
                ),
            }
        }

        // PLAYSTREAK_DATA_FILE
        if let Ok(val) = env::var("PLAYSTREAK_DATA_FILE") {
            if val.trim().is_empty() {
                tracing::warn!("PLAYSTREAK_DATA_FILE is empty, ignoring");
            } else {
                self.storage.data_file = Some(PathBuf::from(val));
            }
        }
    }

    /// Merge another config into this one.
    ///
    /// Values from `other` take precedence when they differ from defaults.
    /// Like any default-comparing merge, an explicit `tier = "free"` in a
    /// higher layer cannot undo `tier = "pro"` from a lower one.
    fn merge(mut self, other: Config) -> Self {
        if other.suggestions.tier != Tier::default() {
            self.suggestions.tier = other.suggestions.tier;
        }
        if other.suggestions.favorite_cap.is_some() {
            self.suggestions.favorite_cap = other.suggestions.favorite_cap;
        }
        if other.suggestions.non_favorite_cap.is_some() {
            self.suggestions.non_favorite_cap = other.suggestions.non_favorite_cap;
        }
        if other.suggestions.performance_cap.is_some() {
            self.suggestions.performance_cap = other.suggestions.performance_cap;
        }

        if other.storage.data_file.is_some() {
            self.storage.data_file = other.storage.data_file;
        }

        self
    }

    /// The caps handed to the suggestion engine.
    pub fn tier_limits(&self) -> TierLimits {
        let base = self.suggestions.tier.limits();
        TierLimits {
            favorite_cap: self.suggestions.favorite_cap.unwrap_or(base.favorite_cap),
            non_favorite_cap: self
                .suggestions
                .non_favorite_cap
                .unwrap_or(base.non_favorite_cap),
            performance_cap: self
                .suggestions
                .performance_cap
                .unwrap_or(base.performance_cap),
            performance_suggestions: base.performance_suggestions,
        }
    }

    /// Resolved data file path.
    pub fn data_file(&self) -> Option<PathBuf> {
        self.storage.data_file.clone().or_else(default_data_file)
    }
}

/// Get the PlayStreak home directory.
///
/// `$PLAYSTREAK_HOME` when set and non-empty, otherwise `~/.playstreak`.
/// Relative values are canonicalized when they exist.
pub fn playstreak_home() -> Option<PathBuf> {
    if let Ok(home) = env::var("PLAYSTREAK_HOME") {
        if home.is_empty() {
            tracing::warn!("PLAYSTREAK_HOME is empty, using default");
        } else {
            let path = PathBuf::from(&home);
            if path.is_absolute() {
                return Some(path);
            }
            if let Ok(canonical) = path.canonicalize() {
                return Some(canonical);
            }
            tracing::warn!("PLAYSTREAK_HOME is relative and doesn't exist, using as-is");
            return Some(path);
        }
    }

    if let Some(home) = dirs::home_dir() {
        return Some(home.join(CONFIG_DIR_NAME));
    }

    let fallback_path = fallback_home();
    tracing::warn!(
        "HOME not set, using fallback location: {}",
        fallback_path.display()
    );
    Some(fallback_path)
}

/// Home directory used when HOME is unavailable.
#[cfg(unix)]
fn fallback_home() -> PathBuf {
    use std::os::unix::fs::MetadataExt;
    let uid = std::fs::metadata("/").map(|m| m.uid()).unwrap_or(0);
    PathBuf::from(format!("/tmp/playstreak-{}", uid))
}

/// Home directory used when HOME is unavailable.
#[cfg(not(unix))]
fn fallback_home() -> PathBuf {
    std::env::temp_dir().join("playstreak")
}

/// Default data document path: `<home>/practice.json`.
pub fn default_data_file() -> Option<PathBuf> {
    playstreak_home().map(|h| h.join(DATA_FILE_NAME))
}

/// The project config directory for a working directory.
///
/// The nearest ancestor (including `cwd`) holding a `.playstreak/`
/// directory wins; otherwise `<cwd>/.playstreak`.
pub fn project_config_dir(cwd: &Path) -> PathBuf {
    cwd.ancestors()
        .map(|ancestor| ancestor.join(CONFIG_DIR_NAME))
        .find(|dir| dir.is_dir())
        .unwrap_or_else(|| cwd.join(CONFIG_DIR_NAME))
}
