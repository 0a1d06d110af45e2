//! Daemon and CLI configuration.
//!
//! Settings are read from `<data_dir>/config.json`. A missing file yields
//! the defaults. The data directory is `~/.azaan` unless `AZAAN_HOME` is set.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::prayer::DEFAULT_MASJID_NAME;

/// Environment variable overriding the data directory.
pub const HOME_ENV: &str = "AZAAN_HOME";

/// Config file name inside the data directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

// ============================================================================
// ConfigError
// ============================================================================

/// Configuration error type.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither `AZAAN_HOME` nor a home directory is available.
    #[error("Failed to get home directory")]
    HomeDirectoryNotFound,

    /// The config file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid JSON for `AzaanConfig`.
    #[error("Failed to parse config file {0}: {1}")]
    Parse(PathBuf, String),

    /// A value is outside its allowed range.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Returns true if the error comes from a bad value rather than I/O.
    #[must_use]
    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Parse(..) | Self::Invalid(_))
    }

    /// Returns a user-friendly suggestion for resolving this error.
    #[must_use]
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::HomeDirectoryNotFound => "set AZAAN_HOME to a writable directory",
            Self::Read { .. } => "check permissions of config.json",
            Self::Parse(..) => "fix the JSON in config.json or delete it to use defaults",
            Self::Invalid(_) => "volume must be 0.0-1.0 and banner_seconds 1-60",
        }
    }
}

// ============================================================================
// AzaanConfig
// ============================================================================

fn default_masjid_name() -> String {
    DEFAULT_MASJID_NAME.to_string()
}

fn default_volume() -> f32 {
    0.8
}

fn default_banner_seconds() -> u64 {
    5
}

/// Runtime configuration.
///
/// Path fields left unset resolve inside the data directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AzaanConfig {
    /// Directory holding the socket, store and permission files.
    #[serde(skip)]
    pub data_dir: PathBuf,

    /// Masjid name stamped on new records.
    #[serde(default = "default_masjid_name")]
    pub masjid_name: String,

    #[serde(default)]
    pub socket_path: Option<PathBuf>,

    #[serde(default)]
    pub store_path: Option<PathBuf>,

    #[serde(default)]
    pub permission_path: Option<PathBuf>,

    /// Azaan clip to play. `None` plays the built-in chime.
    #[serde(default)]
    pub audio_path: Option<PathBuf>,

    /// Playback volume (0.0-1.0).
    #[serde(default = "default_volume")]
    pub volume: f32,

    /// How long the "now playing" banner stays visible (1-60 seconds).
    #[serde(default = "default_banner_seconds")]
    pub banner_seconds: u64,

    /// Program and arguments used to open a foreground client when none is
    /// connected. `--play <prayer>` is appended for play requests.
    /// Defaults to `azaan watch`.
    #[serde(default)]
    pub open_client_command: Option<Vec<String>>,
}

impl Default for AzaanConfig {
    fn default() -> Self {
        Self::with_data_dir(PathBuf::from(".azaan"))
    }
}

impl AzaanConfig {
    /// Creates a default configuration rooted at `data_dir`.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            masjid_name: default_masjid_name(),
            socket_path: None,
            store_path: None,
            permission_path: None,
            audio_path: None,
            volume: default_volume(),
            banner_seconds: default_banner_seconds(),
            open_client_command: None,
        }
    }

    /// Loads the configuration from the default data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be determined or the
    /// config file is unreadable or invalid.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(data_dir()?)
    }

    /// Loads the configuration from `<data_dir>/config.json`.
    pub fn load_from(data_dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let data_dir = data_dir.into();
        let path = data_dir.join(CONFIG_FILE_NAME);

        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            serde_json::from_str::<AzaanConfig>(&raw)
                .map_err(|e| ConfigError::Parse(path.clone(), e.to_string()))?
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            AzaanConfig::default()
        };

        config.data_dir = data_dir;
        config.validate()?;
        Ok(config)
    }

    /// Validates value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(ConfigError::Invalid(format!(
                "volume {} is outside 0.0-1.0",
                self.volume
            )));
        }
        if !(1..=60).contains(&self.banner_seconds) {
            return Err(ConfigError::Invalid(format!(
                "banner_seconds {} is outside 1-60",
                self.banner_seconds
            )));
        }
        if matches!(&self.open_client_command, Some(cmd) if cmd.is_empty()) {
            return Err(ConfigError::Invalid(
                "open_client_command must name a program".to_string(),
            ));
        }
        Ok(())
    }

    /// Unix socket the daemon listens on.
    pub fn socket_path(&self) -> PathBuf {
        self.resolve(&self.socket_path, "azaan.sock")
    }

    /// JSON file holding prayer records.
    pub fn store_path(&self) -> PathBuf {
        self.resolve(&self.store_path, "prayer_times.json")
    }

    /// JSON file holding the permission decision.
    pub fn permission_path(&self) -> PathBuf {
        self.resolve(&self.permission_path, "permission.json")
    }

    /// Banner duration.
    pub fn banner_duration(&self) -> Duration {
        Duration::from_secs(self.banner_seconds)
    }

    fn resolve(&self, configured: &Option<PathBuf>, file_name: &str) -> PathBuf {
        match configured {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => self.data_dir.join(path),
            None => self.data_dir.join(file_name),
        }
    }
}

/// Returns the data directory: `$AZAAN_HOME`, else `~/.azaan`.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    if let Some(home) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(home));
    }

    dirs::home_dir()
        .map(|home| home.join(".azaan"))
        .ok_or(ConfigError::HomeDirectoryNotFound)
}

// ============================================================================
// Tests
// ============================================================================
