//! Sound source management.
//!
//! The azaan is either a user-supplied audio file or a short chime
//! synthesized at playback time.

use std::path::{Path, PathBuf};

use super::error::SoundError;

/// Represents the source of a sound to be played.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoundSource {
    /// An audio file on disk.
    File {
        /// File stem, used in logs.
        name: String,
        path: PathBuf,
    },
    /// The built-in chime.
    Chime,
}

/// Supported audio file extensions.
const SUPPORTED_EXTENSIONS: &[&str] = &["wav", "mp3", "ogg", "flac"];

impl SoundSource {
    /// Creates a file source without checking the path.
    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "azaan".to_string());
        Self::File { name, path }
    }

    /// Creates a file source, rejecting unsupported extensions.
    ///
    /// Existence is checked at playback time so that a file added later
    /// still plays.
    pub fn file_validated(path: impl Into<PathBuf>) -> Result<Self, SoundError> {
        let path = path.into();
        validate_extension(&path)?;
        Ok(Self::file(path))
    }

    /// The azaan source for an optional configured path.
    pub fn azaan(audio_path: Option<&Path>) -> Result<Self, SoundError> {
        match audio_path {
            Some(path) => Self::file_validated(path),
            None => Ok(Self::Chime),
        }
    }

    /// Returns the name of the sound source.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::File { name, .. } => name,
            Self::Chime => "chime",
        }
    }

    #[must_use]
    pub fn is_file(&self) -> bool {
        matches!(self, Self::File { .. })
    }

    /// Returns the file path if this is a file source.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::File { path, .. } => Some(path),
            Self::Chime => None,
        }
    }
}

fn validate_extension(path: &Path) -> Result<(), SoundError> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    if SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        Ok(())
    } else {
        Err(SoundError::UnsupportedFormat(path.display().to_string()))
    }
}
