//! Sound system error types.
//!
//! Playback errors never leave the foreground bridge; they are logged and
//! the "now playing" event is not raised.

use thiserror::Error;

/// Errors that can occur in the sound playback system.
#[derive(Debug, Error)]
pub enum SoundError {
    /// Audio device is not available (e.g., no speakers connected).
    #[error("Audio device not available: {0}")]
    DeviceNotAvailable(String),

    /// The azaan file was not found at the configured path.
    #[error("Azaan audio file not found: {0}")]
    FileNotFound(String),

    /// The file's extension is not a supported audio format.
    #[error("Unsupported audio file: {0}")]
    UnsupportedFormat(String),

    /// Failed to decode the audio file.
    #[error("Failed to decode audio: {0}")]
    DecodeError(String),

    /// Failed to create the audio output stream.
    #[error("Failed to open audio stream: {0}")]
    StreamError(String),

    /// Generic sound playback error.
    #[error("Playback failed: {0}")]
    PlaybackError(String),
}

impl SoundError {
    /// Returns true if this error is related to device availability.
    #[must_use]
    pub fn is_device_error(&self) -> bool {
        matches!(self, Self::DeviceNotAvailable(_) | Self::StreamError(_))
    }

    /// Returns true if this error is related to the audio file.
    #[must_use]
    pub fn is_file_error(&self) -> bool {
        matches!(
            self,
            Self::FileNotFound(_) | Self::UnsupportedFormat(_) | Self::DecodeError(_)
        )
    }

    /// Returns a user-friendly suggestion for resolving this error.
    #[must_use]
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::DeviceNotAvailable(_) => "connect an audio output device",
            Self::FileNotFound(_) => "check audio_path in config.json, or remove it to use the chime",
            Self::UnsupportedFormat(_) => "use a wav, mp3, ogg or flac file",
            Self::DecodeError(_) => "the audio file may be corrupt",
            Self::StreamError(_) => "check your audio settings",
            Self::PlaybackError(_) => "restart the watcher",
        }
    }
}
