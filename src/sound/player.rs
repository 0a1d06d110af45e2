//! Sound player implementation using rodio.
//!
//! This module provides the `RodioSoundPlayer` which uses the rodio v0.20
//! audio library for cross-platform sound playback.

use std::fs::File;
use std::io::BufReader;
use std::time::Duration;

use rodio::source::{SineWave, Source};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use tracing::{debug, warn};

use super::error::SoundError;
use super::source::SoundSource;

/// Notes of the built-in chime: (frequency in Hz, length in ms).
const CHIME_NOTES: &[(f32, u64)] = &[(659.25, 350), (783.99, 350), (987.77, 700)];

/// A sound player that uses rodio for audio playback.
///
/// The output stream is not `Send`; keep the player on the thread that
/// created it. Playback is non-blocking and continues in the background.
pub struct RodioSoundPlayer {
    /// The audio output stream (must be kept alive for playback).
    _stream: OutputStream,
    /// Handle to the output stream for creating sinks.
    stream_handle: OutputStreamHandle,
    volume: f32,
}

impl RodioSoundPlayer {
    /// Creates a new sound player playing at `volume` (0.0-1.0).
    ///
    /// # Errors
    ///
    /// Returns `SoundError::DeviceNotAvailable` if no audio output device
    /// is available.
    pub fn new(volume: f32) -> Result<Self, SoundError> {
        let (stream, stream_handle) = OutputStream::try_default()
            .map_err(|e| SoundError::DeviceNotAvailable(e.to_string()))?;

        debug!("Audio output stream initialized");

        Ok(Self {
            _stream: stream,
            stream_handle,
            volume: volume.clamp(0.0, 1.0),
        })
    }

    /// Starts playing `source`. Returns once playback has started.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The audio file cannot be opened
    /// - The audio format cannot be decoded
    /// - No output sink can be created
    pub fn play(&self, source: &SoundSource) -> Result<(), SoundError> {
        let sink = self.new_sink()?;

        match source {
            SoundSource::File { path, name } => {
                debug!(sound = %name, "playing azaan file");
                let file = File::open(path)
                    .map_err(|e| SoundError::FileNotFound(format!("{}: {}", path.display(), e)))?;
                let decoder = Decoder::new(BufReader::new(file))
                    .map_err(|e| SoundError::DecodeError(e.to_string()))?;
                sink.append(decoder);
            }
            SoundSource::Chime => {
                debug!("playing built-in chime");
                for &(frequency, millis) in CHIME_NOTES {
                    sink.append(
                        SineWave::new(frequency)
                            .take_duration(Duration::from_millis(millis))
                            .amplify(0.4),
                    );
                }
            }
        }

        sink.detach(); // Non-blocking: sound continues after function returns

        debug!("Sound playback started (detached)");
        Ok(())
    }

    fn new_sink(&self) -> Result<Sink, SoundError> {
        let sink = Sink::try_new(&self.stream_handle)
            .map_err(|e| SoundError::StreamError(e.to_string()))?;
        sink.set_volume(self.volume);
        Ok(sink)
    }

    /// Playback volume.
    #[must_use]
    pub fn volume(&self) -> f32 {
        self.volume
    }
}

impl std::fmt::Debug for RodioSoundPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RodioSoundPlayer")
            .field("volume", &self.volume)
            .finish_non_exhaustive()
    }
}

/// Creates a sound player, returning None if audio is unavailable.
///
/// If audio initialization fails, a warning is logged and None is returned.
#[must_use]
pub fn try_create_player(volume: f32) -> Option<RodioSoundPlayer> {
    match RodioSoundPlayer::new(volume) {
        Ok(player) => Some(player),
        Err(e) => {
            warn!("Audio not available, azaan playback disabled: {}", e);
            None
        }
    }
}
