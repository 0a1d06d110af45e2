//! Azaan playback for the foreground client.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │   SoundPlayer    │ ← Main interface
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐     ┌──────────────────┐
//! │   SoundSource    │────▶│  Azaan file      │
//! │                  │     │  (audio_path)    │
//! │                  │     ├──────────────────┤
//! │                  │────▶│  Built-in chime  │
//! └──────────────────┘     └──────────────────┘
//! ```
//!
//! A configured file that cannot be played is a failure, not a reason to
//! fall back to the chime.
//!
//! # Usage
//!
//! ```rust,no_run
//! use azaan::sound::{RodioSoundPlayer, SoundPlayer, SoundSource};
//!
//! let player = RodioSoundPlayer::new(0.8).expect("audio init");
//! player.play(&SoundSource::Chime).expect("playback failed");
//! ```

mod error;
mod player;
mod source;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

pub use error::SoundError;
pub use player::{try_create_player, RodioSoundPlayer};
pub use source::SoundSource;

/// Trait for sound playback implementations.
///
/// This trait abstracts the sound playback functionality, allowing for
/// different implementations (e.g., rodio-based, mock for testing).
pub trait SoundPlayer {
    /// Starts playing a sound. Non-blocking.
    ///
    /// # Errors
    ///
    /// Returns an error if playback cannot start.
    fn play(&self, source: &SoundSource) -> Result<(), SoundError>;

    /// Returns true if the audio system is available.
    fn is_available(&self) -> bool;
}

impl SoundPlayer for RodioSoundPlayer {
    fn play(&self, source: &SoundSource) -> Result<(), SoundError> {
        RodioSoundPlayer::play(self, source)
    }

    fn is_available(&self) -> bool {
        true
    }
}

/// Player used when no audio device could be opened. Every play fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAudio;

impl SoundPlayer for NoAudio {
    fn play(&self, _source: &SoundSource) -> Result<(), SoundError> {
        Err(SoundError::DeviceNotAvailable(
            "no audio output device".to_string(),
        ))
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// Mock sound player for testing.
#[derive(Debug)]
pub struct MockSoundPlayer {
    play_calls: Mutex<Vec<SoundSource>>,
    available: AtomicBool,
    should_fail: AtomicBool,
}

impl Default for MockSoundPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSoundPlayer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            play_calls: Mutex::new(Vec::new()),
            available: AtomicBool::new(true),
            should_fail: AtomicBool::new(false),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    #[must_use]
    pub fn play_count(&self) -> usize {
        self.play_calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn get_play_calls(&self) -> Vec<SoundSource> {
        self.play_calls
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }
}

impl SoundPlayer for MockSoundPlayer {
    fn play(&self, source: &SoundSource) -> Result<(), SoundError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(SoundError::PlaybackError("Mock failure".to_string()));
        }
        if let Ok(mut calls) = self.play_calls.lock() {
            calls.push(source.clone());
        }
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }
}

impl<P: SoundPlayer> SoundPlayer for std::sync::Arc<P> {
    fn play(&self, source: &SoundSource) -> Result<(), SoundError> {
        (**self).play(source)
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }
}
