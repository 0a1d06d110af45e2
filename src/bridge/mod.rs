//! Foreground bridge.
//!
//! Runs inside a foreground client. It receives `BridgeMessage`s pushed by
//! the daemon, plays the azaan on a play request and broadcasts
//! `AzaanEvent::Playing` to local subscribers. A playback failure is logged
//! and swallowed: no event is raised.

use tokio::sync::broadcast;
use tokio::time::{Duration, Instant};

use crate::sound::{SoundPlayer, SoundSource};
use crate::types::{AzaanEvent, BridgeMessage, PrayerName};

/// Capacity of the playing-event channel.
const EVENT_CAPACITY: usize = 16;

// ============================================================================
// ForegroundBridge
// ============================================================================

/// Turns bridge messages into azaan playback.
#[derive(Debug)]
pub struct ForegroundBridge<P: SoundPlayer> {
    player: P,
    source: SoundSource,
    events: broadcast::Sender<AzaanEvent>,
}

impl<P: SoundPlayer> ForegroundBridge<P> {
    pub fn new(player: P, source: SoundSource) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            player,
            source,
            events,
        }
    }

    /// Subscribes to "now playing" events.
    pub fn subscribe(&self) -> broadcast::Receiver<AzaanEvent> {
        self.events.subscribe()
    }

    /// Handles one message. Returns the raised event, if any.
    pub fn handle(&self, message: BridgeMessage) -> Option<AzaanEvent> {
        match message {
            BridgeMessage::PlayAzaan(payload) => self.play(payload.prayer),
            BridgeMessage::Focus => {
                tracing::info!("focus requested by the daemon");
                None
            }
        }
    }

    /// Handles one newline-delimited JSON message. Anything that is not a
    /// known envelope is ignored.
    pub fn handle_line(&self, line: &str) -> Option<AzaanEvent> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        match serde_json::from_str::<BridgeMessage>(line) {
            Ok(message) => self.handle(message),
            Err(e) => {
                tracing::debug!(error = %e, "ignoring unknown bridge message");
                None
            }
        }
    }

    /// Plays the azaan for `prayer`.
    pub fn play(&self, prayer: PrayerName) -> Option<AzaanEvent> {
        if let Err(e) = self.player.play(&self.source) {
            tracing::error!(
                prayer = %prayer,
                error = %e,
                suggestion = e.suggestion(),
                "failed to play azaan"
            );
            return None;
        }

        tracing::info!(prayer = %prayer, sound = self.source.name(), "azaan playing");
        let event = AzaanEvent::Playing { prayer };
        // No subscribers is fine
        let _ = self.events.send(event);
        Some(event)
    }
}

// ============================================================================
// Banner
// ============================================================================

/// The "now playing" banner, visible for a fixed duration after each event.
#[derive(Debug, Clone)]
pub struct Banner {
    duration: Duration,
    shown: Option<(PrayerName, Instant)>,
}

impl Banner {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            shown: None,
        }
    }

    /// Shows the banner for `event`, restarting the timeout.
    pub fn show(&mut self, event: AzaanEvent) {
        let AzaanEvent::Playing { prayer } = event;
        self.shown = Some((prayer, Instant::now() + self.duration));
    }

    /// The prayer shown, if the banner is still visible.
    pub fn visible(&self) -> Option<PrayerName> {
        self.shown
            .filter(|(_, until)| Instant::now() < *until)
            .map(|(prayer, _)| prayer)
    }

    /// When the banner should be hidden.
    pub fn deadline(&self) -> Option<Instant> {
        self.shown.map(|(_, until)| until)
    }

    pub fn hide(&mut self) {
        self.shown = None;
    }
}

// ============================================================================
// Tests
// ============================================================================
