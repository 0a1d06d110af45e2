//! Routing of notification responses to foreground clients.
//!
//! Foreground clients are `azaan watch` processes connected over IPC. A
//! play request goes to the first live client; when none is connected a
//! new client is opened with the request on its command line.

use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use anyhow::{Context, Result};
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use crate::config::AzaanConfig;
use crate::types::{BridgeMessage, PrayerName};

// ============================================================================
// RouteRequest
// ============================================================================

/// What the presenter asks the router to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteRequest {
    /// The user pressed "Play Azaan".
    Play(PrayerName),
    /// The user clicked the notification body.
    Focus,
}

impl RouteRequest {
    fn message(self) -> BridgeMessage {
        match self {
            RouteRequest::Play(prayer) => BridgeMessage::play(prayer),
            RouteRequest::Focus => BridgeMessage::Focus,
        }
    }

    fn prayer(self) -> Option<PrayerName> {
        match self {
            RouteRequest::Play(prayer) => Some(prayer),
            RouteRequest::Focus => None,
        }
    }
}

impl From<BridgeMessage> for RouteRequest {
    fn from(message: BridgeMessage) -> Self {
        match message {
            BridgeMessage::PlayAzaan(payload) => RouteRequest::Play(payload.prayer),
            BridgeMessage::Focus => RouteRequest::Focus,
        }
    }
}

/// How a request was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Delivered to an existing client.
    Delivered(Uuid),
    /// No client was connected; a new one was opened.
    Opened,
    /// No client was connected and opening one failed.
    Failed,
}

// ============================================================================
// ClientRegistry
// ============================================================================

#[derive(Debug)]
struct ForegroundClient {
    id: Uuid,
    tx: mpsc::UnboundedSender<BridgeMessage>,
}

/// Connected foreground clients, oldest first.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: Vec<ForegroundClient>,
    /// Where messages a client never received go back for routing.
    requeue_tx: Option<mpsc::UnboundedSender<RouteRequest>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry that hands undelivered messages back to the router.
    pub fn with_requeue(requeue_tx: mpsc::UnboundedSender<RouteRequest>) -> Self {
        Self {
            clients: Vec::new(),
            requeue_tx: Some(requeue_tx),
        }
    }

    /// Registers a client. Messages for it arrive on the returned receiver.
    pub fn register(&mut self) -> (Uuid, mpsc::UnboundedReceiver<BridgeMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        self.clients.push(ForegroundClient { id, tx });
        tracing::info!(client = %id, "foreground client connected");
        (id, rx)
    }

    pub fn unregister(&mut self, id: Uuid) {
        self.clients.retain(|c| c.id != id);
        tracing::info!(client = %id, "foreground client disconnected");
    }

    /// Number of clients whose connection is still open.
    pub fn live_count(&mut self) -> usize {
        self.prune();
        self.clients.len()
    }

    /// Sends `message` to the first live client.
    pub fn deliver(&mut self, message: BridgeMessage) -> Option<Uuid> {
        self.prune();

        while let Some(client) = self.clients.first() {
            if client.tx.send(message).is_ok() {
                return Some(client.id);
            }
            let id = client.id;
            self.clients.remove(0);
            tracing::debug!(client = %id, "dropping client that went away");
        }
        None
    }

    /// Routes `message` again after its client failed to receive it.
    pub fn requeue(&self, message: BridgeMessage) {
        let request = RouteRequest::from(message);
        match &self.requeue_tx {
            Some(tx) if tx.send(request).is_ok() => {
                tracing::info!(?request, "re-routing undelivered message");
            }
            _ => tracing::warn!(?request, "dropping undelivered message"),
        }
    }

    fn prune(&mut self) {
        self.clients.retain(|c| !c.tx.is_closed());
    }
}

// ============================================================================
// ClientLauncher
// ============================================================================

/// Opens a new foreground client.
pub trait ClientLauncher: Send + Sync + 'static {
    /// Opens a client, asking it to play the azaan for `prayer` if given.
    fn open(&self, prayer: Option<PrayerName>) -> Result<()>;
}

/// Launches `azaan watch` (or a configured command) as a detached process.
#[derive(Debug, Clone)]
pub struct CommandLauncher {
    program: String,
    args: Vec<String>,
}

impl CommandLauncher {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Uses `open_client_command` when set, else this executable's `watch`.
    pub fn from_config(config: &AzaanConfig) -> Self {
        if let Some((program, args)) = config
            .open_client_command
            .as_ref()
            .and_then(|cmd| cmd.split_first())
        {
            return Self::new(program.clone(), args.to_vec());
        }

        let program = std::env::current_exe()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "azaan".to_string());
        Self::new(program, vec!["watch".to_string()])
    }

    /// Arguments for a launch, `--play <prayer>` appended when given.
    pub fn args_for(&self, prayer: Option<PrayerName>) -> Vec<String> {
        let mut args = self.args.clone();
        if let Some(prayer) = prayer {
            args.push("--play".to_string());
            args.push(prayer.as_str().to_string());
        }
        args
    }
}

impl ClientLauncher for CommandLauncher {
    fn open(&self, prayer: Option<PrayerName>) -> Result<()> {
        let args = self.args_for(prayer);
        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to launch foreground client: {}", self.program))?;

        tracing::info!(program = %self.program, ?args, pid = child.id(), "opened foreground client");

        // Reap the child when it exits
        std::thread::spawn(move || {
            let _ = child.wait();
        });
        Ok(())
    }
}

/// Records launches instead of spawning processes.
#[derive(Debug, Default)]
pub struct MockClientLauncher {
    opened: StdMutex<Vec<Option<PrayerName>>>,
    should_fail: AtomicBool,
}

impl MockClientLauncher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    #[must_use]
    pub fn opened(&self) -> Vec<Option<PrayerName>> {
        self.opened.lock().map(|o| o.clone()).unwrap_or_default()
    }
}

impl ClientLauncher for MockClientLauncher {
    fn open(&self, prayer: Option<PrayerName>) -> Result<()> {
        if self.should_fail.load(Ordering::SeqCst) {
            anyhow::bail!("Mock launch failure");
        }
        if let Ok(mut opened) = self.opened.lock() {
            opened.push(prayer);
        }
        Ok(())
    }
}

impl<L: ClientLauncher> ClientLauncher for Arc<L> {
    fn open(&self, prayer: Option<PrayerName>) -> Result<()> {
        (**self).open(prayer)
    }
}

// ============================================================================
// ClientRouter
// ============================================================================

/// Resolves route requests against the registry, opening a client when
/// none is connected.
pub struct ClientRouter<L: ClientLauncher> {
    registry: Arc<Mutex<ClientRegistry>>,
    launcher: L,
}

impl<L: ClientLauncher> ClientRouter<L> {
    pub fn new(registry: Arc<Mutex<ClientRegistry>>, launcher: L) -> Self {
        Self { registry, launcher }
    }

    /// Routes one request.
    pub async fn route(&self, request: RouteRequest) -> RouteOutcome {
        let delivered = self.registry.lock().await.deliver(request.message());
        if let Some(id) = delivered {
            tracing::info!(client = %id, ?request, "routed to existing client");
            return RouteOutcome::Delivered(id);
        }

        match self.launcher.open(request.prayer()) {
            Ok(()) => RouteOutcome::Opened,
            Err(e) => {
                tracing::warn!(error = %e, ?request, "no foreground client available");
                RouteOutcome::Failed
            }
        }
    }

    /// Routes requests until the channel closes.
    pub async fn run(self, mut requests: mpsc::UnboundedReceiver<RouteRequest>) {
        while let Some(request) = requests.recv().await {
            self.route(request).await;
        }
        tracing::debug!("router stopped");
    }
}

// ============================================================================
// Tests
// ============================================================================
