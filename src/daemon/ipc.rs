//! IPC server for the azaan daemon.
//!
//! This module provides Unix Domain Socket IPC functionality:
//! - Server that listens on a Unix socket
//! - Request/response handling for scheduling commands
//! - Long-lived `watch` connections for foreground clients

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Mutex;
use tokio::time::{timeout, Duration};

use crate::notification::{
    create_test_content, NotificationSender, PermissionGate, PermissionPlatform,
};
use crate::prayer::evaluate;
use crate::types::{IpcRequest, IpcResponse, PrayerTimeSet, ResponseData};

use super::clock::Clock;
use super::router::ClientRegistry;
use super::scheduler::NotificationScheduler;

// ============================================================================
// Constants
// ============================================================================

/// Maximum request size in bytes (4KB)
const MAX_REQUEST_SIZE: usize = 4096;

/// Read timeout in seconds
const READ_TIMEOUT_SECS: u64 = 5;

// ============================================================================
// IpcError
// ============================================================================

/// IPC-specific error types.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    /// Read error
    #[error("Failed to read request: {0}")]
    ReadError(String),

    /// Write error
    #[error("Failed to write response: {0}")]
    WriteError(String),

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,

    /// Request too large
    #[error("Request too large (max {MAX_REQUEST_SIZE} bytes)")]
    RequestTooLarge,
}

// ============================================================================
// IpcServer
// ============================================================================

/// Unix Domain Socket IPC server.
pub struct IpcServer {
    listener: UnixListener,
    /// Removed on drop
    socket_path: PathBuf,
}

impl IpcServer {
    /// Creates a new IPC server bound to the specified socket path.
    ///
    /// A stale socket file left by a previous daemon is removed first.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound.
    pub fn new(socket_path: &Path) -> Result<Self> {
        if socket_path.exists() {
            std::fs::remove_file(socket_path)
                .with_context(|| format!("Failed to remove existing socket: {:?}", socket_path))?;
        }

        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create socket directory: {:?}", parent))?;
        }

        let listener = UnixListener::bind(socket_path)
            .with_context(|| format!("Failed to bind Unix socket: {:?}", socket_path))?;

        Ok(Self {
            listener,
            socket_path: socket_path.to_path_buf(),
        })
    }

    /// Accepts an incoming client connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be accepted.
    pub async fn accept(&self) -> Result<UnixStream> {
        let (stream, _addr) = self
            .listener
            .accept()
            .await
            .context("Failed to accept connection")?;
        Ok(stream)
    }

    /// Receives and deserializes an IPC request from the stream.
    ///
    /// Applies a read timeout to prevent blocking indefinitely.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or deserialization fails.
    pub async fn receive_request(stream: &mut UnixStream) -> Result<IpcRequest> {
        let mut buffer = vec![0u8; MAX_REQUEST_SIZE];

        let read_result = timeout(
            Duration::from_secs(READ_TIMEOUT_SECS),
            stream.read(&mut buffer),
        )
        .await;

        let n = match read_result {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(IpcError::ReadError(e.to_string()).into()),
            Err(_) => return Err(IpcError::Timeout.into()),
        };

        if n == 0 {
            anyhow::bail!("Connection closed by client");
        }
        if n == MAX_REQUEST_SIZE {
            return Err(IpcError::RequestTooLarge.into());
        }

        let request: IpcRequest = serde_json::from_slice(&buffer[..n])
            .with_context(|| "Failed to deserialize IPC request")?;

        Ok(request)
    }

    /// Serializes and sends an IPC response to the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub async fn send_response<W>(stream: &mut W, response: &IpcResponse) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let json = serde_json::to_vec(response).context("Failed to serialize IPC response")?;

        stream
            .write_all(&json)
            .await
            .map_err(|e| IpcError::WriteError(e.to_string()))?;
        stream.flush().await.context("Failed to flush response")?;

        Ok(())
    }

    /// Sends `value` as one JSON line.
    async fn send_line<W, T>(stream: &mut W, value: &T) -> Result<()>
    where
        W: AsyncWrite + Unpin,
        T: serde::Serialize,
    {
        let mut json = serde_json::to_vec(value).context("Failed to serialize message")?;
        json.push(b'\n');
        stream
            .write_all(&json)
            .await
            .map_err(|e| IpcError::WriteError(e.to_string()))?;
        stream.flush().await.context("Failed to flush message")?;
        Ok(())
    }

    /// Returns the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

// ============================================================================
// RequestHandler
// ============================================================================

/// Handles IPC requests against the scheduler, the client registry and the
/// permission gate.
pub struct RequestHandler<C, S, P>
where
    C: Clock,
    S: NotificationSender,
    P: PermissionPlatform,
{
    scheduler: Arc<Mutex<NotificationScheduler<C>>>,
    registry: Arc<Mutex<ClientRegistry>>,
    gate: Arc<PermissionGate<P>>,
    sender: Arc<S>,
}

impl<C, S, P> RequestHandler<C, S, P>
where
    C: Clock,
    S: NotificationSender,
    P: PermissionPlatform + 'static,
{
    pub fn new(
        scheduler: Arc<Mutex<NotificationScheduler<C>>>,
        registry: Arc<Mutex<ClientRegistry>>,
        gate: Arc<PermissionGate<P>>,
        sender: Arc<S>,
    ) -> Self {
        Self {
            scheduler,
            registry,
            gate,
            sender,
        }
    }

    /// Reads one request from `stream` and serves it. `watch` keeps the
    /// connection open until the client goes away.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be read or the reply cannot
    /// be written.
    pub async fn serve(&self, mut stream: UnixStream) -> Result<()> {
        let request = match IpcServer::receive_request(&mut stream).await {
            Ok(request) => request,
            Err(e) => {
                let response = IpcResponse::error(format!("Invalid request: {e}"));
                IpcServer::send_response(&mut stream, &response).await?;
                return Err(e);
            }
        };
        tracing::debug!(?request, "IPC request");

        match request {
            IpcRequest::Watch => self.watch(stream).await,
            other => {
                let response = self.handle(other).await;
                IpcServer::send_response(&mut stream, &response).await
            }
        }
    }

    /// Handles a single-reply request.
    pub async fn handle(&self, request: IpcRequest) -> IpcResponse {
        match request {
            IpcRequest::Schedule { times } => self.handle_schedule(times).await,
            IpcRequest::Cancel => self.handle_cancel().await,
            IpcRequest::Status => self.handle_status().await,
            IpcRequest::TestNotification => self.handle_test_notification(),
            IpcRequest::Watch => IpcResponse::error("watch needs its own connection"),
        }
    }

    async fn handle_schedule(&self, times: PrayerTimeSet) -> IpcResponse {
        let scheduled = self.scheduler.lock().await.schedule(times);

        IpcResponse::success(
            format!("Scheduled {} prayer notifications", scheduled.len()),
            Some(ResponseData {
                scheduled: Some(scheduled),
                times: Some(times),
                ..Default::default()
            }),
        )
    }

    async fn handle_cancel(&self) -> IpcResponse {
        self.scheduler.lock().await.cancel_all();
        IpcResponse::success(
            "Cancelled all prayer notifications",
            Some(ResponseData {
                scheduled: Some(Vec::new()),
                ..Default::default()
            }),
        )
    }

    async fn handle_status(&self) -> IpcResponse {
        let scheduler = self.scheduler.lock().await;
        let mut data = ResponseData {
            scheduled: Some(scheduler.scheduled()),
            times: scheduler.times(),
            permission: Some(self.gate.status()),
            ..Default::default()
        };

        if let Some(times) = scheduler.times() {
            let status = evaluate(&times, scheduler.now().time());
            data.current_prayer = Some(status.current.prayer);
            data.next_prayer = Some(status.next.prayer);
            data.countdown = Some(status.countdown());
        }

        IpcResponse::success("", Some(data))
    }

    /// Shows the test notification without waiting for the user.
    fn handle_test_notification(&self) -> IpcResponse {
        if let Err(e) = self.gate.ensure_granted() {
            return IpcResponse::error(format!("{e} ({})", e.suggestion()));
        }
        if !self.sender.is_available() {
            return IpcResponse::error("No notification service is running");
        }

        let sender = Arc::clone(&self.sender);
        tokio::spawn(async move {
            if let Err(e) = sender.show(&create_test_content()).await {
                tracing::warn!(error = %e, "failed to show test notification");
            }
        });

        IpcResponse::success("Test notification sent", None)
    }

    /// Registers the connection as a foreground client and streams bridge
    /// messages to it as JSON lines.
    ///
    /// Messages that could not be written, or were still queued when the
    /// client went away, are requeued on the registry.
    async fn watch(&self, stream: UnixStream) -> Result<()> {
        let (id, mut messages) = self.registry.lock().await.register();
        let (mut reader, mut writer) = stream.into_split();

        let ack = IpcResponse::success(
            "Watching for azaan requests",
            Some(ResponseData {
                client_id: Some(id.to_string()),
                ..Default::default()
            }),
        );

        let mut undelivered = Vec::new();
        let result = async {
            IpcServer::send_line(&mut writer, &ack).await?;

            let mut scratch = [0u8; 64];
            loop {
                tokio::select! {
                    message = messages.recv() => {
                        let Some(message) = message else { break };
                        if let Err(e) = IpcServer::send_line(&mut writer, &message).await {
                            undelivered.push(message);
                            return Err(e);
                        }
                        tracing::debug!(client = %id, ?message, "pushed bridge message");
                    }
                    read = reader.read(&mut scratch) => {
                        // Anything but EOF is ignored
                        match read {
                            Ok(0) | Err(_) => break,
                            Ok(_) => {}
                        }
                    }
                }
            }
            Ok::<(), anyhow::Error>(())
        }
        .await;

        // Anything this client did not receive goes back to the router
        let mut registry = self.registry.lock().await;
        registry.unregister(id);
        messages.close();
        while let Ok(message) = messages.try_recv() {
            undelivered.push(message);
        }
        for message in undelivered {
            registry.requeue(message);
        }
        result
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::sync::mpsc;

    use crate::daemon::clock::FixedClock;
    use crate::daemon::router::RouteRequest;
    use crate::daemon::scheduler::FireEvent;
    use crate::notification::{MockNotificationSender, MockPermissionPlatform, TEST_TAG};
    use crate::types::{BridgeMessage, PermissionStatus, PrayerName};

    // ------------------------------------------------------------------------
    // Helper functions
    // ------------------------------------------------------------------------

    type TestHandler = RequestHandler<FixedClock, MockNotificationSender, MockPermissionPlatform>;

    struct Fixture {
        handler: Arc<TestHandler>,
        registry: Arc<Mutex<ClientRegistry>>,
        sender: Arc<MockNotificationSender>,
        _fire_rx: mpsc::UnboundedReceiver<FireEvent>,
    }

    fn create_temp_socket_path() -> PathBuf {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.sock");
        // Keep the directory so it's not deleted
        std::mem::forget(dir);
        path
    }

    fn create_fixture(platform: MockPermissionPlatform) -> Fixture {
        create_fixture_with_registry(platform, ClientRegistry::new())
    }

    fn create_fixture_with_registry(
        platform: MockPermissionPlatform,
        registry: ClientRegistry,
    ) -> Fixture {
        let (fire_tx, fire_rx) = mpsc::unbounded_channel();
        let clock = FixedClock::at("2025-06-15", "14:00:00").unwrap();
        let scheduler = Arc::new(Mutex::new(NotificationScheduler::new(clock, fire_tx)));
        let registry = Arc::new(Mutex::new(registry));
        let sender = Arc::new(MockNotificationSender::new());
        let handler = RequestHandler::new(
            scheduler,
            Arc::clone(&registry),
            Arc::new(PermissionGate::new(platform)),
            Arc::clone(&sender),
        );
        Fixture {
            handler: Arc::new(handler),
            registry,
            sender,
            _fire_rx: fire_rx,
        }
    }

    fn sample_times() -> PrayerTimeSet {
        PrayerTimeSet::parse("05:30", "12:30", "15:45", "18:15", "19:30").unwrap()
    }

    // ------------------------------------------------------------------------
    // IpcServer Tests
    // ------------------------------------------------------------------------

    mod ipc_server_tests {
        use super::*;

        #[tokio::test]
        async fn test_server_creation() {
            let socket_path = create_temp_socket_path();
            let server = IpcServer::new(&socket_path);

            assert!(server.is_ok());
            assert!(socket_path.exists());
        }

        #[tokio::test]
        async fn test_server_removes_existing_socket() {
            let socket_path = create_temp_socket_path();
            std::fs::write(&socket_path, "stale").unwrap();

            assert!(IpcServer::new(&socket_path).is_ok());
        }

        #[tokio::test]
        async fn test_server_creates_parent_directory() {
            let dir = tempfile::tempdir().unwrap();
            let socket_path = dir.path().join("subdir").join("test.sock");

            let server = IpcServer::new(&socket_path);
            assert!(server.is_ok());
            assert!(socket_path.parent().unwrap().exists());
        }

        #[tokio::test]
        async fn test_receive_request_schedule() {
            let socket_path = create_temp_socket_path();
            let server = IpcServer::new(&socket_path).unwrap();

            let client_path = socket_path.clone();
            let client_handle = tokio::spawn(async move {
                let mut stream = UnixStream::connect(&client_path).await.unwrap();
                let request = r#"{"command":"schedule","times":{"fajr":"05:30","dhuhr":"12:30","asr":"15:45","maghrib":"18:15","isha":"19:30"}}"#;
                stream.write_all(request.as_bytes()).await.unwrap();
                stream.flush().await.unwrap();
            });

            let mut stream = server.accept().await.unwrap();
            let request = IpcServer::receive_request(&mut stream).await.unwrap();

            match request {
                IpcRequest::Schedule { times } => assert_eq!(times, sample_times()),
                other => panic!("Expected Schedule request, got {other:?}"),
            }
            client_handle.await.unwrap();
        }

        #[tokio::test]
        async fn test_receive_request_invalid_json() {
            let socket_path = create_temp_socket_path();
            let server = IpcServer::new(&socket_path).unwrap();

            let client_path = socket_path.clone();
            let _client = tokio::spawn(async move {
                let mut stream = UnixStream::connect(&client_path).await.unwrap();
                stream.write_all(b"not valid json").await.unwrap();
                stream.flush().await.unwrap();
            });

            let mut stream = server.accept().await.unwrap();
            assert!(IpcServer::receive_request(&mut stream).await.is_err());
        }

        #[tokio::test]
        async fn test_connection_closed() {
            let socket_path = create_temp_socket_path();
            let server = IpcServer::new(&socket_path).unwrap();

            let client_path = socket_path.clone();
            let _client = tokio::spawn(async move {
                let stream = UnixStream::connect(&client_path).await.unwrap();
                drop(stream);
            });

            let mut stream = server.accept().await.unwrap();
            assert!(IpcServer::receive_request(&mut stream).await.is_err());
        }

        #[tokio::test]
        async fn test_server_drop_cleanup() {
            let socket_path = create_temp_socket_path();

            {
                let server = IpcServer::new(&socket_path).unwrap();
                assert_eq!(server.socket_path(), socket_path);
            }

            assert!(!socket_path.exists());
        }

        #[test]
        fn test_ipc_error_display() {
            assert_eq!(IpcError::Timeout.to_string(), "Operation timed out");
            assert!(IpcError::RequestTooLarge.to_string().contains("4096"));
        }
    }

    // ------------------------------------------------------------------------
    // RequestHandler Tests
    // ------------------------------------------------------------------------

    mod request_handler_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_handle_schedule() {
            let fx = create_fixture(MockPermissionPlatform::granted());

            let response = fx
                .handler
                .handle(IpcRequest::Schedule {
                    times: sample_times(),
                })
                .await;

            assert!(response.is_success());
            let scheduled = response.data.unwrap().scheduled.unwrap();
            assert_eq!(scheduled.len(), 5);
            // 14:00 UTC: Asr is the first to fire, Fajr and Dhuhr roll to tomorrow
            assert_eq!(scheduled[0].prayer, PrayerName::Asr);
            assert_eq!(scheduled[0].fire_at, "2025-06-15T15:45:00+00:00");
            assert_eq!(scheduled[3].prayer, PrayerName::Fajr);
            assert_eq!(scheduled[3].fire_at, "2025-06-16T05:30:00+00:00");
        }

        #[tokio::test(start_paused = true)]
        async fn test_handle_status_after_schedule() {
            let fx = create_fixture(MockPermissionPlatform::granted());
            fx.handler
                .handle(IpcRequest::Schedule {
                    times: sample_times(),
                })
                .await;

            let response = fx.handler.handle(IpcRequest::Status).await;

            let data = response.data.unwrap();
            assert_eq!(data.current_prayer, Some(PrayerName::Dhuhr));
            assert_eq!(data.next_prayer, Some(PrayerName::Asr));
            assert_eq!(data.countdown.as_deref(), Some("1h 45m"));
            assert_eq!(data.permission, Some(PermissionStatus::Granted));
            assert_eq!(data.scheduled.unwrap().len(), 5);
        }

        #[tokio::test]
        async fn test_handle_status_without_schedule() {
            let fx = create_fixture(MockPermissionPlatform::new());

            let response = fx.handler.handle(IpcRequest::Status).await;

            assert!(response.is_success());
            let data = response.data.unwrap();
            assert!(data.scheduled.unwrap().is_empty());
            assert!(data.times.is_none());
            assert!(data.next_prayer.is_none());
            assert_eq!(data.permission, Some(PermissionStatus::Undetermined));
        }

        #[tokio::test(start_paused = true)]
        async fn test_handle_cancel() {
            let fx = create_fixture(MockPermissionPlatform::granted());
            fx.handler
                .handle(IpcRequest::Schedule {
                    times: sample_times(),
                })
                .await;

            let response = fx.handler.handle(IpcRequest::Cancel).await;
            assert!(response.is_success());

            let status = fx.handler.handle(IpcRequest::Status).await;
            let data = status.data.unwrap();
            assert!(data.scheduled.unwrap().is_empty());
            assert!(data.times.is_none());
        }

        #[tokio::test]
        async fn test_handle_test_notification() {
            let fx = create_fixture(MockPermissionPlatform::granted());

            let response = fx.handler.handle(IpcRequest::TestNotification).await;
            assert!(response.is_success());

            for _ in 0..10 {
                if fx.sender.notification_count() == 1 {
                    break;
                }
                tokio::task::yield_now().await;
            }
            assert_eq!(fx.sender.shown()[0].tag, TEST_TAG);
        }

        #[tokio::test]
        async fn test_handle_test_notification_without_permission() {
            let fx = create_fixture(MockPermissionPlatform::new());

            let response = fx.handler.handle(IpcRequest::TestNotification).await;

            assert!(!response.is_success());
            assert!(response.message.contains("permission"));
            assert_eq!(fx.sender.notification_count(), 0);
        }

        #[tokio::test]
        async fn test_handle_watch_needs_connection() {
            let fx = create_fixture(MockPermissionPlatform::granted());
            let response = fx.handler.handle(IpcRequest::Watch).await;
            assert!(!response.is_success());
        }
    }

    // ------------------------------------------------------------------------
    // Watch Tests
    // ------------------------------------------------------------------------

    mod watch_tests {
        use super::*;

        #[tokio::test]
        async fn test_watch_streams_bridge_messages() {
            let fx = create_fixture(MockPermissionPlatform::granted());
            let socket_path = create_temp_socket_path();
            let server = IpcServer::new(&socket_path).unwrap();

            let handler = Arc::clone(&fx.handler);
            let server_task = tokio::spawn(async move {
                let stream = server.accept().await.unwrap();
                handler.serve(stream).await
            });

            let mut stream = UnixStream::connect(&socket_path).await.unwrap();
            stream.write_all(br#"{"command":"watch"}"#).await.unwrap();
            let mut lines = BufReader::new(stream).lines();

            let ack: IpcResponse =
                serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
            assert!(ack.is_success());
            assert!(ack.data.unwrap().client_id.is_some());

            let delivered = fx
                .registry
                .lock()
                .await
                .deliver(BridgeMessage::play(PrayerName::Isha));
            assert!(delivered.is_some());

            let line = lines.next_line().await.unwrap().unwrap();
            let message: BridgeMessage = serde_json::from_str(&line).unwrap();
            assert_eq!(message, BridgeMessage::play(PrayerName::Isha));

            // Disconnect and wait for the server to unregister
            drop(lines);
            server_task.await.unwrap().unwrap();
            assert_eq!(fx.registry.lock().await.live_count(), 0);
        }

        #[tokio::test]
        async fn test_watch_requeues_message_after_client_disconnects() {
            let (requeue_tx, mut requeue_rx) = mpsc::unbounded_channel();
            let fx = create_fixture_with_registry(
                MockPermissionPlatform::granted(),
                ClientRegistry::with_requeue(requeue_tx),
            );
            let socket_path = create_temp_socket_path();
            let server = IpcServer::new(&socket_path).unwrap();

            let handler = Arc::clone(&fx.handler);
            let server_task = tokio::spawn(async move {
                let stream = server.accept().await.unwrap();
                handler.serve(stream).await
            });

            let mut stream = UnixStream::connect(&socket_path).await.unwrap();
            stream.write_all(br#"{"command":"watch"}"#).await.unwrap();
            let mut lines = BufReader::new(stream).lines();
            lines.next_line().await.unwrap().unwrap();

            // Accepted by the registry, but the client is gone before the
            // server can write it
            let delivered = fx
                .registry
                .lock()
                .await
                .deliver(BridgeMessage::play(PrayerName::Isha));
            assert!(delivered.is_some());
            drop(lines);

            // Either the write fails or EOF wins; both requeue the message
            let _ = server_task.await.unwrap();
            assert_eq!(
                requeue_rx.recv().await,
                Some(RouteRequest::Play(PrayerName::Isha))
            );
            assert!(requeue_rx.try_recv().is_err());
            assert_eq!(fx.registry.lock().await.live_count(), 0);
        }
    }
}
