//! IPC client for communicating with the azaan daemon.
//!
//! This module provides:
//! - Unix Domain Socket client
//! - Request/response handling
//! - Connection retry logic
//! - The long-lived `watch` stream used by foreground clients

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::unix::OwnedReadHalf;
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::UnixStream;
use tokio::time::timeout;

use crate::types::{BridgeMessage, IpcRequest, IpcResponse, PrayerTimeSet};

// ============================================================================
// Constants
// ============================================================================

/// Connection timeout in seconds
const CONNECTION_TIMEOUT_SECS: u64 = 5;

/// Read/write timeout in seconds
const IO_TIMEOUT_SECS: u64 = 5;

/// Maximum response size in bytes (64KB)
const MAX_RESPONSE_SIZE: usize = 65536;

/// Maximum retry attempts
const MAX_RETRIES: u32 = 3;

/// Retry delay in milliseconds (base delay, multiplied by attempt number)
const RETRY_DELAY_MS: u64 = 500;

// ============================================================================
// IpcClient
// ============================================================================

/// IPC client for daemon communication.
pub struct IpcClient {
    socket_path: PathBuf,
    /// Connection timeout
    timeout: Duration,
}

impl IpcClient {
    /// Creates a client for the daemon socket at `socket_path`.
    pub fn with_socket_path(socket_path: PathBuf) -> Self {
        Self {
            socket_path,
            timeout: Duration::from_secs(CONNECTION_TIMEOUT_SECS),
        }
    }

    /// Returns the socket path.
    pub fn socket_path(&self) -> &PathBuf {
        &self.socket_path
    }

    /// Arms notifications for `times`.
    pub async fn schedule(&self, times: PrayerTimeSet) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Schedule { times })
            .await
    }

    /// Cancels every armed notification.
    pub async fn cancel(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Cancel).await
    }

    /// Sends a status query to the daemon.
    pub async fn status(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Status).await
    }

    /// Asks the daemon to show the test notification.
    pub async fn test_notification(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::TestNotification)
            .await
    }

    /// Registers as a foreground client.
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon is unreachable or refuses the watch.
    pub async fn watch(&self) -> Result<WatchStream> {
        let stream = self.connect().await?;
        let (reader, mut writer) = stream.into_split();

        let request =
            serde_json::to_vec(&IpcRequest::Watch).context("Failed to serialize watch request")?;
        timeout(
            Duration::from_secs(IO_TIMEOUT_SECS),
            writer.write_all(&request),
        )
        .await
        .context("Write timed out")?
        .context("Failed to send watch request")?;

        let mut lines = BufReader::new(reader).lines();
        let ack = timeout(Duration::from_secs(IO_TIMEOUT_SECS), lines.next_line())
            .await
            .context("Read timed out")?
            .context("Failed to read watch response")?
            .context("The daemon closed the connection")?;

        let response: IpcResponse =
            serde_json::from_str(&ack).context("Failed to parse watch response")?;
        if !response.is_success() {
            anyhow::bail!("{}", response.message);
        }

        let client_id = response
            .data
            .and_then(|d| d.client_id)
            .unwrap_or_default();

        Ok(WatchStream {
            client_id,
            lines,
            _writer: writer,
        })
    }

    /// Sends a request to the daemon with retry logic.
    async fn send_request_with_retry(&self, request: &IpcRequest) -> Result<IpcResponse> {
        let mut last_error = None;

        for attempt in 1..=MAX_RETRIES {
            match self.send_request(request).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    tracing::warn!("Request failed (attempt {}/{}): {}", attempt, MAX_RETRIES, e);
                    last_error = Some(e);

                    if attempt < MAX_RETRIES {
                        let delay = Duration::from_millis(RETRY_DELAY_MS * u64::from(attempt));
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Request was not sent")))
    }

    async fn connect(&self) -> Result<UnixStream> {
        timeout(self.timeout, UnixStream::connect(&self.socket_path))
            .await
            .context("Connection timed out")?
            .context("Cannot connect to the daemon. Start it with 'azaan daemon'")
    }

    /// Sends a single request to the daemon.
    async fn send_request(&self, request: &IpcRequest) -> Result<IpcResponse> {
        let mut stream = self.connect().await?;

        let request_json =
            serde_json::to_string(request).context("Failed to serialize request")?;

        timeout(
            Duration::from_secs(IO_TIMEOUT_SECS),
            stream.write_all(request_json.as_bytes()),
        )
        .await
        .context("Write timed out")?
        .context("Failed to send request")?;

        timeout(Duration::from_secs(IO_TIMEOUT_SECS), stream.flush())
            .await
            .context("Flush timed out")?
            .context("Failed to flush request")?;

        // Shutdown write side to signal end of request
        stream
            .shutdown()
            .await
            .context("Failed to shut down write side")?;

        let mut buffer = vec![0u8; MAX_RESPONSE_SIZE];
        let n = timeout(
            Duration::from_secs(IO_TIMEOUT_SECS),
            stream.read(&mut buffer),
        )
        .await
        .context("Read timed out")?
        .context("Failed to receive response")?;

        if n == 0 {
            anyhow::bail!("The daemon sent no response");
        }

        let response: IpcResponse =
            serde_json::from_slice(&buffer[..n]).context("Failed to parse response")?;

        if !response.is_success() {
            anyhow::bail!("{}", response.message);
        }

        Ok(response)
    }
}

// ============================================================================
// WatchStream
// ============================================================================

/// Bridge messages pushed by the daemon to this foreground client.
///
/// Dropping the stream disconnects and unregisters the client.
pub struct WatchStream {
    client_id: String,
    lines: Lines<BufReader<OwnedReadHalf>>,
    /// Held open; the daemon treats EOF as a disconnect
    _writer: OwnedWriteHalf,
}

impl WatchStream {
    /// Id the daemon assigned to this client.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Next raw JSON line, or `None` when the daemon closed the connection.
    pub async fn next_line(&mut self) -> Result<Option<String>> {
        self.lines
            .next_line()
            .await
            .context("Lost connection to the daemon")
    }

    /// Next decoded message, skipping lines that are not bridge messages.
    pub async fn next_message(&mut self) -> Result<Option<BridgeMessage>> {
        while let Some(line) = self.next_line().await? {
            match serde_json::from_str(&line) {
                Ok(message) => return Ok(Some(message)),
                Err(e) => tracing::debug!(error = %e, "skipping unknown message"),
            }
        }
        Ok(None)
    }
}

// ============================================================================
// Tests
// ============================================================================
