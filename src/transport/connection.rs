//! WebSocket transport backed by tokio-tungstenite.
//!
//! Each [`WsTransport::open`] spawns a link task that owns the socket:
//!
//! - connects with a timeout
//! - forwards inbound text frames as [`TransportEvent::Message`]
//! - writes outbound frames queued by [`WsTransport::send`]
//! - reports `Closed` exactly once when the socket goes away
//!
//! A failed or timed-out connect reports `Error` followed by
//! `Closed { code: 1006 }`, matching a WebSocket that never opened, so the
//! session's reconnect logic only ever reacts to `Closed`.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, trace, warn};

use crate::identifiers::ConnectionId;

use super::{CLOSE_ABNORMAL, CLOSE_NORMAL, EventSink, Transport, TransportEvent};

// ============================================================================
// Constants
// ============================================================================

/// Default time allowed for the TCP + WebSocket handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// LinkCommand
// ============================================================================

/// Internal commands for the link task.
enum LinkCommand {
    /// Write a text frame.
    Send(String),
    /// Close the socket and stop.
    Close,
}

// ============================================================================
// Link
// ============================================================================

/// Handle to one running link task.
struct Link {
    /// Connection the task reports events for.
    conn: ConnectionId,
    /// Channel for sending commands to the link task.
    command_tx: mpsc::UnboundedSender<LinkCommand>,
    /// Set by the task once the handshake completes.
    open: Arc<AtomicBool>,
    /// Link task handle.
    task: JoinHandle<()>,
}

// ============================================================================
// WsTransport
// ============================================================================

/// Production transport: one tokio-tungstenite client socket at a time.
///
/// Must be used from within a tokio runtime.
pub struct WsTransport {
    /// Handshake timeout.
    connect_timeout: Duration,
    /// Current link, if any.
    link: Option<Link>,
}

impl Default for WsTransport {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT)
    }
}

impl WsTransport {
    /// Creates a transport with the given handshake timeout.
    #[must_use]
    pub fn new(connect_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            link: None,
        }
    }

    /// Returns the handshake timeout.
    #[inline]
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Link task: connect, then pump frames both ways until closed.
    async fn run_link(
        url: String,
        connect_timeout: Duration,
        sink: EventSink,
        mut command_rx: mpsc::UnboundedReceiver<LinkCommand>,
        open: Arc<AtomicBool>,
    ) {
        let conn = sink.connection_id();
        debug!(%conn, %url, "Connecting");

        let ws_stream = tokio::select! {
            result = timeout(connect_timeout, connect_async(url.as_str())) => {
                match result {
                    Ok(Ok((stream, _response))) => stream,
                    Ok(Err(e)) => {
                        warn!(%conn, error = %e, "WebSocket connect failed");
                        sink.emit(TransportEvent::Error(e.to_string()));
                        sink.emit(TransportEvent::Closed {
                            code: CLOSE_ABNORMAL,
                            reason: e.to_string(),
                        });
                        return;
                    }
                    Err(_) => {
                        let reason = format!(
                            "connect timed out after {}ms",
                            connect_timeout.as_millis()
                        );
                        warn!(%conn, %reason, "WebSocket connect timed out");
                        sink.emit(TransportEvent::Error(reason.clone()));
                        sink.emit(TransportEvent::Closed {
                            code: CLOSE_ABNORMAL,
                            reason,
                        });
                        return;
                    }
                }
            }

            // Only Close (or a dropped handle) can arrive before the socket is open.
            _ = command_rx.recv() => {
                debug!(%conn, "Link closed while connecting");
                return;
            }
        };

        open.store(true, Ordering::Release);
        info!(%conn, %url, "WebSocket connected");
        sink.emit(TransportEvent::Opened);

        let (mut ws_write, mut ws_read) = ws_stream.split();

        let (code, reason) = loop {
            tokio::select! {
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            trace!(%conn, len = text.len(), "Frame received");
                            if !sink.emit(TransportEvent::Message(text.as_str().to_owned())) {
                                break (CLOSE_NORMAL, "session dropped".to_string());
                            }
                        }

                        Some(Ok(Message::Close(frame))) => {
                            debug!(%conn, ?frame, "WebSocket closed by remote");
                            break frame
                                .map(|f| (u16::from(f.code), f.reason.as_str().to_owned()))
                                .unwrap_or((CLOSE_ABNORMAL, String::new()));
                        }

                        Some(Err(e)) => {
                            warn!(%conn, error = %e, "WebSocket error");
                            sink.emit(TransportEvent::Error(e.to_string()));
                            break (CLOSE_ABNORMAL, e.to_string());
                        }

                        None => {
                            debug!(%conn, "WebSocket stream ended");
                            break (CLOSE_ABNORMAL, "stream ended".to_string());
                        }

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                command = command_rx.recv() => {
                    match command {
                        Some(LinkCommand::Send(text)) => {
                            if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                                warn!(%conn, error = %e, "Failed to write frame");
                                sink.emit(TransportEvent::Error(e.to_string()));
                                break (CLOSE_ABNORMAL, e.to_string());
                            }
                            trace!(%conn, "Frame sent");
                        }

                        Some(LinkCommand::Close) | None => {
                            debug!(%conn, "Closing WebSocket");
                            let _ = ws_write.close().await;
                            break (CLOSE_NORMAL, "client closed".to_string());
                        }
                    }
                }
            }
        };

        open.store(false, Ordering::Release);
        sink.emit(TransportEvent::Closed { code, reason });
        debug!(%conn, code, "Link terminated");
    }
}

impl Transport for WsTransport {
    fn open(&mut self, url: &str, sink: EventSink) {
        self.close();

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let open = Arc::new(AtomicBool::new(false));
        let conn = sink.connection_id();

        let task = tokio::spawn(Self::run_link(
            url.to_string(),
            self.connect_timeout,
            sink,
            command_rx,
            Arc::clone(&open),
        ));

        self.link = Some(Link {
            conn,
            command_tx,
            open,
            task,
        });
    }

    fn send(&mut self, text: String) -> bool {
        match &self.link {
            Some(link) if link.open.load(Ordering::Acquire) => {
                link.command_tx.send(LinkCommand::Send(text)).is_ok()
            }
            _ => false,
        }
    }

    fn close(&mut self) {
        if let Some(link) = self.link.take() {
            link.open.store(false, Ordering::Release);
            if link.command_tx.send(LinkCommand::Close).is_err() && !link.task.is_finished() {
                link.task.abort();
            }
            debug!(conn = %link.conn, "Transport closed");
        }
    }

    fn is_open(&self) -> bool {
        self.link
            .as_ref()
            .is_some_and(|link| link.open.load(Ordering::Acquire))
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        self.close();
    }
}

// ============================================================================
// Tests
// ============================================================================
