//! WebSocket transport layer.
//!
//! A transport owns at most one socket to one endpoint and knows nothing
//! about reconnection or message meaning. It reports everything that
//! happens to the socket as [`TransportEvent`]s pushed into the session's
//! event queue, tagged with the [`ConnectionId`] the session assigned when
//! it called [`Transport::open`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐   open/send/close   ┌──────────────┐   ws://host:8000/ws   ┌────────┐
//! │  Session        │────────────────────►│  WsTransport │◄─────────────────────►│ Server │
//! │  (event queue)  │◄────────────────────│  link task   │                       └────────┘
//! └─────────────────┘   TransportEvent    └──────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | tokio-tungstenite transport and its link task |
//! | `endpoint` | Server host/port/path addressing |

// ============================================================================
// Imports
// ============================================================================

use tokio::sync::mpsc;

use crate::identifiers::ConnectionId;
use crate::session::SessionEvent;

// ============================================================================
// Submodules
// ============================================================================

/// tokio-tungstenite backed transport.
pub mod connection;

/// Server endpoint addressing.
pub mod endpoint;

#[cfg(test)]
pub(crate) mod mock;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::WsTransport;
pub use endpoint::{DEFAULT_PATH, DEFAULT_PORT, Endpoint};

// ============================================================================
// Constants
// ============================================================================

/// Close code for a normal, client-initiated close.
pub const CLOSE_NORMAL: u16 = 1000;

/// Close code reported when the socket dropped without a close frame.
pub const CLOSE_ABNORMAL: u16 = 1006;

// ============================================================================
// TransportEvent
// ============================================================================

/// Something that happened to a transport's socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Socket opened and ready to send.
    Opened,

    /// One inbound text frame.
    Message(String),

    /// Socket closed. Always the last event of a connection.
    Closed {
        /// WebSocket close code.
        code: u16,
        /// Close reason, possibly empty.
        reason: String,
    },

    /// Transport-level failure. A `Closed` event follows.
    Error(String),
}

// ============================================================================
// EventSink
// ============================================================================

/// Where a transport pushes the events of one connection.
#[derive(Debug, Clone)]
pub struct EventSink {
    conn: ConnectionId,
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl EventSink {
    /// Creates a sink that tags events with `conn`.
    #[inline]
    #[must_use]
    pub fn new(conn: ConnectionId, tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self { conn, tx }
    }

    /// Returns the connection these events belong to.
    #[inline]
    #[must_use]
    pub const fn connection_id(&self) -> ConnectionId {
        self.conn
    }

    /// Pushes an event. Returns `false` once the session is gone.
    pub fn emit(&self, event: TransportEvent) -> bool {
        self.tx
            .send(SessionEvent::Transport {
                conn: self.conn,
                event,
            })
            .is_ok()
    }
}

// ============================================================================
// Transport
// ============================================================================

/// One socket connection to one server endpoint.
///
/// Implementations must never block the caller: `open` only starts the
/// connection and reports the outcome through the sink.
pub trait Transport: Send + 'static {
    /// Starts connecting to `url`, replacing any previous connection.
    fn open(&mut self, url: &str, sink: EventSink);

    /// Queues one text frame.
    ///
    /// Returns `false` without side effects if the socket is not open.
    fn send(&mut self, text: String) -> bool;

    /// Closes the socket. Idempotent and safe when never opened.
    fn close(&mut self);

    /// Returns `true` while the socket is open.
    fn is_open(&self) -> bool;
}

impl Transport for Box<dyn Transport> {
    fn open(&mut self, url: &str, sink: EventSink) {
        (**self).open(url, sink);
    }

    fn send(&mut self, text: String) -> bool {
        (**self).send(text)
    }

    fn close(&mut self) {
        (**self).close();
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}
