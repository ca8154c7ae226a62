//! Session input events and output notices.
//!
//! [`SessionEvent`]s flow into the session through its single event queue:
//! transport callbacks and reconnect timer expiries. [`SessionNotice`]s flow
//! out to subscribers after each state change.

// ============================================================================
// Imports
// ============================================================================

use crate::identifiers::{ConnectionId, TimerId};
use crate::protocol::Inbound;
use crate::transport::TransportEvent;

use super::SessionStatus;

// ============================================================================
// SessionEvent
// ============================================================================

/// Input to [`Session::handle`](super::Session::handle).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Event from the transport handle `conn`.
    Transport {
        /// Handle that produced the event.
        conn: ConnectionId,
        /// What happened.
        event: TransportEvent,
    },

    /// A scheduled reconnect is due.
    ReconnectDue(TimerId),
}

// ============================================================================
// SessionNotice
// ============================================================================

/// Output delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionNotice {
    /// Status changed.
    Status(SessionStatus),

    /// A parsed inbound message.
    Message(Inbound),

    /// The transport reported an error.
    TransportError(String),

    /// The connection closed.
    Closed {
        /// WebSocket close code.
        code: u16,
        /// Close reason.
        reason: String,
    },

    /// A user-actionable failure: missing endpoint or spent reconnect budget.
    Failed(String),
}

impl SessionNotice {
    /// Returns the inbound message, if this is one.
    #[inline]
    #[must_use]
    pub fn as_message(&self) -> Option<&Inbound> {
        match self {
            Self::Message(msg) => Some(msg),
            _ => None,
        }
    }

    /// Returns `true` if this notice frees an in-flight frame slot.
    ///
    /// Any reply, close or transport error ends the wait for the current
    /// frame's acknowledgement.
    #[inline]
    #[must_use]
    pub fn releases_in_flight(&self) -> bool {
        matches!(
            self,
            Self::Message(_) | Self::Closed { .. } | Self::TransportError(_)
        )
    }
}
