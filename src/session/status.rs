//! Human-readable session status.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

// ============================================================================
// Constants
// ============================================================================

/// Error text when no endpoint is configured.
pub const NO_ENDPOINT_MESSAGE: &str = "No server IP configured";

/// Error text once the reconnect budget is spent.
pub const EXHAUSTED_MESSAGE: &str = "Maximum reconnection attempts reached";

// ============================================================================
// SessionStatus
// ============================================================================

/// Connection state of a session.
///
/// `Display` yields the status line shown to users, e.g.
/// `Reconnecting (Attempt 2/3)...`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionStatus {
    /// Not connected and not trying to.
    #[default]
    Disconnected,

    /// No endpoint configured; nothing will be attempted.
    NoEndpoint,

    /// First connection attempt in progress.
    Connecting,

    /// Socket open.
    Connected,

    /// Waiting for (or performing) reconnect attempt `attempt` of `max`.
    Reconnecting {
        /// One-based attempt number.
        attempt: u32,
        /// Attempt budget.
        max: u32,
    },

    /// Transport reported an error; a close follows.
    Error,

    /// Reconnect budget spent; only `retry()` resumes.
    Exhausted,
}

impl SessionStatus {
    /// Returns `true` if the socket is open.
    #[inline]
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns `true` while connected or working towards a connection.
    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Connecting | Self::Connected | Self::Reconnecting { .. }
        )
    }

    /// Returns `true` if the session stopped and needs user action.
    #[inline]
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::NoEndpoint | Self::Exhausted)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => f.write_str("Disconnected"),
            Self::NoEndpoint => f.write_str(NO_ENDPOINT_MESSAGE),
            Self::Connecting => f.write_str("Connecting"),
            Self::Connected => f.write_str("Connected"),
            Self::Reconnecting { attempt, max } => {
                write!(f, "Reconnecting (Attempt {attempt}/{max})...")
            }
            Self::Error => f.write_str("Error"),
            Self::Exhausted => f.write_str("Error: max attempts reached"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
