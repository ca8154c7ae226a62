//! Error types for the frame-stream client.
//!
//! Expected session failures (server unreachable, send while closed,
//! malformed server payloads) are reported through session status and
//! notices, not through this type. [`Error`] covers the operations that
//! hand a result back to the caller: configuration, settings persistence
//! and sequential batch submission.
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::NoEndpoint`], [`Error::InvalidEndpoint`] |
//! | Connection | [`Error::ConnectionClosed`], [`Error::SendFailed`], [`Error::ChannelClosed`] |
//! | Protocol | [`Error::InvalidDataUri`] |
//! | Flow control | [`Error::AckTimeout`], [`Error::Server`] |
//! | Settings | [`Error::Settings`] |
//! | External | [`Error::Io`], [`Error::Json`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when session or client configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// No server host configured.
    #[error("No server IP configured")]
    NoEndpoint,

    /// Endpoint host or path does not form a valid WebSocket URL.
    #[error("Invalid endpoint {url}: {message}")]
    InvalidEndpoint {
        /// The URL that failed to parse.
        url: String,
        /// Parser message.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Connection closed while an acknowledgement was pending.
    #[error("Connection closed")]
    ConnectionClosed,

    /// The transport refused an outbound message because it was not open.
    #[error("Failed to send {kind} message: connection not open")]
    SendFailed {
        /// Envelope type that could not be sent.
        kind: &'static str,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// String is not a `data:image/jpeg;base64,` URI.
    #[error("Invalid data URI: {message}")]
    InvalidDataUri {
        /// What was wrong with the URI.
        message: String,
    },

    // ========================================================================
    // Flow Control Errors
    // ========================================================================
    /// No acknowledgement arrived for a sequentially submitted frame.
    #[error("Frame {index} not acknowledged after {timeout_ms}ms")]
    AckTimeout {
        /// Zero-based index of the frame within the batch.
        index: usize,
        /// Milliseconds waited before giving up.
        timeout_ms: u64,
    },

    /// Server reported a failure for a submitted frame.
    #[error("Server error: {message}")]
    Server {
        /// Message sent by the server.
        message: String,
    },

    // ========================================================================
    // Settings Errors
    // ========================================================================
    /// Settings could not be read or written.
    #[error("Settings error: {message}")]
    Settings {
        /// Description of the settings failure.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Channel receive error.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid endpoint error.
    #[inline]
    pub fn invalid_endpoint(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates a send failure error.
    #[inline]
    pub fn send_failed(kind: &'static str) -> Self {
        Self::SendFailed { kind }
    }

    /// Creates an invalid data URI error.
    #[inline]
    pub fn invalid_data_uri(message: impl Into<String>) -> Self {
        Self::InvalidDataUri {
            message: message.into(),
        }
    }

    /// Creates an acknowledgement timeout error.
    #[inline]
    pub fn ack_timeout(index: usize, timeout_ms: u64) -> Self {
        Self::AckTimeout { index, timeout_ms }
    }

    /// Creates a server error.
    #[inline]
    pub fn server(message: impl Into<String>) -> Self {
        Self::Server {
            message: message.into(),
        }
    }

    /// Creates a settings error.
    #[inline]
    pub fn settings(message: impl Into<String>) -> Self {
        Self::Settings {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::AckTimeout { .. })
    }

    /// Returns `true` if this is a configuration error.
    #[inline]
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::Config { .. } | Self::NoEndpoint | Self::InvalidEndpoint { .. }
        )
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::ConnectionClosed | Self::SendFailed { .. } | Self::ChannelClosed(_)
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed after `retry()` or resubmission.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::AckTimeout { .. }
                | Self::ConnectionClosed
                | Self::SendFailed { .. }
                | Self::Server { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
