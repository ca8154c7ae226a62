//! Session configuration.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use frame_stream_client::SessionConfig;
//!
//! let config = SessionConfig::for_host("10.0.0.5")?
//!     .with_max_reconnect_attempts(5)
//!     .with_reconnect_delay(Duration::from_secs(1));
//!
//! config.validate()?;
//! # Ok::<(), frame_stream_client::Error>(())
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};
use crate::settings::{SettingsStore, load_server_host};
use crate::transport::Endpoint;
use crate::transport::connection::DEFAULT_CONNECT_TIMEOUT;

use super::policy::{DEFAULT_MAX_RECONNECT_ATTEMPTS, DEFAULT_RECONNECT_DELAY, ReconnectPolicy};

// ============================================================================
// SessionConfig
// ============================================================================

/// Endpoint and reconnection settings for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Target server. `None` yields a `NoEndpoint` status on connect.
    pub endpoint: Option<Endpoint>,

    /// Fixed delay before each reconnect attempt.
    pub reconnect_delay: Duration,

    /// Reconnect budget after a connection is lost.
    pub max_reconnect_attempts: u32,

    /// Whether a close schedules a reconnect.
    pub auto_reconnect: bool,

    /// Handshake timeout for each connection attempt.
    pub connect_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl SessionConfig {
    /// Creates a configuration with no endpoint and default timings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            endpoint: None,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            auto_reconnect: true,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Creates a configuration targeting `host` on the default port and path.
    ///
    /// # Errors
    ///
    /// Returns an endpoint error if `host` is empty or invalid.
    pub fn for_host(host: impl Into<String>) -> Result<Self> {
        Ok(Self::new().with_endpoint(Endpoint::new(host)?))
    }

    /// Creates a configuration from the host stored in `store`.
    ///
    /// A missing host is not an error: the endpoint stays `None` and the
    /// session reports `NoEndpoint` when asked to connect.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or the stored host is invalid.
    pub fn from_settings(store: &dyn SettingsStore) -> Result<Self> {
        let config = Self::new();
        match load_server_host(store)? {
            Some(host) => Ok(config.with_endpoint(Endpoint::new(host)?)),
            None => Ok(config),
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl SessionConfig {
    /// Sets the endpoint.
    #[inline]
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Sets the reconnect delay.
    #[inline]
    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Sets the reconnect budget.
    #[inline]
    #[must_use]
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// Enables or disables auto-reconnect.
    #[inline]
    #[must_use]
    pub fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    /// Sets the handshake timeout.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

// ============================================================================
// Conversion Methods
// ============================================================================

impl SessionConfig {
    /// Builds the reconnect policy described by this configuration.
    #[must_use]
    pub fn policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::new(
            self.reconnect_delay,
            self.max_reconnect_attempts,
            self.auto_reconnect,
        )
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the connect timeout is zero.
    pub fn validate(&self) -> Result<()> {
        if self.connect_timeout.is_zero() {
            return Err(Error::config("Connect timeout must be greater than zero"));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
