//! Builder for [`StreamClient`].
//!
//! # Example
//!
//! ```no_run
//! use frame_stream_client::StreamClient;
//!
//! # async fn example() -> frame_stream_client::Result<()> {
//! let client = StreamClient::builder()
//!     .host("10.0.0.5")
//!     .max_reconnect_attempts(5)
//!     .build()?;
//!
//! println!("{}", client.status());
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::runtime::Handle;

use crate::error::{Error, Result};
use crate::session::SessionConfig;
use crate::settings::{SettingsStore, load_server_host};
use crate::transport::{Endpoint, Transport, WsTransport};

use super::core::StreamClient;

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`StreamClient`].
///
/// Use [`StreamClient::builder()`] to create one.
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    /// Session settings.
    config: SessionConfig,
    /// Host to resolve into an endpoint at build time.
    host: Option<String>,
    /// Whether to connect on build.
    enabled: bool,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// ClientBuilder Implementation
// ============================================================================

impl ClientBuilder {
    /// Creates a builder with default settings, enabled, and no endpoint.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: SessionConfig::new(),
            host: None,
            enabled: true,
        }
    }

    /// Sets the server host. Port 8000 and path `/ws` are implied.
    #[inline]
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the full endpoint.
    #[inline]
    #[must_use]
    pub fn endpoint(mut self, endpoint: Endpoint) -> Self {
        self.host = None;
        self.config.endpoint = Some(endpoint);
        self
    }

    /// Replaces the whole session configuration.
    #[inline]
    #[must_use]
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Reads the server host from a settings store.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn settings(mut self, store: &dyn SettingsStore) -> Result<Self> {
        if let Some(host) = load_server_host(store)? {
            self.host = Some(host);
        }
        Ok(self)
    }

    /// Sets the delay before each reconnect attempt.
    #[inline]
    #[must_use]
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.config.reconnect_delay = delay;
        self
    }

    /// Sets the reconnect budget.
    #[inline]
    #[must_use]
    pub fn max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.config.max_reconnect_attempts = attempts;
        self
    }

    /// Enables or disables auto-reconnect.
    #[inline]
    #[must_use]
    pub fn auto_reconnect(mut self, enabled: bool) -> Self {
        self.config.auto_reconnect = enabled;
        self
    }

    /// Sets the handshake timeout.
    #[inline]
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Sets whether the client connects as soon as it is built.
    #[inline]
    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Builds a client over the tokio-tungstenite transport.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if called outside a tokio runtime or the
    ///   configuration is invalid
    /// - [`Error::NoEndpoint`] / [`Error::InvalidEndpoint`] for a bad host
    pub fn build(self) -> Result<StreamClient<WsTransport>> {
        let transport = WsTransport::new(self.config.connect_timeout);
        self.build_with_transport(transport)
    }

    /// Builds a client over a custom transport.
    ///
    /// # Errors
    ///
    /// Same as [`build`](Self::build).
    pub fn build_with_transport<T: Transport>(self, transport: T) -> Result<StreamClient<T>> {
        Handle::try_current().map_err(|_| {
            Error::config("StreamClient must be built inside a tokio runtime")
        })?;

        let config = self.resolve()?;
        Ok(StreamClient::new(&config, transport, self.enabled))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ClientBuilder {
    /// Resolves the host and validates the configuration.
    fn resolve(&self) -> Result<SessionConfig> {
        let mut config = self.config.clone();
        if let Some(host) = &self.host {
            config.endpoint = Some(Endpoint::new(host.as_str())?);
        }
        config.validate()?;
        Ok(config)
    }
}

// ============================================================================
// Tests
// ============================================================================
