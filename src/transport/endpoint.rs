//! Server endpoint addressing.
//!
//! The frame server listens on `ws://<host>:8000/ws` and serves stored
//! images over plain HTTP on the same port. Port and path are fixed by the
//! server but overridable here, which local test servers rely on.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Port the frame server listens on.
pub const DEFAULT_PORT: u16 = 8000;

/// WebSocket path on the frame server.
pub const DEFAULT_PATH: &str = "/ws";

// ============================================================================
// Endpoint
// ============================================================================

/// Target server: host + port + WebSocket path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    host: String,
    port: u16,
    path: String,
}

impl Endpoint {
    /// Creates an endpoint on the default port and path.
    ///
    /// # Errors
    ///
    /// - [`Error::NoEndpoint`] if `host` is empty or whitespace
    /// - [`Error::InvalidEndpoint`] if the resulting URL does not parse
    pub fn new(host: impl Into<String>) -> Result<Self> {
        Self::with_port_path(host, DEFAULT_PORT, DEFAULT_PATH)
    }

    /// Creates an endpoint with an explicit port and path.
    ///
    /// # Errors
    ///
    /// Same as [`Endpoint::new`].
    pub fn with_port_path(host: impl Into<String>, port: u16, path: impl Into<String>) -> Result<Self> {
        let host = host.into().trim().to_string();
        if host.is_empty() {
            return Err(Error::NoEndpoint);
        }

        let mut path = path.into();
        if !path.starts_with('/') {
            path.insert(0, '/');
        }

        let endpoint = Self { host, port, path };
        let url = endpoint.ws_url();
        let parsed = Url::parse(&url).map_err(|e| Error::invalid_endpoint(&url, e.to_string()))?;
        if parsed.host_str().is_none_or(str::is_empty) {
            return Err(Error::invalid_endpoint(url, "missing host"));
        }

        Ok(endpoint)
    }

    /// Returns the host.
    #[inline]
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port.
    #[inline]
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns the WebSocket path.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the WebSocket URL.
    ///
    /// Format: `ws://{host}:{port}{path}`
    #[inline]
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://{}:{}{}", self.host, self.port, self.path)
    }

    /// Resolves a server-relative resource path to a full HTTP URL.
    ///
    /// Used for `confirmation` messages, whose `url` is relative.
    #[must_use]
    pub fn resource_url(&self, relative: &str) -> String {
        if relative.starts_with('/') {
            format!("http://{}:{}{}", self.host, self.port, relative)
        } else {
            format!("http://{}:{}/{}", self.host, self.port, relative)
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.ws_url())
    }
}

// ============================================================================
// Tests
// ============================================================================
