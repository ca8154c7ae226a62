//! Outbound envelopes sent from the client to the server.
//!
//! # Format
//!
//! Live-stream frame:
//! ```json
//! { "type": "frame", "data": "data:image/jpeg;base64,...", "timestamp": 1700000000000 }
//! ```
//!
//! One-shot image:
//! ```json
//! { "type": "image", "data": "data:image/jpeg;base64,..." }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::result::Result as StdResult;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Prefix of every image payload on the wire.
pub const JPEG_DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

// ============================================================================
// DataUri
// ============================================================================

/// A self-describing JPEG data URI.
///
/// The wire format never carries raw bytes; every image is text of the form
/// `data:image/jpeg;base64,<payload>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DataUri(String);

impl DataUri {
    /// Wraps an already base64-encoded JPEG payload.
    #[must_use]
    pub fn jpeg(base64_payload: &str) -> Self {
        Self(format!("{JPEG_DATA_URI_PREFIX}{base64_payload}"))
    }

    /// Encodes raw JPEG bytes.
    #[must_use]
    pub fn from_jpeg_bytes(bytes: &[u8]) -> Self {
        Self::jpeg(&STANDARD.encode(bytes))
    }

    /// Parses a full data URI string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDataUri`] if the prefix is missing.
    pub fn parse(uri: impl Into<String>) -> Result<Self> {
        let uri = uri.into();
        if !uri.starts_with(JPEG_DATA_URI_PREFIX) {
            return Err(Error::invalid_data_uri(format!(
                "expected prefix {JPEG_DATA_URI_PREFIX}"
            )));
        }
        Ok(Self(uri))
    }

    /// Returns the base64 payload after the comma.
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &str {
        &self.0[JPEG_DATA_URI_PREFIX.len()..]
    }

    /// Decodes the payload back to JPEG bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDataUri`] if the payload is not valid base64.
    pub fn decode(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(self.payload())
            .map_err(|e| Error::invalid_data_uri(e.to_string()))
    }

    /// Returns the full URI.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for DataUri {
    fn serialize<S: Serializer>(&self, serializer: S) -> StdResult<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for DataUri {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> StdResult<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(raw).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Outbound
// ============================================================================

/// A tagged envelope sent to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    /// One picked or captured image.
    Image {
        /// Encoded image.
        data: DataUri,
    },

    /// One live-stream frame.
    Frame {
        /// Encoded frame.
        data: DataUri,
        /// Wall-clock milliseconds at submission.
        timestamp: u64,
    },
}

impl Outbound {
    /// Builds a frame envelope stamped with the current wall-clock time.
    #[must_use]
    pub fn frame(base64_payload: &str) -> Self {
        Self::Frame {
            data: DataUri::jpeg(base64_payload),
            timestamp: now_ms(),
        }
    }

    /// Builds an image envelope.
    #[must_use]
    pub fn image(base64_payload: &str) -> Self {
        Self::Image {
            data: DataUri::jpeg(base64_payload),
        }
    }

    /// Returns the wire `type` tag.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Image { .. } => "image",
            Self::Frame { .. } => "frame",
        }
    }

    /// Returns the encoded image.
    #[inline]
    #[must_use]
    pub fn data(&self) -> &DataUri {
        match self {
            Self::Image { data } | Self::Frame { data, .. } => data,
        }
    }

    /// Serializes to the JSON text sent over the socket.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Current time in milliseconds since the Unix epoch.
#[must_use]
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

// ============================================================================
// Tests
// ============================================================================
