//! Inbound envelopes received from the server.
//!
//! Every inbound text frame is a JSON object keyed by `type`:
//!
//! | type | fields |
//! |------|--------|
//! | `confirmation` | `url` |
//! | `success` | `data` (cue string, JSON-encoded instruction list, or list) |
//! | `processed_frame` | `data`, `url` (optional) |
//! | `error` | `message` or `data` |
//!
//! Anything that parses as JSON but matches none of the above becomes
//! [`Inbound::Unhandled`]. Text that is not JSON is rejected by
//! [`Inbound::parse`] and never reaches consumers.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

// ============================================================================
// Instruction
// ============================================================================

/// One navigational instruction produced by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    /// Instruction kind, e.g. `turn` or `obstacle`.
    #[serde(default)]
    pub instruction_type: String,

    /// Direction, e.g. `left`.
    #[serde(default)]
    pub direction: String,

    /// Danger level, e.g. `high`.
    #[serde(default)]
    pub danger: String,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} ({} danger)",
            self.instruction_type, self.direction, self.danger
        )
    }
}

// ============================================================================
// InstructionPayload
// ============================================================================

/// Body of a `success` message.
#[derive(Debug, Clone, PartialEq)]
pub enum InstructionPayload {
    /// Feedback cue name, e.g. `turn_left`.
    Cue(String),

    /// Structured instructions, either inline or JSON-encoded in a string.
    Instructions(Vec<Instruction>),

    /// Any other JSON value.
    Other(Value),
}

impl InstructionPayload {
    /// Classifies a raw `data` value.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(text) => match serde_json::from_str::<Vec<Instruction>>(&text) {
                Ok(list) => Self::Instructions(list),
                Err(_) => Self::Cue(text),
            },
            Value::Array(_) => match serde_json::from_value::<Vec<Instruction>>(value.clone()) {
                Ok(list) => Self::Instructions(list),
                Err(_) => Self::Other(value),
            },
            other => Self::Other(other),
        }
    }

    /// Returns the cue name if this is a non-empty cue.
    #[inline]
    #[must_use]
    pub fn cue(&self) -> Option<&str> {
        match self {
            Self::Cue(cue) if !cue.is_empty() => Some(cue),
            _ => None,
        }
    }
}

// ============================================================================
// Inbound
// ============================================================================

/// A message received from the server.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Image stored; `url` is server-relative.
    Confirmation {
        /// Server-relative path of the stored image.
        url: String,
    },

    /// Navigational instruction(s).
    Success {
        /// Instruction body.
        data: InstructionPayload,
    },

    /// Processed frame echoed back for preview.
    ProcessedFrame {
        /// Data URI of the processed frame.
        data: String,
        /// Server-relative path where the frame was saved.
        url: Option<String>,
    },

    /// Server-side failure.
    Error {
        /// Failure description.
        message: String,
    },

    /// Valid JSON with an unknown or missing `type`.
    Unhandled {
        /// The `type` field, if present and a string.
        kind: Option<String>,
        /// The whole payload.
        payload: Value,
    },
}

/// Wire shape of the known message types.
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum KnownInbound {
    Confirmation {
        url: String,
    },
    Success {
        #[serde(default)]
        data: Value,
    },
    ProcessedFrame {
        data: String,
        #[serde(default)]
        url: Option<String>,
    },
    Error {
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        data: Option<Value>,
    },
}

impl From<KnownInbound> for Inbound {
    fn from(known: KnownInbound) -> Self {
        match known {
            KnownInbound::Confirmation { url } => Self::Confirmation { url },
            KnownInbound::Success { data } => Self::Success {
                data: InstructionPayload::from_value(data),
            },
            KnownInbound::ProcessedFrame { data, url } => Self::ProcessedFrame { data, url },
            KnownInbound::Error { message, data } => {
                let message = message
                    .or_else(|| match data {
                        Some(Value::String(s)) => Some(s),
                        Some(Value::Null) | None => None,
                        Some(other) => Some(other.to_string()),
                    })
                    .unwrap_or_else(|| "unknown error".to_string());
                Self::Error { message }
            }
        }
    }
}

impl Inbound {
    /// Parses one inbound text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the text is not JSON. Valid JSON never
    /// fails; unrecognised shapes map to [`Inbound::Unhandled`].
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::from_value(value))
    }

    /// Classifies an already-parsed JSON value.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match serde_json::from_value::<KnownInbound>(value.clone()) {
            Ok(known) => known.into(),
            Err(_) => {
                let kind = value
                    .get("type")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                Self::Unhandled {
                    kind,
                    payload: value,
                }
            }
        }
    }

    /// Returns the wire `type` tag, if any.
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        match self {
            Self::Confirmation { .. } => Some("confirmation"),
            Self::Success { .. } => Some("success"),
            Self::ProcessedFrame { .. } => Some("processed_frame"),
            Self::Error { .. } => Some("error"),
            Self::Unhandled { kind, .. } => kind.as_deref(),
        }
    }

    /// Returns `true` if this is a success message.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns `true` if this is an error message.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Converts an error message into [`Error::Server`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Server`] if this is an error message.
    pub fn into_result(self) -> Result<Self> {
        match self {
            Self::Error { message } => Err(Error::server(message)),
            other => Ok(other),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
