//! Frame Stream Client - reconnecting WebSocket core for streaming camera
//! frames to an analysis server.
//!
//! The client sends JPEG frames to a server over one persistent WebSocket
//! and turns the server's replies into navigation cues for an audio or
//! haptic feedback sink.
//!
//! # Architecture
//!
//! ```text
//! FrameSource ──► FrameFlowController ──► StreamClient ──► Session ──► Transport ──► server
//!                        ▲                                    │
//!                        └──────── Dispatcher ◄───────────────┘
//!                                      │
//!                                      └──► FeedbackPlayer ──► FeedbackSink
//! ```
//!
//! Key design principles:
//!
//! - One session owns at most one live socket
//! - Reconnection is bounded with a fixed delay and stops on manual disconnect
//! - At most one frame is in flight; extra frames are dropped, not queued
//! - Malformed server messages are logged and discarded
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use frame_stream_client::{FrameFlowController, Result, StreamClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = StreamClient::builder().host("10.0.0.5").build()?;
//!
//!     let _cues = client.on_success(|payload| {
//!         if let Some(cue) = payload.cue() {
//!             println!("cue: {cue}");
//!         }
//!     });
//!
//!     let flow = FrameFlowController::new(Arc::new(client.clone()));
//!     flow.submit_frame("/9j/4AAQSkZJRg...");
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`StreamClient`] handle, builder and enable gate |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`feedback`] | Cue playback with duplicate suppression |
//! | [`flow`] | Frame flow control |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Wire message types |
//! | [`session`] | Reconnecting session state machine |
//! | [`settings`] | Persistent server host setting |
//! | [`transport`] | WebSocket transport layer |

// ============================================================================
// Modules
// ============================================================================

/// Consumer-facing client handle.
///
/// Use [`StreamClient::builder()`] to create one.
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Feedback playback for server cues.
pub mod feedback;

/// Frame flow control.
pub mod flow;

/// Type-safe identifiers for session entities.
pub mod identifiers;

/// Wire message types.
pub mod protocol;

/// Reconnecting session.
pub mod session;

/// Persistent settings.
pub mod settings;

/// WebSocket transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{ClientBuilder, EnableGate, StreamClient};

// Error types
pub use error::{Error, Result};

// Feedback types
pub use feedback::{
    DuplicateSuppressor, FeedbackPlayer, FeedbackSink, PlayDecision, SuppressionConfig,
};

// Flow types
pub use flow::{
    BatchProgress, BatchReport, FlowStats, FrameFlowController, FrameSink, FrameSource,
    LatencyStats, SequentialSubmitter, SubmitOutcome,
};

// Identifier types
pub use identifiers::{ConnectionId, SubscriptionId, TimerId};

// Protocol types
pub use protocol::{DataUri, Inbound, Instruction, InstructionPayload, Outbound};

// Session types
pub use session::{
    Dispatcher, Session, SessionConfig, SessionEvent, SessionNotice, SessionStatus, Subscription,
};

// Settings types
pub use settings::{FileSettings, MemorySettings, SettingsStore};

// Transport types
pub use transport::{Endpoint, Transport, TransportEvent, WsTransport};
