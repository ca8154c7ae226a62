//! Reconnecting socket session.
//!
//! The session wraps a [`Transport`](crate::transport::Transport) with
//! bounded, fixed-delay reconnection and turns inbound text into typed
//! messages for subscribers.
//!
//! # State Machine
//!
//! ```text
//!                 connect()               Opened
//! Disconnected ───────────► Connecting ───────────► Connected
//!      ▲                                               │ Closed
//!      │ disconnect()                                  ▼
//!      └──────────────────────────────────────── Disconnected
//!                                                      │ attempts < max
//!                                 timer fires          ▼
//!                     Connected ◄───────────── Reconnecting (k/max)
//!                                                      │ attempts == max
//!                                                      ▼
//!                                                  Exhausted ── retry() ──► Connecting
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `config` | Endpoint and reconnect settings |
//! | `core` | The [`Session`] state machine |
//! | `dispatch` | Payload decoding and subscriber fan-out |
//! | `event` | Queue input and subscriber output types |
//! | `policy` | Attempt counting and close decisions |
//! | `status` | User-facing status values |
//! | `timer` | Cancellable reconnect timer |

// ============================================================================
// Submodules
// ============================================================================

/// Session configuration.
pub mod config;

/// Session state machine.
pub mod core;

/// Message decoding and dispatch.
pub mod dispatch;

/// Session events and notices.
pub mod event;

/// Reconnection policy.
pub mod policy;

/// Session status.
pub mod status;

/// Reconnect timer.
pub mod timer;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::SessionConfig;
pub use self::core::Session;
pub use dispatch::{Dispatcher, NoticeHandler, Subscription, decode};
pub use event::{SessionEvent, SessionNotice};
pub use policy::{
    CloseDecision, DEFAULT_MAX_RECONNECT_ATTEMPTS, DEFAULT_RECONNECT_DELAY, ReconnectPolicy,
};
pub use status::{EXHAUSTED_MESSAGE, NO_ENDPOINT_MESSAGE, SessionStatus};
pub use timer::ReconnectTimer;
