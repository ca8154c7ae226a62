//! Frame flow control.
//!
//! The server processes one frame at a time. Two submitters sit between a
//! frame producer and the session:
//!
//! | Submitter | Policy | Use |
//! |-----------|--------|-----|
//! | [`FrameFlowController`] | At most one frame in flight; extra frames are dropped | Live camera feed |
//! | [`SequentialSubmitter`] | Send, await the reply, send the next | Replaying a recorded clip |
//!
//! Both talk to the session through [`FrameSink`], implemented by
//! [`StreamClient`](crate::StreamClient).

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;

use crate::protocol::Outbound;
use crate::session::{NoticeHandler, Subscription};

// ============================================================================
// Submodules
// ============================================================================

/// Single in-flight frame controller.
pub mod controller;

/// Acknowledgement-gated batch submission.
pub mod sequential;

#[cfg(test)]
pub(crate) mod mock;

// ============================================================================
// Re-exports
// ============================================================================

pub use controller::{FlowStats, FrameFlowController, SubmitOutcome};
pub use sequential::{
    BatchProgress, BatchReport, DEFAULT_ACK_TIMEOUT, LatencyStats, SequentialSubmitter,
};

// ============================================================================
// FrameSink
// ============================================================================

/// The session surface a submitter needs.
pub trait FrameSink: Send + Sync + 'static {
    /// Sends one envelope. Returns `false` if it did not reach the transport.
    fn send(&self, message: &Outbound) -> bool;

    /// Registers for session notices.
    fn subscribe_notices(&self, handler: NoticeHandler) -> Subscription;
}

// ============================================================================
// FrameSource
// ============================================================================

/// Producer of base64-encoded JPEG frames.
#[async_trait]
pub trait FrameSource: Send {
    /// Returns the next frame, or `None` if nothing is ready this tick.
    async fn next_frame(&mut self) -> Option<String>;
}
