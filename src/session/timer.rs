//! Cancellable reconnect timer.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::trace;

use crate::identifiers::TimerId;

use super::SessionEvent;

// ============================================================================
// ReconnectTimer
// ============================================================================

/// A pending reconnect.
///
/// Fires [`SessionEvent::ReconnectDue`] into the session queue after the
/// delay. Cancelling or dropping the handle aborts the sleep, and the
/// session ignores a due event whose id no longer matches.
#[derive(Debug)]
pub struct ReconnectTimer {
    id: TimerId,
    task: JoinHandle<()>,
}

impl ReconnectTimer {
    /// Schedules a reconnect. Must be called within a tokio runtime.
    #[must_use]
    pub fn schedule(
        id: TimerId,
        delay: Duration,
        events_tx: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        let task = tokio::spawn(async move {
            sleep(delay).await;
            trace!(%id, "Reconnect timer fired");
            let _ = events_tx.send(SessionEvent::ReconnectDue(id));
        });
        Self { id, task }
    }

    /// Returns the timer id.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> TimerId {
        self.id
    }

    /// Aborts the timer.
    pub fn cancel(self) {
        trace!(id = %self.id, "Reconnect timer cancelled");
        self.task.abort();
    }
}

impl Drop for ReconnectTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
