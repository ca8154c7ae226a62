//! Message dispatch.
//!
//! Two responsibilities:
//!
//! - [`decode`] turns inbound text into an [`Inbound`] or logs and drops it.
//!   A malformed payload never reaches a consumer and never disturbs the
//!   session.
//! - [`Dispatcher`] fans [`SessionNotice`]s out to subscribers. Each
//!   subscriber sees each notice exactly once, in subscription order.
//!
//! Subscriptions are values: dropping a [`Subscription`] unsubscribes.

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::{trace, warn};

use crate::identifiers::SubscriptionId;
use crate::protocol::{Inbound, InstructionPayload};

use super::SessionNotice;

// ============================================================================
// Constants
// ============================================================================

/// Longest prefix of a malformed payload that is logged.
const MAX_LOGGED_PAYLOAD: usize = 120;

// ============================================================================
// Types
// ============================================================================

/// Subscriber callback.
pub type NoticeHandler = Arc<dyn Fn(&SessionNotice) + Send + Sync>;

// ============================================================================
// decode
// ============================================================================

/// Parses one inbound text frame, logging and discarding malformed input.
#[must_use]
pub fn decode(text: &str) -> Option<Inbound> {
    match Inbound::parse(text) {
        Ok(msg) => {
            trace!(kind = ?msg.kind(), "Message decoded");
            Some(msg)
        }
        Err(e) => {
            let preview: String = text.chars().take(MAX_LOGGED_PAYLOAD).collect();
            warn!(error = %e, payload = %preview, "Failed to parse message");
            None
        }
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Fan-out of session notices to subscribers.
#[derive(Default)]
pub struct Dispatcher {
    handlers: RwLock<BTreeMap<SubscriptionId, NoticeHandler>>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl Dispatcher {
    /// Creates a dispatcher.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Subscribes to every notice.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(
        self: &Arc<Self>,
        handler: impl Fn(&SessionNotice) + Send + Sync + 'static,
    ) -> Subscription {
        let id = SubscriptionId::generate();
        self.handlers.write().insert(id, Arc::new(handler));
        trace!(%id, "Subscribed");
        Subscription {
            id,
            dispatcher: Arc::downgrade(self),
        }
    }

    /// Subscribes to inbound messages of any type.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn on_message(
        self: &Arc<Self>,
        handler: impl Fn(&Inbound) + Send + Sync + 'static,
    ) -> Subscription {
        self.subscribe(move |notice| {
            if let SessionNotice::Message(msg) = notice {
                handler(msg);
            }
        })
    }

    /// Subscribes to `success` messages.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn on_success(
        self: &Arc<Self>,
        handler: impl Fn(&InstructionPayload) + Send + Sync + 'static,
    ) -> Subscription {
        self.subscribe(move |notice| {
            if let SessionNotice::Message(Inbound::Success { data }) = notice {
                handler(data);
            }
        })
    }

    /// Subscribes to server `error` messages.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn on_error(
        self: &Arc<Self>,
        handler: impl Fn(&str) + Send + Sync + 'static,
    ) -> Subscription {
        self.subscribe(move |notice| {
            if let SessionNotice::Message(Inbound::Error { message }) = notice {
                handler(message);
            }
        })
    }

    /// Removes a subscriber. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.handlers.write().remove(&id).is_some();
        if removed {
            trace!(%id, "Unsubscribed");
        }
        removed
    }

    /// Returns the number of subscribers.
    #[inline]
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.handlers.read().len()
    }

    /// Delivers one notice to every subscriber.
    ///
    /// Handlers run outside the subscriber lock, so they may subscribe or
    /// unsubscribe themselves.
    pub fn dispatch(&self, notice: &SessionNotice) {
        let handlers: Vec<NoticeHandler> = self.handlers.read().values().cloned().collect();
        for handler in handlers {
            handler(notice);
        }
    }

    /// Delivers notices in order.
    pub fn dispatch_all(&self, notices: impl IntoIterator<Item = SessionNotice>) {
        for notice in notices {
            self.dispatch(&notice);
        }
    }
}

// ============================================================================
// Subscription
// ============================================================================

/// Live subscription. Unsubscribes on drop.
pub struct Subscription {
    id: SubscriptionId,
    dispatcher: Weak<Dispatcher>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Subscription {
    /// Returns the subscription id.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Unsubscribes now.
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(dispatcher) = self.dispatcher.upgrade() {
            dispatcher.unsubscribe(self.id);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
