//! In-memory frame sink for flow tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::protocol::Outbound;
use crate::session::{Dispatcher, NoticeHandler, SessionNotice, Subscription};

use super::FrameSink;

pub(crate) struct MockSink {
    pub dispatcher: Arc<Dispatcher>,
    pub sent: Mutex<Vec<Outbound>>,
    pub open: AtomicBool,
    /// Notice dispatched right after every accepted send.
    pub auto_reply: Mutex<Option<SessionNotice>>,
}

impl MockSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            dispatcher: Dispatcher::new(),
            sent: Mutex::new(Vec::new()),
            open: AtomicBool::new(true),
            auto_reply: Mutex::new(None),
        })
    }

    pub fn with_reply(notice: SessionNotice) -> Arc<Self> {
        let sink = Self::new();
        *sink.auto_reply.lock() = Some(notice);
        sink
    }

    pub fn sent(&self) -> Vec<Outbound> {
        self.sent.lock().clone()
    }

    pub fn notify(&self, notice: SessionNotice) {
        self.dispatcher.dispatch(&notice);
    }
}

impl FrameSink for MockSink {
    fn send(&self, message: &Outbound) -> bool {
        if !self.open.load(Ordering::SeqCst) {
            return false;
        }
        self.sent.lock().push(message.clone());
        let reply = self.auto_reply.lock().clone();
        if let Some(notice) = reply {
            self.dispatcher.dispatch(&notice);
        }
        true
    }

    fn subscribe_notices(&self, handler: NoticeHandler) -> Subscription {
        self.dispatcher.subscribe(move |notice| handler(notice))
    }
}
