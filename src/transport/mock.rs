//! In-memory transport for session and client tests.
//!
//! The test keeps a clone and plays the server: it accepts, replies,
//! fails or drops connections by pushing events into the sink the session
//! handed to the last `open`.

use std::sync::Arc;

use parking_lot::Mutex;

use super::{CLOSE_ABNORMAL, EventSink, Transport, TransportEvent};

#[derive(Debug, Default)]
pub(crate) struct MockState {
    /// URL of every `open` call, in order.
    pub opens: Vec<String>,
    /// Every text frame accepted by `send`.
    pub sent: Vec<String>,
    /// Number of `close` calls that closed a live handle.
    pub closes: usize,
    /// Whether the current handle is open.
    pub open: bool,
    /// Sink of the current handle.
    pub sink: Option<EventSink>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct MockTransport {
    pub state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of connection attempts so far.
    pub fn open_count(&self) -> usize {
        self.state.lock().opens.len()
    }

    /// Text frames that reached the transport.
    pub fn sent(&self) -> Vec<String> {
        self.state.lock().sent.clone()
    }

    /// Completes the pending connection.
    pub fn accept(&self) {
        let mut state = self.state.lock();
        state.open = true;
        if let Some(sink) = &state.sink {
            sink.emit(TransportEvent::Opened);
        }
    }

    /// Delivers one inbound text frame.
    pub fn reply(&self, text: &str) {
        let state = self.state.lock();
        if let Some(sink) = &state.sink {
            sink.emit(TransportEvent::Message(text.to_string()));
        }
    }

    /// Fails the current connection the way a refused connect does.
    pub fn fail(&self) {
        let mut state = self.state.lock();
        state.open = false;
        if let Some(sink) = &state.sink {
            sink.emit(TransportEvent::Error("connection refused".into()));
            sink.emit(TransportEvent::Closed {
                code: CLOSE_ABNORMAL,
                reason: "connection refused".into(),
            });
        }
    }

    /// Drops the current connection without an error.
    pub fn drop_connection(&self) {
        let mut state = self.state.lock();
        state.open = false;
        if let Some(sink) = &state.sink {
            sink.emit(TransportEvent::Closed {
                code: CLOSE_ABNORMAL,
                reason: String::new(),
            });
        }
    }
}

impl Transport for MockTransport {
    fn open(&mut self, url: &str, sink: EventSink) {
        let mut state = self.state.lock();
        state.opens.push(url.to_string());
        state.open = false;
        state.sink = Some(sink);
    }

    fn send(&mut self, text: String) -> bool {
        let mut state = self.state.lock();
        if state.open {
            state.sent.push(text);
            true
        } else {
            false
        }
    }

    fn close(&mut self) {
        let mut state = self.state.lock();
        if state.sink.take().is_some() {
            state.closes += 1;
        }
        state.open = false;
    }

    fn is_open(&self) -> bool {
        self.state.lock().open
    }
}
