//! Reconnecting session state machine.
//!
//! A [`Session`] owns one [`Transport`], the [`ReconnectPolicy`] and the
//! pending [`ReconnectTimer`]. It is synchronous: every input arrives as a
//! [`SessionEvent`] through [`Session::handle`] or as a direct call
//! (`connect`, `disconnect`, `retry`, `send`), and every output is queued
//! as a [`SessionNotice`] for the caller to drain with
//! [`Session::take_notices`] and dispatch once it has released any lock
//! around the session.
//!
//! Each `connect` and `disconnect` moves the session to a fresh
//! [`ConnectionId`]. Transport events tagged with an older id, and timer
//! expiries with an older [`TimerId`], are ignored.

// ============================================================================
// Imports
// ============================================================================

use std::mem;

use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

use crate::identifiers::{ConnectionId, TimerId};
use crate::protocol::Outbound;
use crate::transport::{CLOSE_NORMAL, Endpoint, EventSink, Transport, TransportEvent};

use super::config::SessionConfig;
use super::dispatch::decode;
use super::policy::{CloseDecision, ReconnectPolicy};
use super::status::{EXHAUSTED_MESSAGE, NO_ENDPOINT_MESSAGE, SessionStatus};
use super::timer::ReconnectTimer;
use super::{SessionEvent, SessionNotice};

// ============================================================================
// Session
// ============================================================================

/// One logical connection lifecycle to one server endpoint.
#[derive(Debug)]
pub struct Session<T: Transport> {
    /// Target server, if configured.
    endpoint: Option<Endpoint>,
    /// Socket handle.
    transport: T,
    /// Reconnect bookkeeping.
    policy: ReconnectPolicy,
    /// Current status.
    status: SessionStatus,
    /// Last error surfaced to the consumer.
    error: Option<String>,
    /// Id of the live transport handle.
    conn: ConnectionId,
    /// Whether `conn` may still produce events.
    handle_live: bool,
    /// Id handed to the next scheduled timer.
    next_timer: TimerId,
    /// Pending reconnect.
    timer: Option<ReconnectTimer>,
    /// Queue shared with the transport and the timer.
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    /// Outbox drained by `take_notices`.
    notices: Vec<SessionNotice>,
}

impl<T: Transport> Session<T> {
    /// Creates a disconnected session and the receiving end of its event
    /// queue.
    ///
    /// The receiver must be drained into [`handle`](Self::handle), usually
    /// by a driver task.
    #[must_use]
    pub fn new(
        config: &SessionConfig,
        transport: T,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let session = Self {
            endpoint: config.endpoint.clone(),
            transport,
            policy: config.policy(),
            status: SessionStatus::Disconnected,
            error: None,
            conn: ConnectionId::new(0),
            handle_live: false,
            next_timer: TimerId::new(1),
            timer: None,
            events_tx,
            notices: Vec::new(),
        };
        (session, events_rx)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Returns the current status.
    #[inline]
    #[must_use]
    pub const fn status(&self) -> SessionStatus {
        self.status
    }

    /// Returns the last error, cleared by a successful open.
    #[inline]
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns the configured endpoint.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> Option<&Endpoint> {
        self.endpoint.as_ref()
    }

    /// Returns the reconnect attempts made since the last open or retry.
    #[inline]
    #[must_use]
    pub const fn reconnect_attempts(&self) -> u32 {
        self.policy.attempts()
    }

    /// Returns `true` after `disconnect()` until `retry()`.
    #[inline]
    #[must_use]
    pub const fn is_manually_disconnected(&self) -> bool {
        self.policy.is_manually_disconnected()
    }

    /// Returns the id of the current transport handle.
    #[inline]
    #[must_use]
    pub const fn connection_id(&self) -> ConnectionId {
        self.conn
    }

    /// Returns `true` while a reconnect is scheduled.
    #[inline]
    #[must_use]
    pub const fn has_pending_reconnect(&self) -> bool {
        self.timer.is_some()
    }

    /// Returns `true` if the transport can send right now.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.transport.is_open()
    }

    /// Drains queued notices, oldest first.
    #[must_use]
    pub fn take_notices(&mut self) -> Vec<SessionNotice> {
        mem::take(&mut self.notices)
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Replaces the endpoint. Takes effect on the next connect.
    pub fn set_endpoint(&mut self, endpoint: Option<Endpoint>) {
        debug!(endpoint = ?endpoint.as_ref().map(Endpoint::ws_url), "Endpoint updated");
        self.endpoint = endpoint;
    }

    /// Starts a connection attempt, superseding any live handle.
    ///
    /// Without an endpoint the status becomes [`SessionStatus::NoEndpoint`]
    /// and nothing is attempted.
    pub fn connect(&mut self) {
        let Some(url) = self.endpoint.as_ref().map(Endpoint::ws_url) else {
            warn!("Connect requested without an endpoint");
            self.cancel_timer();
            self.set_status(SessionStatus::NoEndpoint);
            self.fail(NO_ENDPOINT_MESSAGE);
            return;
        };

        self.cancel_timer();
        let was_live = self.handle_live;
        self.release_handle();
        self.conn = self.conn.next();

        // The superseded handle's own close carries the old id and is dropped.
        if was_live {
            self.notices.push(SessionNotice::Closed {
                code: CLOSE_NORMAL,
                reason: "superseded".into(),
            });
        }
        self.handle_live = true;

        if !matches!(self.status, SessionStatus::Reconnecting { .. }) {
            self.set_status(SessionStatus::Connecting);
        }

        info!(conn = %self.conn, %url, "Connecting to server");
        self.transport
            .open(&url, EventSink::new(self.conn, self.events_tx.clone()));
    }

    /// Closes the connection and stops reconnecting until [`retry`](Self::retry).
    pub fn disconnect(&mut self) {
        info!(conn = %self.conn, "Disconnecting");
        self.policy.disconnect();
        self.cancel_timer();

        let was_live = self.handle_live;
        self.release_handle();
        self.conn = self.conn.next();

        if was_live {
            self.notices.push(SessionNotice::Closed {
                code: CLOSE_NORMAL,
                reason: "client disconnected".into(),
            });
        }
        self.set_status(SessionStatus::Disconnected);
    }

    /// Resets the reconnect budget and connects immediately.
    pub fn retry(&mut self) {
        info!("Retrying connection");
        self.policy.retry();
        self.error = None;
        self.connect();
    }

    /// Sends one outbound envelope.
    ///
    /// Returns `false` if the socket is not open or the envelope could not
    /// be serialized.
    pub fn send(&mut self, message: &Outbound) -> bool {
        if !self.transport.is_open() {
            debug!(kind = message.kind(), status = %self.status, "Send skipped: not connected");
            return false;
        }
        match message.to_json() {
            Ok(text) => self.send_text(text),
            Err(e) => {
                error!(error = %e, kind = message.kind(), "Failed to encode message");
                false
            }
        }
    }

    /// Sends one raw text frame. Returns `false` if the socket is not open.
    pub fn send_text(&mut self, text: String) -> bool {
        let sent = self.transport.send(text);
        if !sent {
            debug!(conn = %self.conn, "Transport rejected frame");
        }
        sent
    }

    // ========================================================================
    // Event Handling
    // ========================================================================

    /// Applies one queued event.
    pub fn handle(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Transport { conn, event } => {
                if conn != self.conn || !self.handle_live {
                    trace!(%conn, current = %self.conn, "Ignoring event from stale connection");
                    return;
                }
                self.handle_transport(event);
            }

            SessionEvent::ReconnectDue(id) => {
                if self.timer.as_ref().map(ReconnectTimer::id) != Some(id) {
                    trace!(%id, "Ignoring stale reconnect timer");
                    return;
                }
                self.timer = None;
                if self.policy.is_manually_disconnected() {
                    return;
                }
                debug!(%id, attempt = self.policy.attempts(), "Reconnect due");
                self.connect();
            }
        }
    }

    fn handle_transport(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Opened => {
                info!(conn = %self.conn, "Connected");
                self.policy.on_open();
                self.error = None;
                self.set_status(SessionStatus::Connected);
            }

            TransportEvent::Message(text) => {
                if let Some(message) = decode(&text) {
                    self.notices.push(SessionNotice::Message(message));
                }
            }

            TransportEvent::Error(message) => {
                warn!(conn = %self.conn, error = %message, "Transport error");
                self.set_status(SessionStatus::Error);
                self.error = Some(message.clone());
                self.notices.push(SessionNotice::TransportError(message));
            }

            TransportEvent::Closed { code, reason } => {
                debug!(conn = %self.conn, code, %reason, "Connection closed");
                self.handle_live = false;
                self.notices.push(SessionNotice::Closed { code, reason });
                self.set_status(SessionStatus::Disconnected);
                self.on_close();
            }
        }
    }

    fn on_close(&mut self) {
        match self.policy.on_close() {
            CloseDecision::Reconnect {
                attempt,
                max,
                delay,
            } => {
                let id = self.next_timer;
                self.next_timer = id.next();
                info!(attempt, max, delay_ms = delay.as_millis() as u64, "Scheduling reconnect");
                self.timer = Some(ReconnectTimer::schedule(id, delay, self.events_tx.clone()));
                self.set_status(SessionStatus::Reconnecting { attempt, max });
            }

            CloseDecision::Exhausted { attempts } => {
                error!(attempts, "Maximum reconnection attempts reached");
                self.set_status(SessionStatus::Exhausted);
                self.fail(EXHAUSTED_MESSAGE);
            }

            CloseDecision::Stay => {}
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn set_status(&mut self, status: SessionStatus) {
        if self.status != status {
            trace!(from = %self.status, to = %status, "Status changed");
            self.status = status;
            self.notices.push(SessionNotice::Status(status));
        }
    }

    fn fail(&mut self, message: &str) {
        self.error = Some(message.to_string());
        self.notices.push(SessionNotice::Failed(message.to_string()));
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }

    fn release_handle(&mut self) {
        self.transport.close();
        self.handle_live = false;
    }
}

impl<T: Transport> Drop for Session<T> {
    fn drop(&mut self) {
        self.cancel_timer();
        self.transport.close();
    }
}

// ============================================================================
// Tests
// ============================================================================
