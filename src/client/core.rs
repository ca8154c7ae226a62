//! Stream client handle.
//!
//! A [`StreamClient`] is a cheap, cloneable handle around one [`Session`].
//! A driver task drains the session's event queue; every state change,
//! whether driven by that task or by a call on the handle, is applied under
//! the session lock and its notices are dispatched after the lock is
//! released.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::Result;
use crate::flow::FrameSink;
use crate::protocol::{Inbound, InstructionPayload, Outbound};
use crate::session::{
    Dispatcher, NoticeHandler, Session, SessionConfig, SessionEvent, SessionNotice,
    SessionStatus, Subscription,
};
use crate::transport::{Endpoint, Transport, WsTransport};

use super::builder::ClientBuilder;
use super::gate::{EnableGate, GateTransition};

// ============================================================================
// ClientInner
// ============================================================================

/// Shared state behind every handle.
struct ClientInner<T: Transport> {
    /// Session state machine.
    session: Mutex<Session<T>>,
    /// Subscriber fan-out.
    dispatcher: Arc<Dispatcher>,
    /// Consumer's enable switch.
    gate: EnableGate,
    /// Event pump task.
    driver: JoinHandle<()>,
}

impl<T: Transport> ClientInner<T> {
    /// Runs `f` on the session, then dispatches what it produced.
    fn apply<R>(&self, f: impl FnOnce(&mut Session<T>) -> R) -> R {
        let (result, notices) = {
            let mut session = self.session.lock();
            let result = f(&mut session);
            (result, session.take_notices())
        };
        self.dispatcher.dispatch_all(notices);
        result
    }
}

impl<T: Transport> Drop for ClientInner<T> {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

/// Pumps session events until the queue closes or every handle is gone.
async fn drive<T: Transport>(
    inner: Weak<ClientInner<T>>,
    mut events: mpsc::UnboundedReceiver<SessionEvent>,
) {
    while let Some(event) = events.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        inner.apply(|session| session.handle(event));
    }
    debug!("Session driver stopped");
}

// ============================================================================
// StreamClient
// ============================================================================

/// Handle to a reconnecting frame-stream session.
///
/// Cloning is cheap; all clones share the session. The session closes when
/// the last clone is dropped.
///
/// # Example
///
/// ```no_run
/// use frame_stream_client::{Outbound, StreamClient};
///
/// # async fn example() -> frame_stream_client::Result<()> {
/// let client = StreamClient::builder().host("10.0.0.5").build()?;
///
/// let _sub = client.on_success(|payload| {
///     if let Some(cue) = payload.cue() {
///         println!("cue: {cue}");
///     }
/// });
///
/// client.send(&Outbound::image("/9j/4AAQ..."));
/// # Ok(())
/// # }
/// ```
pub struct StreamClient<T: Transport = WsTransport> {
    inner: Arc<ClientInner<T>>,
}

impl<T: Transport> Clone for StreamClient<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport> fmt::Debug for StreamClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let session = self.inner.session.lock();
        f.debug_struct("StreamClient")
            .field("endpoint", &session.endpoint().map(Endpoint::ws_url))
            .field("status", &session.status())
            .field("enabled", &self.inner.gate.is_enabled())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// StreamClient - Constructors
// ============================================================================

impl StreamClient<WsTransport> {
    /// Creates a builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Connects to `host` with default settings.
    ///
    /// # Errors
    ///
    /// See [`ClientBuilder::build`].
    pub fn connect(host: impl Into<String>) -> Result<Self> {
        ClientBuilder::new().host(host).build()
    }
}

impl<T: Transport> StreamClient<T> {
    /// Wires a session to its driver task. Must run inside a tokio runtime.
    pub(crate) fn new(config: &SessionConfig, transport: T, enabled: bool) -> Self {
        let (session, events) = Session::new(config, transport);

        let inner = Arc::new_cyclic(|weak: &Weak<ClientInner<T>>| ClientInner {
            session: Mutex::new(session),
            dispatcher: Dispatcher::new(),
            gate: EnableGate::new(enabled),
            driver: tokio::spawn(drive(weak.clone(), events)),
        });

        let client = Self { inner };
        if enabled {
            client.inner.apply(Session::connect);
        }

        info!(enabled, "Stream client created");
        client
    }
}

// ============================================================================
// StreamClient - State
// ============================================================================

impl<T: Transport> StreamClient<T> {
    /// Returns the current status.
    #[inline]
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.inner.session.lock().status()
    }

    /// Returns the last error, if any.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.inner.session.lock().error().map(str::to_string)
    }

    /// Returns `true` if the socket is open.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.status().is_connected()
    }

    /// Returns the reconnect attempts made since the last open or retry.
    #[inline]
    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.session.lock().reconnect_attempts()
    }

    /// Returns `true` if the consumer wants the session running.
    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.inner.gate.is_enabled()
    }

    /// Returns the configured endpoint.
    #[must_use]
    pub fn endpoint(&self) -> Option<Endpoint> {
        self.inner.session.lock().endpoint().cloned()
    }

    /// Resolves a server-relative path, such as a `confirmation` URL,
    /// against the endpoint's HTTP origin.
    #[must_use]
    pub fn resource_url(&self, relative: &str) -> Option<String> {
        self.inner
            .session
            .lock()
            .endpoint()
            .map(|e| e.resource_url(relative))
    }

    /// Returns the subscriber registry.
    #[inline]
    #[must_use]
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.inner.dispatcher
    }
}

// ============================================================================
// StreamClient - Control
// ============================================================================

impl<T: Transport> StreamClient<T> {
    /// Resets the reconnect budget and connects now.
    pub fn retry(&self) {
        self.inner.apply(Session::retry);
    }

    /// Closes the connection and stops reconnecting until [`retry`](Self::retry).
    pub fn disconnect(&self) {
        self.inner.apply(Session::disconnect);
    }

    /// Starts or stops the session. Repeated calls with the same value do
    /// nothing.
    pub fn set_enabled(&self, enabled: bool) {
        match self.inner.gate.set(enabled) {
            GateTransition::Enabled => {
                debug!("Client enabled");
                self.inner.apply(|session| {
                    // A disabled session always sits in `Disconnected`.
                    if !session.status().is_active() {
                        session.retry();
                    }
                });
            }
            GateTransition::Disabled => {
                debug!("Client disabled");
                self.inner.apply(Session::disconnect);
            }
            GateTransition::Unchanged => {}
        }
    }

    /// Points the session at a new host, reconnecting if enabled.
    ///
    /// # Errors
    ///
    /// Returns an endpoint error if `host` is empty or invalid; the current
    /// endpoint is kept.
    pub fn set_host(&self, host: &str) -> Result<()> {
        let endpoint = Endpoint::new(host)?;
        let enabled = self.is_enabled();
        self.inner.apply(|session| {
            session.set_endpoint(Some(endpoint));
            if enabled {
                session.retry();
            }
        });
        Ok(())
    }

    /// Sends one envelope. Returns `false` if the socket is not open.
    pub fn send(&self, message: &Outbound) -> bool {
        self.inner.session.lock().send(message)
    }
}

// ============================================================================
// StreamClient - Subscriptions
// ============================================================================

impl<T: Transport> StreamClient<T> {
    /// Subscribes to every session notice.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(
        &self,
        handler: impl Fn(&SessionNotice) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.dispatcher.subscribe(handler)
    }

    /// Subscribes to inbound messages.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn on_message(&self, handler: impl Fn(&Inbound) + Send + Sync + 'static) -> Subscription {
        self.inner.dispatcher.on_message(handler)
    }

    /// Subscribes to `success` messages.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn on_success(
        &self,
        handler: impl Fn(&InstructionPayload) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.dispatcher.on_success(handler)
    }

    /// Subscribes to server `error` messages.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn on_error(&self, handler: impl Fn(&str) + Send + Sync + 'static) -> Subscription {
        self.inner.dispatcher.on_error(handler)
    }
}

impl<T: Transport> FrameSink for StreamClient<T> {
    fn send(&self, message: &Outbound) -> bool {
        StreamClient::send(self, message)
    }

    fn subscribe_notices(&self, handler: NoticeHandler) -> Subscription {
        self.inner.dispatcher.subscribe(move |notice| handler(notice))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use tokio::time::timeout;

    use crate::flow::{FrameFlowController, SubmitOutcome};
    use crate::transport::mock::MockTransport;

    fn client(mock: &MockTransport) -> StreamClient<MockTransport> {
        ClientBuilder::new()
            .host("10.0.0.5")
            .reconnect_delay(Duration::from_millis(50))
            .build_with_transport(mock.clone())
            .expect("build")
    }

    /// Yields until `cond` holds.
    async fn wait_for(cond: impl Fn() -> bool) {
        timeout(Duration::from_secs(5), async {
            while !cond() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("condition reached");
    }

    #[tokio::test]
    async fn test_connect_and_scenario_single_frame() {
        let mock = MockTransport::new();
        let client = client(&mock);

        mock.accept();
        wait_for(|| client.is_connected()).await;

        let controller = FrameFlowController::new(Arc::new(client.clone()));
        assert_eq!(controller.submit_frame("abc123"), SubmitOutcome::Sent);
        assert_eq!(controller.submit_frame("abc123"), SubmitOutcome::Dropped);

        let sent = mock.sent();
        assert_eq!(sent.len(), 1);
        let value: serde_json::Value = serde_json::from_str(&sent[0]).expect("json");
        assert_eq!(value["type"], "frame");
        assert_eq!(value["data"], "data:image/jpeg;base64,abc123");
        assert!(value["timestamp"].as_u64().is_some());

        mock.reply(r#"{"type":"success","data":"turn_left"}"#);
        wait_for(|| !controller.is_in_flight()).await;
        assert_eq!(controller.submit_frame("def456"), SubmitOutcome::Sent);
    }

    #[tokio::test]
    async fn test_subscribers_see_status_and_messages() {
        let mock = MockTransport::new();
        let client = client(&mock);

        let seen: Arc<parking_lot::Mutex<Vec<SessionNotice>>> = Arc::default();
        let sink = Arc::clone(&seen);
        let _sub = client.subscribe(move |notice| sink.lock().push(notice.clone()));

        let cues: Arc<parking_lot::Mutex<Vec<String>>> = Arc::default();
        let cue_sink = Arc::clone(&cues);
        let _on_success = client.on_success(move |payload| {
            if let Some(cue) = payload.cue() {
                cue_sink.lock().push(cue.to_string());
            }
        });

        mock.accept();
        mock.reply("garbage");
        mock.reply(r#"{"type":"success","data":"possible_left_turn"}"#);
        wait_for(|| cues.lock().len() == 1).await;

        assert_eq!(*cues.lock(), vec!["possible_left_turn".to_string()]);
        assert!(seen.lock().contains(&SessionNotice::Status(SessionStatus::Connected)));
    }

    #[tokio::test]
    async fn test_enable_gate_is_idempotent() {
        let mock = MockTransport::new();
        let client = ClientBuilder::new()
            .host("10.0.0.5")
            .enabled(false)
            .build_with_transport(mock.clone())
            .expect("build");

        client.set_enabled(true);
        client.set_enabled(true);
        assert_eq!(mock.open_count(), 1);
        assert_eq!(client.status(), SessionStatus::Connecting);

        mock.accept();
        wait_for(|| client.is_connected()).await;

        client.set_enabled(false);
        client.set_enabled(false);
        assert_eq!(client.status(), SessionStatus::Disconnected);
        assert_eq!(mock.state.lock().closes, 1);

        client.set_enabled(true);
        assert_eq!(mock.open_count(), 2);
    }

    #[tokio::test]
    async fn test_retry_releases_in_flight_frame() {
        let mock = MockTransport::new();
        let client = client(&mock);

        mock.accept();
        wait_for(|| client.is_connected()).await;

        let controller = FrameFlowController::new(Arc::new(client.clone()));
        assert_eq!(controller.submit_frame("a"), SubmitOutcome::Sent);

        client.retry();
        assert!(!controller.is_in_flight());

        mock.accept();
        wait_for(|| client.is_connected()).await;
        assert_eq!(controller.submit_frame("b"), SubmitOutcome::Sent);
    }

    #[tokio::test]
    async fn test_set_host_releases_in_flight_frame() {
        let mock = MockTransport::new();
        let client = client(&mock);

        mock.accept();
        wait_for(|| client.is_connected()).await;

        let controller = FrameFlowController::new(Arc::new(client.clone()));
        assert_eq!(controller.submit_frame("a"), SubmitOutcome::Sent);

        client.set_host("10.0.0.6").expect("host");
        assert!(!controller.is_in_flight());
        assert_eq!(mock.open_count(), 2);

        mock.accept();
        wait_for(|| client.is_connected()).await;
        assert_eq!(controller.submit_frame("b"), SubmitOutcome::Sent);
    }

    #[tokio::test]
    async fn test_enable_after_transport_error_opens_once() {
        let mock = MockTransport::new();
        let client = client(&mock);

        mock.fail();
        wait_for(|| matches!(client.status(), SessionStatus::Reconnecting { .. })).await;

        client.set_enabled(false);
        assert_eq!(client.status(), SessionStatus::Disconnected);
        let opens = mock.open_count();

        client.set_enabled(true);
        client.set_enabled(true);
        assert_eq!(mock.open_count(), opens + 1);
        assert_eq!(client.status(), SessionStatus::Connecting);
    }

    #[tokio::test]
    async fn test_no_endpoint_reports_error() {
        let mock = MockTransport::new();
        let client = ClientBuilder::new()
            .build_with_transport(mock.clone())
            .expect("build");

        assert_eq!(client.status(), SessionStatus::NoEndpoint);
        assert_eq!(client.error().as_deref(), Some("No server IP configured"));
        assert_eq!(mock.open_count(), 0);

        client.set_host("10.0.0.9").expect("host");
        assert_eq!(mock.open_count(), 1);
        assert_eq!(client.error(), None);
    }

    #[tokio::test]
    async fn test_reconnects_through_driver() {
        let mock = MockTransport::new();
        let client = client(&mock);

        mock.fail();
        wait_for(|| matches!(client.status(), SessionStatus::Reconnecting { attempt: 1, .. })).await;
        wait_for(|| mock.open_count() == 2).await;

        mock.accept();
        wait_for(|| client.is_connected()).await;
        assert_eq!(client.reconnect_attempts(), 0);
    }

    #[tokio::test]
    async fn test_resource_url() {
        let mock = MockTransport::new();
        let client = client(&mock);
        assert_eq!(
            client.resource_url("/processed/abc.jpg").as_deref(),
            Some("http://10.0.0.5:8000/processed/abc.jpg")
        );
    }
}
