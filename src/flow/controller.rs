//! Single in-flight frame controller.
//!
//! Holds a one-slot token. [`FrameFlowController::submit_frame`] takes the
//! token or drops the frame; any reply, close or transport error seen on
//! the session returns it. Dropped frames are never queued: for a live
//! feed the freshest frame is the one worth sending.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, trace};

use crate::protocol::Outbound;
use crate::session::{SessionNotice, Subscription};

use super::{FrameSink, FrameSource};

// ============================================================================
// SubmitOutcome
// ============================================================================

/// Result of one [`FrameFlowController::submit_frame`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Frame handed to the transport; the slot is now taken.
    Sent,
    /// A frame was already in flight; this one was discarded.
    Dropped,
    /// The session refused the frame; the slot was released.
    Failed,
}

// ============================================================================
// FlowStats
// ============================================================================

/// Counters since the controller was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlowStats {
    /// Frames handed to the transport.
    pub sent: u64,
    /// Frames discarded while another was in flight.
    pub dropped: u64,
    /// Frames the session refused.
    pub failed: u64,
    /// Releases caused by a server reply.
    pub replies: u64,
}

// ============================================================================
// FlowState
// ============================================================================

/// State shared with the notice subscription.
#[derive(Debug, Default)]
struct FlowState {
    in_flight: AtomicBool,
    sent: AtomicU64,
    dropped: AtomicU64,
    failed: AtomicU64,
    replies: AtomicU64,
}

// ============================================================================
// FrameFlowController
// ============================================================================

/// Throttles frame submission to one outstanding frame.
pub struct FrameFlowController<S: FrameSink> {
    sink: Arc<S>,
    state: Arc<FlowState>,
    stop_tx: watch::Sender<bool>,
    _subscription: Subscription,
}

impl<S: FrameSink> fmt::Debug for FrameFlowController<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameFlowController")
            .field("in_flight", &self.is_in_flight())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl<S: FrameSink> FrameFlowController<S> {
    /// Creates a controller and subscribes it to the sink's notices.
    #[must_use]
    pub fn new(sink: Arc<S>) -> Self {
        let state = Arc::new(FlowState::default());

        let release_state = Arc::clone(&state);
        let subscription = sink.subscribe_notices(Arc::new(move |notice: &SessionNotice| {
            if !notice.releases_in_flight() {
                return;
            }
            if notice.as_message().is_some() {
                release_state.replies.fetch_add(1, Ordering::Relaxed);
            }
            if release_state.in_flight.swap(false, Ordering::AcqRel) {
                trace!("In-flight frame released");
            }
        }));

        let (stop_tx, _) = watch::channel(false);

        Self {
            sink,
            state,
            stop_tx,
            _subscription: subscription,
        }
    }

    /// Returns the sink.
    #[inline]
    #[must_use]
    pub fn sink(&self) -> &Arc<S> {
        &self.sink
    }

    /// Returns `true` while a frame awaits its reply.
    #[inline]
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.state.in_flight.load(Ordering::Acquire)
    }

    /// Returns a snapshot of the counters.
    #[must_use]
    pub fn stats(&self) -> FlowStats {
        FlowStats {
            sent: self.state.sent.load(Ordering::Relaxed),
            dropped: self.state.dropped.load(Ordering::Relaxed),
            failed: self.state.failed.load(Ordering::Relaxed),
            replies: self.state.replies.load(Ordering::Relaxed),
        }
    }

    /// Submits one base64 JPEG frame stamped with the current wall clock.
    pub fn submit_frame(&self, base64_jpeg: &str) -> SubmitOutcome {
        if self
            .state
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.state.dropped.fetch_add(1, Ordering::Relaxed);
            trace!("Frame dropped: another frame in flight");
            return SubmitOutcome::Dropped;
        }

        if self.sink.send(&Outbound::frame(base64_jpeg)) {
            self.state.sent.fetch_add(1, Ordering::Relaxed);
            SubmitOutcome::Sent
        } else {
            self.state.in_flight.store(false, Ordering::Release);
            self.state.failed.fetch_add(1, Ordering::Relaxed);
            debug!("Frame send failed");
            SubmitOutcome::Failed
        }
    }

    /// Sends one still image. Not throttled.
    pub fn submit_image(&self, base64_jpeg: &str) -> bool {
        self.sink.send(&Outbound::image(base64_jpeg))
    }

    /// Pulls a frame from `source` every `period` until [`stop`](Self::stop).
    ///
    /// Ticks where the source has nothing are skipped, as are ticks missed
    /// while the source was slow. Returns the counters at exit.
    pub async fn stream<F>(&self, source: &mut F, period: Duration) -> FlowStats
    where
        F: FrameSource + ?Sized,
    {
        self.stop_tx.send_replace(false);
        let mut stop_rx = self.stop_tx.subscribe();

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(period_ms = period.as_millis() as u64, "Frame stream started");

        loop {
            if *stop_rx.borrow_and_update() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {
                    if let Some(frame) = source.next_frame().await {
                        self.submit_frame(&frame);
                    }
                }

                _ = stop_rx.changed() => {}
            }
        }

        let stats = self.stats();
        info!(sent = stats.sent, dropped = stats.dropped, failed = stats.failed, "Frame stream stopped");
        stats
    }

    /// Ends a running [`stream`](Self::stream).
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use proptest::prelude::*;

    use crate::flow::mock::MockSink;
    use crate::protocol::{Inbound, InstructionPayload};

    fn reply() -> SessionNotice {
        SessionNotice::Message(Inbound::Success {
            data: InstructionPayload::Cue("continue_forward".into()),
        })
    }

    #[test]
    fn test_back_to_back_submissions_send_one_frame() {
        let sink = MockSink::new();
        let controller = FrameFlowController::new(Arc::clone(&sink));

        assert_eq!(controller.submit_frame("abc123"), SubmitOutcome::Sent);
        assert_eq!(controller.submit_frame("abc123"), SubmitOutcome::Dropped);

        let sent = sink.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind(), "frame");
        assert_eq!(sent[0].data().as_str(), "data:image/jpeg;base64,abc123");
        assert_eq!(controller.stats().dropped, 1);
    }

    #[test]
    fn test_reply_releases_slot() {
        let sink = MockSink::new();
        let controller = FrameFlowController::new(Arc::clone(&sink));

        controller.submit_frame("a");
        sink.notify(reply());
        assert!(!controller.is_in_flight());
        assert_eq!(controller.submit_frame("b"), SubmitOutcome::Sent);
        assert_eq!(controller.stats().replies, 1);
    }

    #[test]
    fn test_error_reply_and_close_release_slot() {
        let sink = MockSink::new();
        let controller = FrameFlowController::new(Arc::clone(&sink));

        controller.submit_frame("a");
        sink.notify(SessionNotice::Message(Inbound::Error {
            message: "bad frame".into(),
        }));
        assert!(!controller.is_in_flight());

        controller.submit_frame("b");
        sink.notify(SessionNotice::Closed {
            code: 1006,
            reason: String::new(),
        });
        assert!(!controller.is_in_flight());
    }

    #[test]
    fn test_status_notice_keeps_slot() {
        let sink = MockSink::new();
        let controller = FrameFlowController::new(Arc::clone(&sink));

        controller.submit_frame("a");
        sink.notify(SessionNotice::Status(crate::session::SessionStatus::Connected));
        assert!(controller.is_in_flight());
    }

    #[test]
    fn test_failed_send_releases_slot() {
        let sink = MockSink::new();
        sink.open.store(false, Ordering::SeqCst);
        let controller = FrameFlowController::new(Arc::clone(&sink));

        assert_eq!(controller.submit_frame("a"), SubmitOutcome::Failed);
        assert!(!controller.is_in_flight());

        sink.open.store(true, Ordering::SeqCst);
        assert_eq!(controller.submit_frame("a"), SubmitOutcome::Sent);
    }

    #[test]
    fn test_submit_image_not_throttled() {
        let sink = MockSink::new();
        let controller = FrameFlowController::new(Arc::clone(&sink));

        controller.submit_frame("a");
        assert!(controller.submit_image("b"));
        assert!(controller.submit_image("c"));
        assert_eq!(sink.sent().len(), 3);
        assert!(controller.is_in_flight());
    }

    struct CountingSource {
        calls: usize,
    }

    #[async_trait]
    impl FrameSource for CountingSource {
        async fn next_frame(&mut self) -> Option<String> {
            self.calls += 1;
            // Every other tick has nothing ready.
            (self.calls % 2 == 1).then(|| format!("frame{}", self.calls))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_pumps_until_stopped() {
        let sink = MockSink::with_reply(reply());
        let controller = Arc::new(FrameFlowController::new(Arc::clone(&sink)));

        let stopper = Arc::clone(&controller);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(950)).await;
            stopper.stop();
        });

        let mut source = CountingSource { calls: 0 };
        let stats = controller
            .stream(&mut source, Duration::from_millis(100))
            .await;

        // Ticks at 0, 100, ..., 900 ms.
        assert_eq!(source.calls, 10);
        assert_eq!(stats.sent, 5);
        assert_eq!(stats.dropped, 0);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Submit,
        Reply,
        Close,
        ToggleOpen,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            4 => Just(Op::Submit),
            2 => Just(Op::Reply),
            1 => Just(Op::Close),
            1 => Just(Op::ToggleOpen),
        ]
    }

    proptest! {
        #[test]
        fn prop_at_most_one_frame_in_flight(ops in prop::collection::vec(op(), 1..64)) {
            let sink = MockSink::new();
            let controller = FrameFlowController::new(Arc::clone(&sink));
            let mut outstanding = 0usize;

            for op in ops {
                match op {
                    Op::Submit => {
                        let before = sink.sent().len();
                        let outcome = controller.submit_frame("x");
                        let delivered = sink.sent().len() - before;
                        match outcome {
                            SubmitOutcome::Sent => {
                                prop_assert_eq!(outstanding, 0);
                                prop_assert_eq!(delivered, 1);
                                outstanding = 1;
                            }
                            SubmitOutcome::Dropped => {
                                prop_assert_eq!(outstanding, 1);
                                prop_assert_eq!(delivered, 0);
                            }
                            SubmitOutcome::Failed => {
                                prop_assert_eq!(outstanding, 0);
                                prop_assert_eq!(delivered, 0);
                            }
                        }
                    }
                    Op::Reply => {
                        sink.notify(reply());
                        outstanding = 0;
                    }
                    Op::Close => {
                        sink.notify(SessionNotice::Closed { code: 1006, reason: String::new() });
                        outstanding = 0;
                    }
                    Op::ToggleOpen => {
                        let open = sink.open.load(Ordering::SeqCst);
                        sink.open.store(!open, Ordering::SeqCst);
                    }
                }
                prop_assert_eq!(controller.is_in_flight(), outstanding == 1);
            }
        }
    }
}
