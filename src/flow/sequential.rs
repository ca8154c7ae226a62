//! Acknowledgement-gated batch submission.
//!
//! Sends frame `i`, waits for the server's reply to it, then sends frame
//! `i + 1`. Delivery is strictly ordered and fully acknowledged, at the
//! cost of throughput. Used to replay a recorded clip where every frame
//! matters.
//!
//! The reply resolver is registered before each send, so a reply that
//! arrives before the submitter starts waiting is not lost. A frame whose
//! wait timed out is still owed a reply; that late reply is discarded
//! instead of acknowledging a later frame.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::time::{Instant, timeout};
use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result};
use crate::protocol::{Inbound, Outbound};
use crate::session::{SessionNotice, Subscription};

use super::FrameSink;

// ============================================================================
// Constants
// ============================================================================

/// Default time to wait for each frame's reply.
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Types
// ============================================================================

/// What ended the wait for one frame.
#[derive(Debug)]
enum Ack {
    Reply(Inbound),
    Closed,
}

/// Reply slot shared with the notice subscription.
#[derive(Debug, Default)]
struct Waiter {
    tx: Option<oneshot::Sender<Ack>>,
    /// Replies still owed to frames that timed out.
    orphaned: usize,
}

type Resolver = Arc<Mutex<Waiter>>;

// ============================================================================
// BatchProgress
// ============================================================================

/// One acknowledged frame.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchProgress {
    /// Zero-based frame index.
    pub index: usize,
    /// Frames in the batch.
    pub total: usize,
    /// Send-to-reply round trip.
    pub latency: Duration,
    /// The server's reply.
    pub reply: Inbound,
}

// ============================================================================
// LatencyStats
// ============================================================================

/// Round-trip latency summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyStats {
    /// Fastest round trip.
    pub min: Duration,
    /// Slowest round trip.
    pub max: Duration,
    /// Mean round trip.
    pub average: Duration,
}

impl LatencyStats {
    /// Summarizes samples. Returns `None` for an empty slice.
    #[must_use]
    pub fn from_samples(samples: &[Duration]) -> Option<Self> {
        let min = samples.iter().min().copied()?;
        let max = samples.iter().max().copied()?;
        let total: Duration = samples.iter().sum();
        let count = u32::try_from(samples.len()).unwrap_or(u32::MAX);
        Some(Self {
            min,
            max,
            average: total / count,
        })
    }
}

impl fmt::Display for LatencyStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "avg {:.3}s, min {:.3}s, max {:.3}s",
            self.average.as_secs_f64(),
            self.min.as_secs_f64(),
            self.max.as_secs_f64()
        )
    }
}

// ============================================================================
// BatchReport
// ============================================================================

/// Outcome of a completed or stopped batch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchReport {
    /// Frames in the batch.
    pub total: usize,
    /// Frames handed to the transport.
    pub frames_sent: usize,
    /// Replies received.
    pub responses: usize,
    /// Replies of type `error`.
    pub server_errors: usize,
    /// Whether `stop()` ended the batch early.
    pub stopped: bool,
    /// Wall time of the whole batch.
    pub elapsed: Duration,
    /// Round-trip statistics, `None` if nothing was acknowledged.
    pub latency: Option<LatencyStats>,
}

impl BatchReport {
    /// Returns `true` if every frame was acknowledged.
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.stopped && self.responses == self.total
    }
}

// ============================================================================
// SequentialSubmitter
// ============================================================================

/// Sends frames one at a time, each after the previous one's reply.
pub struct SequentialSubmitter<S: FrameSink> {
    sink: Arc<S>,
    ack_timeout: Option<Duration>,
    resolver: Resolver,
    stopped: AtomicBool,
    _subscription: Subscription,
}

impl<S: FrameSink> fmt::Debug for SequentialSubmitter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequentialSubmitter")
            .field("ack_timeout", &self.ack_timeout)
            .field("stopped", &self.stopped.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<S: FrameSink> SequentialSubmitter<S> {
    /// Creates a submitter with the default reply timeout.
    #[must_use]
    pub fn new(sink: Arc<S>) -> Self {
        let resolver: Resolver = Arc::default();

        let slot = Arc::clone(&resolver);
        let subscription = sink.subscribe_notices(Arc::new(move |notice: &SessionNotice| {
            let mut waiter = slot.lock();
            let ack = match notice {
                SessionNotice::Message(msg) => {
                    if waiter.orphaned > 0 {
                        waiter.orphaned -= 1;
                        trace!(kind = ?msg.kind(), "Discarding late reply");
                        return;
                    }
                    Ack::Reply(msg.clone())
                }
                SessionNotice::Closed { .. } => {
                    waiter.orphaned = 0;
                    Ack::Closed
                }
                _ => return,
            };
            if let Some(tx) = waiter.tx.take() {
                let _ = tx.send(ack);
            }
        }));

        Self {
            sink,
            ack_timeout: Some(DEFAULT_ACK_TIMEOUT),
            resolver,
            stopped: AtomicBool::new(false),
            _subscription: subscription,
        }
    }

    /// Sets the per-frame reply timeout. `None` waits forever.
    #[must_use]
    pub fn with_ack_timeout(mut self, ack_timeout: Option<Duration>) -> Self {
        self.ack_timeout = ack_timeout;
        self
    }

    /// Returns the per-frame reply timeout.
    #[inline]
    #[must_use]
    pub fn ack_timeout(&self) -> Option<Duration> {
        self.ack_timeout
    }

    /// Ends the running batch once the current frame is acknowledged.
    ///
    /// Called between batches, the next batch stops before its first frame.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    /// Submits every frame in order, waiting for each reply.
    ///
    /// `progress` runs after each acknowledged frame.
    ///
    /// # Errors
    ///
    /// - [`Error::SendFailed`] if the session refused a frame
    /// - [`Error::ConnectionClosed`] if the connection closed while waiting
    /// - [`Error::AckTimeout`] if a reply did not arrive in time
    pub async fn submit_all<I, P>(&self, frames: I, mut progress: P) -> Result<BatchReport>
    where
        I: IntoIterator<Item = String>,
        P: FnMut(&BatchProgress),
    {
        let result = self.run_batch(frames, &mut progress).await;
        self.stopped.store(false, Ordering::Release);
        result
    }

    async fn run_batch<I, P>(&self, frames: I, progress: &mut P) -> Result<BatchReport>
    where
        I: IntoIterator<Item = String>,
        P: FnMut(&BatchProgress),
    {
        let frames: Vec<String> = frames.into_iter().collect();
        let started = Instant::now();
        let mut samples = Vec::with_capacity(frames.len());
        let mut report = BatchReport {
            total: frames.len(),
            ..BatchReport::default()
        };

        info!(total = report.total, "Batch submission started");

        for (index, frame) in frames.iter().enumerate() {
            if self.stopped.load(Ordering::Acquire) {
                info!(index, "Batch stopped");
                report.stopped = true;
                break;
            }

            let (reply, latency) = self.submit_one(index, frame).await?;
            report.frames_sent += 1;
            report.responses += 1;
            if reply.is_error() {
                report.server_errors += 1;
            }
            samples.push(latency);

            debug!(index, latency_ms = latency.as_millis() as u64, "Frame acknowledged");
            progress(&BatchProgress {
                index,
                total: report.total,
                latency,
                reply,
            });
        }

        report.elapsed = started.elapsed();
        report.latency = LatencyStats::from_samples(&samples);

        info!(
            sent = report.frames_sent,
            responses = report.responses,
            server_errors = report.server_errors,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Batch submission finished"
        );

        Ok(report)
    }

    async fn submit_one(&self, index: usize, frame: &str) -> Result<(Inbound, Duration)> {
        let (tx, rx) = oneshot::channel();
        self.resolver.lock().tx = Some(tx);

        let sent_at = Instant::now();
        if !self.sink.send(&Outbound::frame(frame)) {
            self.resolver.lock().tx.take();
            warn!(index, "Frame send failed");
            return Err(Error::send_failed("frame"));
        }

        let ack = match self.ack_timeout {
            Some(limit) => match timeout(limit, rx).await {
                Ok(ack) => ack?,
                Err(_) => {
                    let mut waiter = self.resolver.lock();
                    if waiter.tx.take().is_some() {
                        waiter.orphaned += 1;
                    }
                    drop(waiter);
                    warn!(index, timeout_ms = limit.as_millis() as u64, "Frame reply timed out");
                    return Err(Error::ack_timeout(index, limit.as_millis() as u64));
                }
            },
            None => rx.await?,
        };

        match ack {
            Ack::Reply(msg) => Ok((msg, sent_at.elapsed())),
            Ack::Closed => {
                warn!(index, "Connection closed while awaiting reply");
                Err(Error::ConnectionClosed)
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::flow::mock::MockSink;
    use crate::protocol::InstructionPayload;

    fn success() -> SessionNotice {
        SessionNotice::Message(Inbound::Success {
            data: InstructionPayload::Cue("turn_left".into()),
        })
    }

    fn frames(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("frame{i}")).collect()
    }

    #[tokio::test]
    async fn test_sends_in_order_and_reports() {
        let sink = MockSink::with_reply(success());
        let submitter = SequentialSubmitter::new(Arc::clone(&sink));

        let mut seen = Vec::new();
        let report = submitter
            .submit_all(frames(3), |p| seen.push((p.index, p.total)))
            .await
            .expect("batch");

        assert_eq!(seen, vec![(0, 3), (1, 3), (2, 3)]);
        assert_eq!(report.frames_sent, 3);
        assert_eq!(report.responses, 3);
        assert!(report.is_complete());
        assert!(report.latency.is_some());

        let payloads: Vec<_> = sink.sent().iter().map(|m| m.data().payload().to_string()).collect();
        assert_eq!(payloads, frames(3));
    }

    #[tokio::test]
    async fn test_server_errors_counted() {
        let sink = MockSink::with_reply(SessionNotice::Message(Inbound::Error {
            message: "Frame processing failed".into(),
        }));
        let submitter = SequentialSubmitter::new(Arc::clone(&sink));

        let report = submitter.submit_all(frames(2), |_| {}).await.expect("batch");
        assert_eq!(report.server_errors, 2);
    }

    #[tokio::test]
    async fn test_send_failure_aborts() {
        let sink = MockSink::new();
        sink.open.store(false, Ordering::SeqCst);
        let submitter = SequentialSubmitter::new(Arc::clone(&sink));

        let err = submitter.submit_all(frames(2), |_| {}).await.unwrap_err();
        assert!(matches!(err, Error::SendFailed { .. }));
    }

    #[tokio::test]
    async fn test_close_while_waiting_aborts() {
        let sink = MockSink::with_reply(SessionNotice::Closed {
            code: 1006,
            reason: String::new(),
        });
        let submitter = SequentialSubmitter::new(Arc::clone(&sink));

        let err = submitter.submit_all(frames(2), |_| {}).await.unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
        assert_eq!(sink.sent().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ack_timeout() {
        let sink = MockSink::new();
        let submitter = SequentialSubmitter::new(Arc::clone(&sink))
            .with_ack_timeout(Some(Duration::from_secs(2)));

        let err = submitter.submit_all(frames(2), |_| {}).await.unwrap_err();
        assert!(err.is_timeout());
        assert!(matches!(err, Error::AckTimeout { index: 0, timeout_ms: 2000 }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_after_timeout_does_not_ack_next_batch() {
        let sink = MockSink::new();
        let submitter = SequentialSubmitter::new(Arc::clone(&sink))
            .with_ack_timeout(Some(Duration::from_secs(1)));

        let err = submitter.submit_all(vec![String::from("f0")], |_| {}).await.unwrap_err();
        assert!(err.is_timeout());

        sink.notify(SessionNotice::Message(Inbound::Success {
            data: InstructionPayload::Cue("stale_for_f0".into()),
        }));
        *sink.auto_reply.lock() = Some(success());

        let mut replies = Vec::new();
        let report = submitter
            .submit_all(vec![String::from("g0")], |p| replies.push(p.reply.clone()))
            .await
            .expect("batch");

        assert!(report.is_complete());
        assert_eq!(
            replies,
            vec![Inbound::Success {
                data: InstructionPayload::Cue("turn_left".into()),
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_forgets_owed_replies() {
        let sink = MockSink::new();
        let submitter = SequentialSubmitter::new(Arc::clone(&sink))
            .with_ack_timeout(Some(Duration::from_secs(1)));

        let err = submitter.submit_all(frames(1), |_| {}).await.unwrap_err();
        assert!(err.is_timeout());

        sink.notify(SessionNotice::Closed {
            code: 1006,
            reason: String::new(),
        });
        *sink.auto_reply.lock() = Some(success());

        let report = submitter.submit_all(frames(2), |_| {}).await.expect("batch");
        assert_eq!(report.responses, 2);
    }

    #[tokio::test]
    async fn test_stop_before_batch_is_kept() {
        let sink = MockSink::with_reply(success());
        let submitter = SequentialSubmitter::new(Arc::clone(&sink));

        submitter.stop();
        let report = submitter.submit_all(frames(3), |_| {}).await.expect("batch");
        assert!(report.stopped);
        assert_eq!(report.frames_sent, 0);

        let report = submitter.submit_all(frames(3), |_| {}).await.expect("batch");
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn test_stop_after_current_frame() {
        let sink = MockSink::with_reply(success());
        let submitter = SequentialSubmitter::new(Arc::clone(&sink));

        let report = submitter
            .submit_all(frames(5), |p| {
                if p.index == 1 {
                    submitter.stop();
                }
            })
            .await
            .expect("batch");

        assert!(report.stopped);
        assert_eq!(report.frames_sent, 2);
        assert!(!report.is_complete());
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_reply_resolves_wait() {
        let sink = MockSink::new();
        let submitter = SequentialSubmitter::new(Arc::clone(&sink)).with_ack_timeout(None);

        let replier = Arc::clone(&sink);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            replier.notify(success());
        });

        let report = submitter.submit_all(frames(1), |_| {}).await.expect("batch");
        let latency = report.latency.expect("latency");
        assert_eq!(latency.min, Duration::from_millis(250));
    }

    #[test]
    fn test_latency_stats() {
        let stats = LatencyStats::from_samples(&[
            Duration::from_millis(100),
            Duration::from_millis(300),
            Duration::from_millis(200),
        ])
        .expect("stats");
        assert_eq!(stats.min, Duration::from_millis(100));
        assert_eq!(stats.max, Duration::from_millis(300));
        assert_eq!(stats.average, Duration::from_millis(200));
        assert!(LatencyStats::from_samples(&[]).is_none());
    }
}
