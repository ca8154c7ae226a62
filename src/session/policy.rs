//! Reconnection policy.
//!
//! Pure bookkeeping: decides what a close means, counts attempts and
//! remembers whether the consumer asked to stay disconnected. Scheduling
//! is done by the session.
//!
//! Delay is fixed, not exponential. The attempt counter resets on every
//! successful open and on `retry()`.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

// ============================================================================
// Constants
// ============================================================================

/// Default delay before each reconnect attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(3000);

/// Default reconnect budget.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 3;

// ============================================================================
// CloseDecision
// ============================================================================

/// What to do after the transport closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseDecision {
    /// Schedule attempt `attempt` of `max` after `delay`.
    Reconnect {
        /// One-based attempt number.
        attempt: u32,
        /// Attempt budget.
        max: u32,
        /// Delay before connecting.
        delay: Duration,
    },

    /// Budget spent. Reported once until the next open or retry.
    Exhausted {
        /// Attempts made.
        attempts: u32,
    },

    /// Do nothing: auto-reconnect off, manual disconnect, or already
    /// reported exhaustion.
    Stay,
}

// ============================================================================
// ReconnectPolicy
// ============================================================================

/// Bounded, fixed-delay reconnect bookkeeping.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    delay: Duration,
    max_attempts: u32,
    attempts: u32,
    auto_reconnect: bool,
    manually_disconnected: bool,
    exhausted: bool,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RECONNECT_DELAY, DEFAULT_MAX_RECONNECT_ATTEMPTS, true)
    }
}

impl ReconnectPolicy {
    /// Creates a policy.
    #[must_use]
    pub const fn new(delay: Duration, max_attempts: u32, auto_reconnect: bool) -> Self {
        Self {
            delay,
            max_attempts,
            attempts: 0,
            auto_reconnect,
            manually_disconnected: false,
            exhausted: false,
        }
    }

    /// Records a successful open.
    pub fn on_open(&mut self) {
        self.attempts = 0;
        self.exhausted = false;
    }

    /// Decides how to react to a close.
    pub fn on_close(&mut self) -> CloseDecision {
        if !self.auto_reconnect || self.manually_disconnected || self.exhausted {
            return CloseDecision::Stay;
        }

        if self.attempts < self.max_attempts {
            self.attempts += 1;
            CloseDecision::Reconnect {
                attempt: self.attempts,
                max: self.max_attempts,
                delay: self.delay,
            }
        } else {
            self.exhausted = true;
            CloseDecision::Exhausted {
                attempts: self.attempts,
            }
        }
    }

    /// Explicit retry: forget the manual disconnect and the spent budget.
    pub fn retry(&mut self) {
        self.manually_disconnected = false;
        self.auto_reconnect = true;
        self.attempts = 0;
        self.exhausted = false;
    }

    /// Explicit disconnect: never reconnect until [`retry`](Self::retry).
    pub fn disconnect(&mut self) {
        self.manually_disconnected = true;
        self.auto_reconnect = false;
    }

    /// Returns the attempts made since the last open or retry.
    #[inline]
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Returns the attempt budget.
    #[inline]
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the reconnect delay.
    #[inline]
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Returns `true` if auto-reconnect is on.
    #[inline]
    #[must_use]
    pub const fn auto_reconnect(&self) -> bool {
        self.auto_reconnect
    }

    /// Returns `true` after [`disconnect`](Self::disconnect) until retry.
    #[inline]
    #[must_use]
    pub const fn is_manually_disconnected(&self) -> bool {
        self.manually_disconnected
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max: u32) -> ReconnectPolicy {
        ReconnectPolicy::new(Duration::from_millis(10), max, true)
    }

    #[test]
    fn test_defaults() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay(), Duration::from_millis(3000));
        assert_eq!(policy.max_attempts(), 3);
        assert!(policy.auto_reconnect());
    }

    #[test]
    fn test_bound_for_zero_one_three() {
        for max in [0, 1, 3] {
            let mut policy = policy(max);
            for attempt in 1..=max {
                assert!(matches!(
                    policy.on_close(),
                    CloseDecision::Reconnect { attempt: a, .. } if a == attempt
                ));
            }
            assert_eq!(policy.on_close(), CloseDecision::Exhausted { attempts: max });
            assert_eq!(policy.on_close(), CloseDecision::Stay);
        }
    }

    #[test]
    fn test_open_resets_counter() {
        let mut policy = policy(3);
        policy.on_close();
        policy.on_close();
        assert_eq!(policy.attempts(), 2);

        policy.on_open();
        assert_eq!(policy.attempts(), 0);
        for _ in 0..3 {
            assert!(matches!(policy.on_close(), CloseDecision::Reconnect { .. }));
        }
    }

    #[test]
    fn test_disconnect_suppresses_and_retry_restores() {
        let mut policy = policy(3);
        policy.disconnect();
        assert!(policy.is_manually_disconnected());
        assert_eq!(policy.on_close(), CloseDecision::Stay);

        policy.retry();
        assert!(!policy.is_manually_disconnected());
        assert!(matches!(
            policy.on_close(),
            CloseDecision::Reconnect { attempt: 1, .. }
        ));
    }

    #[test]
    fn test_retry_after_exhaustion() {
        let mut policy = policy(1);
        policy.on_close();
        assert!(matches!(policy.on_close(), CloseDecision::Exhausted { .. }));

        policy.retry();
        assert!(matches!(
            policy.on_close(),
            CloseDecision::Reconnect { attempt: 1, max: 1, .. }
        ));
    }

    #[test]
    fn test_auto_reconnect_off() {
        let mut policy = ReconnectPolicy::new(Duration::from_millis(10), 3, false);
        assert_eq!(policy.on_close(), CloseDecision::Stay);
    }
}
