//! Type-safe identifiers for session entities.
//!
//! Newtype wrappers prevent mixing a connection id with a timer id or a
//! subscription id at compile time. All three are monotonically allocated
//! counters; none of them ever goes over the wire.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

// ============================================================================
// Macro
// ============================================================================

macro_rules! counter_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        impl $name {
            /// Wraps a raw value.
            #[inline]
            #[must_use]
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            /// Returns the raw value.
            #[inline]
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }

            /// Returns the identifier following this one.
            #[inline]
            #[must_use]
            pub const fn next(self) -> Self {
                Self(self.0 + 1)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "-{}"), self.0)
            }
        }
    };
}

// ============================================================================
// ConnectionId
// ============================================================================

counter_id!(
    /// Identifies one transport handle.
    ///
    /// Every `connect()` and every `disconnect()` advances the session's
    /// current id, so events produced by a superseded handle can be told
    /// apart from events of the live one.
    ConnectionId,
    "conn"
);

// ============================================================================
// TimerId
// ============================================================================

counter_id!(
    /// Identifies one scheduled reconnect.
    TimerId,
    "timer"
);

// ============================================================================
// SubscriptionId
// ============================================================================

counter_id!(
    /// Identifies one dispatcher subscription.
    SubscriptionId,
    "sub"
);

impl SubscriptionId {
    /// Allocates a process-unique subscription id.
    #[must_use]
    pub fn generate() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

// ============================================================================
// Tests
// ============================================================================
