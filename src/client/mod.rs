//! Consumer-facing client.
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | [`ClientBuilder`] |
//! | `core` | [`StreamClient`] handle and its driver task |
//! | `gate` | [`EnableGate`] start/stop switch |

// ============================================================================
// Submodules
// ============================================================================

/// Client builder.
pub mod builder;

/// Client handle.
pub mod core;

/// Enable/disable gate.
pub mod gate;

// ============================================================================
// Re-exports
// ============================================================================

pub use self::core::StreamClient;
pub use builder::ClientBuilder;
pub use gate::{EnableGate, GateTransition};
