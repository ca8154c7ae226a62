//! Audio/haptic feedback for server cues.
//!
//! The server answers a frame with a `success` message whose `data` names a
//! cue category such as `turn_left`. A [`FeedbackPlayer`] checks the cue
//! against the known categories and the [`DuplicateSuppressor`], then hands
//! it to a [`FeedbackSink`] that does the actual playback.

// ============================================================================
// Imports
// ============================================================================

use crate::error::Result;

// ============================================================================
// Submodules
// ============================================================================

/// Cue playback.
pub mod player;

/// Duplicate suppression.
pub mod suppression;

// ============================================================================
// Re-exports
// ============================================================================

pub use player::{FeedbackPlayer, PlayDecision};
pub use suppression::{
    CONTINUE_FORWARD, CONTINUE_FORWARD_THRESHOLD, DEFAULT_CATEGORY_THRESHOLD,
    DEFAULT_GLOBAL_FLOOR, DuplicateSuppressor, SuppressionConfig,
};

// ============================================================================
// Constants
// ============================================================================

/// Cue categories the server emits.
pub const CUE_CATEGORIES: [&str; 7] = [
    "continue_forward",
    "immediately_turn_left",
    "immediately_turn_right",
    "possible_left_turn",
    "possible_right_turn",
    "turn_left",
    "turn_right",
];

// ============================================================================
// FeedbackSink
// ============================================================================

/// Plays feedback for a cue category.
pub trait FeedbackSink: Send + Sync {
    /// Prepares every category before the first `play`.
    ///
    /// # Errors
    ///
    /// Returns an error if a category cannot be prepared.
    fn load(&self, categories: &[&str]) -> Result<()> {
        let _ = categories;
        Ok(())
    }

    /// Plays one category. Failures are the sink's to log.
    fn play(&self, category: &str);

    /// Releases whatever `load` prepared.
    fn unload(&self) {}
}
