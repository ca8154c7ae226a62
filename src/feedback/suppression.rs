//! Duplicate suppression for feedback cues.
//!
//! A cue plays only if both hold:
//!
//! - at least `global_floor` passed since any cue played
//! - at least the category's threshold passed since that category played
//!
//! Suppressed cues do not update either timestamp.

// ============================================================================
// Imports
// ============================================================================

use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;
use tracing::trace;

// ============================================================================
// Constants
// ============================================================================

/// Minimum gap between any two cues.
pub const DEFAULT_GLOBAL_FLOOR: Duration = Duration::from_millis(500);

/// Minimum gap between two cues of the same category.
pub const DEFAULT_CATEGORY_THRESHOLD: Duration = Duration::from_millis(1000);

/// Minimum gap between two `continue_forward` cues.
pub const CONTINUE_FORWARD_THRESHOLD: Duration = Duration::from_millis(2000);

/// The steady-state "keep going" cue.
pub const CONTINUE_FORWARD: &str = "continue_forward";

// ============================================================================
// SuppressionConfig
// ============================================================================

/// Suppression thresholds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuppressionConfig {
    /// Minimum gap between any two cues.
    pub global_floor: Duration,
    /// Per-category gap for categories without an override.
    pub default_threshold: Duration,
    /// Per-category overrides.
    pub overrides: FxHashMap<String, Duration>,
}

impl Default for SuppressionConfig {
    fn default() -> Self {
        let mut overrides = FxHashMap::default();
        overrides.insert(CONTINUE_FORWARD.to_string(), CONTINUE_FORWARD_THRESHOLD);
        Self {
            global_floor: DEFAULT_GLOBAL_FLOOR,
            default_threshold: DEFAULT_CATEGORY_THRESHOLD,
            overrides,
        }
    }
}

impl SuppressionConfig {
    /// Sets the global floor.
    #[inline]
    #[must_use]
    pub fn with_global_floor(mut self, floor: Duration) -> Self {
        self.global_floor = floor;
        self
    }

    /// Sets the default per-category threshold.
    #[inline]
    #[must_use]
    pub fn with_default_threshold(mut self, threshold: Duration) -> Self {
        self.default_threshold = threshold;
        self
    }

    /// Overrides the threshold for one category.
    #[must_use]
    pub fn with_threshold(mut self, category: impl Into<String>, threshold: Duration) -> Self {
        self.overrides.insert(category.into(), threshold);
        self
    }

    /// Returns the threshold that applies to `category`.
    #[must_use]
    pub fn threshold(&self, category: &str) -> Duration {
        self.overrides
            .get(category)
            .copied()
            .unwrap_or(self.default_threshold)
    }
}

// ============================================================================
// DuplicateSuppressor
// ============================================================================

/// Tracks when each category last played.
#[derive(Debug, Clone, Default)]
pub struct DuplicateSuppressor {
    config: SuppressionConfig,
    last_by_category: FxHashMap<String, Instant>,
    last_any: Option<Instant>,
}

impl DuplicateSuppressor {
    /// Creates a suppressor.
    #[must_use]
    pub fn new(config: SuppressionConfig) -> Self {
        Self {
            config,
            last_by_category: FxHashMap::default(),
            last_any: None,
        }
    }

    /// Returns the thresholds.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SuppressionConfig {
        &self.config
    }

    /// Decides whether `category` may play at `now`, recording it if so.
    pub fn admit(&mut self, category: &str, now: Instant) -> bool {
        if let Some(last) = self.last_any
            && now.saturating_duration_since(last) < self.config.global_floor
        {
            trace!(category, "Cue suppressed by global floor");
            return false;
        }

        if let Some(last) = self.last_by_category.get(category)
            && now.saturating_duration_since(*last) < self.config.threshold(category)
        {
            trace!(category, "Cue suppressed as duplicate");
            return false;
        }

        self.last_any = Some(now);
        self.last_by_category.insert(category.to_string(), now);
        true
    }

    /// Forgets every timestamp.
    pub fn reset(&mut self) {
        self.last_by_category.clear();
        self.last_any = None;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_default_thresholds() {
        let config = SuppressionConfig::default();
        assert_eq!(config.threshold("continue_forward"), ms(2000));
        assert_eq!(config.threshold("turn_left"), ms(1000));
        assert_eq!(config.global_floor, ms(500));
    }

    #[test]
    fn test_global_floor() {
        let mut suppressor = DuplicateSuppressor::default();
        let t0 = Instant::now();

        assert!(suppressor.admit("turn_left", t0));
        assert!(!suppressor.admit("turn_right", t0 + ms(499)));
        assert!(suppressor.admit("turn_right", t0 + ms(500)));
    }

    #[test]
    fn test_category_threshold() {
        let mut suppressor = DuplicateSuppressor::default();
        let t0 = Instant::now();

        assert!(suppressor.admit("turn_left", t0));
        assert!(!suppressor.admit("turn_left", t0 + ms(999)));
        assert!(suppressor.admit("turn_left", t0 + ms(1000)));

        assert!(suppressor.admit("continue_forward", t0 + ms(1500)));
        assert!(!suppressor.admit("continue_forward", t0 + ms(3000)));
        assert!(suppressor.admit("continue_forward", t0 + ms(3500)));
    }

    #[test]
    fn test_suppressed_cue_does_not_extend_window() {
        let mut suppressor = DuplicateSuppressor::default();
        let t0 = Instant::now();

        assert!(suppressor.admit("turn_left", t0));
        assert!(!suppressor.admit("turn_left", t0 + ms(900)));
        assert!(suppressor.admit("turn_left", t0 + ms(1000)));
    }

    #[test]
    fn test_custom_config_and_reset() {
        let config = SuppressionConfig::default()
            .with_global_floor(Duration::ZERO)
            .with_threshold("turn_left", ms(100));
        let mut suppressor = DuplicateSuppressor::new(config);
        let t0 = Instant::now();

        assert!(suppressor.admit("turn_left", t0));
        assert!(suppressor.admit("turn_left", t0 + ms(100)));

        suppressor.reset();
        assert!(suppressor.admit("turn_left", t0 + ms(101)));
    }
}
