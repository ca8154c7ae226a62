//! Enable/disable gate.
//!
//! Records whether the consumer wants the session running and reports only
//! real transitions, so rapid repeated toggles collapse into at most one
//! connect or disconnect each.

use std::sync::atomic::{AtomicBool, Ordering};

// ============================================================================
// GateTransition
// ============================================================================

/// Effect of one [`EnableGate::set`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateTransition {
    /// Disabled to enabled: start the session.
    Enabled,
    /// Enabled to disabled: stop the session.
    Disabled,
    /// Already in the requested state.
    Unchanged,
}

// ============================================================================
// EnableGate
// ============================================================================

/// Whether the session should be running.
#[derive(Debug)]
pub struct EnableGate {
    enabled: AtomicBool,
}

impl EnableGate {
    /// Creates a gate in the given state.
    #[inline]
    #[must_use]
    pub const fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
        }
    }

    /// Returns `true` if enabled.
    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Sets the state and reports the transition.
    pub fn set(&self, enabled: bool) -> GateTransition {
        match (self.enabled.swap(enabled, Ordering::AcqRel), enabled) {
            (false, true) => GateTransition::Enabled,
            (true, false) => GateTransition::Disabled,
            _ => GateTransition::Unchanged,
        }
    }
}

impl Default for EnableGate {
    fn default() -> Self {
        Self::new(true)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        let gate = EnableGate::new(false);
        assert_eq!(gate.set(false), GateTransition::Unchanged);
        assert_eq!(gate.set(true), GateTransition::Enabled);
        assert_eq!(gate.set(true), GateTransition::Unchanged);
        assert!(gate.is_enabled());
        assert_eq!(gate.set(false), GateTransition::Disabled);
        assert!(!gate.is_enabled());
    }
}
