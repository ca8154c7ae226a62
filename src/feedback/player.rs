//! Feedback player: turns `success` cues into sink playback.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::flow::FrameSink;
use crate::protocol::Inbound;
use crate::session::{SessionNotice, Subscription};

use super::suppression::{DuplicateSuppressor, SuppressionConfig};
use super::{CUE_CATEGORIES, FeedbackSink};

// ============================================================================
// PlayDecision
// ============================================================================

/// What the player did with one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayDecision {
    /// The cue was handed to the sink.
    Played(String),
    /// The cue played too recently.
    Suppressed(String),
    /// The cue names no known category.
    Unknown(String),
    /// Not a playable cue, or the player is not initialized.
    Ignored,
}

// ============================================================================
// FeedbackPlayer
// ============================================================================

/// Owns a feedback sink and its suppression state.
///
/// Lifecycle: [`init`](Self::init) loads the sink, [`teardown`](Self::teardown)
/// unloads it. Cues arriving outside that window are ignored.
pub struct FeedbackPlayer<K: FeedbackSink> {
    sink: K,
    categories: FxHashSet<String>,
    suppressor: Mutex<DuplicateSuppressor>,
    loaded: AtomicBool,
}

impl<K: FeedbackSink> fmt::Debug for FeedbackPlayer<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedbackPlayer")
            .field("categories", &self.categories.len())
            .field("loaded", &self.is_loaded())
            .finish_non_exhaustive()
    }
}

impl<K: FeedbackSink> FeedbackPlayer<K> {
    /// Creates a player for the standard cue categories.
    #[must_use]
    pub fn new(sink: K, config: SuppressionConfig) -> Self {
        Self::with_categories(sink, config, CUE_CATEGORIES)
    }

    /// Creates a player for a custom category set.
    #[must_use]
    pub fn with_categories<I, C>(sink: K, config: SuppressionConfig, categories: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        Self {
            sink,
            categories: categories.into_iter().map(Into::into).collect(),
            suppressor: Mutex::new(DuplicateSuppressor::new(config)),
            loaded: AtomicBool::new(false),
        }
    }

    /// Returns the sink.
    #[inline]
    #[must_use]
    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Returns `true` between `init` and `teardown`.
    #[inline]
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    /// Loads every category into the sink.
    ///
    /// # Errors
    ///
    /// Propagates the sink's load failure; the player stays unloaded.
    pub fn init(&self) -> Result<()> {
        if self.is_loaded() {
            return Ok(());
        }
        let mut categories: Vec<&str> = self.categories.iter().map(String::as_str).collect();
        categories.sort_unstable();

        self.sink.load(&categories).inspect_err(|e| {
            warn!(error = %e, "Failed to load feedback sounds");
        })?;

        self.loaded.store(true, Ordering::Release);
        info!(count = categories.len(), "Feedback sounds loaded");
        Ok(())
    }

    /// Unloads the sink and forgets suppression history.
    pub fn teardown(&self) {
        if self.loaded.swap(false, Ordering::AcqRel) {
            self.sink.unload();
            self.suppressor.lock().reset();
            info!("Feedback sounds unloaded");
        }
    }

    /// Plays the cue carried by `message`, if any.
    pub fn handle(&self, message: &Inbound) -> PlayDecision {
        self.handle_at(message, Instant::now())
    }

    /// Like [`handle`](Self::handle) with an explicit clock.
    pub fn handle_at(&self, message: &Inbound, now: Instant) -> PlayDecision {
        let Inbound::Success { data } = message else {
            return PlayDecision::Ignored;
        };
        let Some(cue) = data.cue() else {
            return PlayDecision::Ignored;
        };
        if !self.is_loaded() {
            debug!(cue, "Feedback not initialized; cue ignored");
            return PlayDecision::Ignored;
        }
        if !self.categories.contains(cue) {
            warn!(cue, "Unknown feedback category");
            return PlayDecision::Unknown(cue.to_string());
        }
        if !self.suppressor.lock().admit(cue, now) {
            return PlayDecision::Suppressed(cue.to_string());
        }

        debug!(cue, "Playing feedback");
        self.sink.play(cue);
        PlayDecision::Played(cue.to_string())
    }
}

impl<K: FeedbackSink + 'static> FeedbackPlayer<K> {
    /// Plays cues from every message the session delivers.
    #[must_use = "dropping the subscription stops playback"]
    pub fn attach<S: FrameSink + ?Sized>(self: &Arc<Self>, session: &S) -> Subscription {
        let player = Arc::clone(self);
        session.subscribe_notices(Arc::new(move |notice: &SessionNotice| {
            if let Some(message) = notice.as_message() {
                player.handle(message);
            }
        }))
    }
}

// ============================================================================
// Tests
// ============================================================================
