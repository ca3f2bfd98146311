//! Per-artifact generation state and stale-response detection.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

/// Where an artifact is in its lifecycle.
///
/// Reported by [`crate::generation::Gateway::state`]. `InFlight` wins over
/// `Present`: an artifact being regenerated reports `InFlight` even while the
/// previous value is still stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactState {
    /// Nothing stored and nothing requested
    Absent,
    /// A generation request is outstanding
    InFlight,
    /// A value is stored
    Present,
}

impl fmt::Display for ArtifactState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Absent => "absent",
            Self::InFlight => "in flight",
            Self::Present => "present",
        })
    }
}

/// Liveness token for whoever asked for an artifact.
///
/// A caller creates one guard per view (a CLI command, a UI panel) and passes
/// it with every request. Closing the guard does not cancel anything: the
/// outstanding call runs to completion, but its result is dropped instead of
/// being stored or returned.
///
/// Clones share state, so the guard can be closed from another task.
#[derive(Debug, Clone)]
pub struct ViewGuard {
    id: Uuid,
    closed: Arc<AtomicBool>,
}

impl ViewGuard {
    /// A new, open guard.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Mark the view as gone.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Whether [`close`](Self::close) was called on this guard or a clone.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Identifier for log correlation.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }
}

impl Default for ViewGuard {
    fn default() -> Self {
        Self::new()
    }
}
