//! WindowTracker: remembers the last window the pipeline finished.
//!
//! The orchestrator polls every few seconds while a boundary minute lasts a
//! full minute, so the same window id is derived many times in a row. The
//! tracker is what stops it being processed twice. The mark lives in memory
//! only: a restart inside a window processes that window again.

use crate::error::NotReady;
use crate::types::WindowId;

#[derive(Debug, Clone, Default)]
pub struct WindowTracker {
    last: Option<WindowId>,
}

impl WindowTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// `false` iff `candidate` is the most recently marked window.
    pub fn should_process(&self, candidate: &WindowId) -> bool {
        self.last.as_ref() != Some(candidate)
    }

    /// Like [`should_process`](Self::should_process), as a `Result` for `?`.
    pub fn check(&self, candidate: &WindowId) -> Result<(), NotReady> {
        if self.should_process(candidate) {
            Ok(())
        } else {
            Err(NotReady::AlreadyProcessed(candidate.clone()))
        }
    }

    pub fn mark_processed(&mut self, candidate: WindowId) {
        self.last = Some(candidate);
    }

    pub fn last(&self) -> Option<&WindowId> {
        self.last.as_ref()
    }
}
