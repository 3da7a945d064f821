//! Build pass stages
//!
//! # Stage Flow
//!
//! ```text
//! Idle
//!   ↓
//! Acquiring ←──────────────┐
//!   ↓                      │
//! Filtering ⇄ Dispatching  │
//!   ↓          ↓           │
//!   │      Recursing ──────┤ (nested document)
//!   │      Redirecting ────┘ (new root)
//!   ↓
//! Flushing
//!   ↓
//! Done
//! ```
//!
//! Recursion means the flow is re-entered for every included document, so the
//! tracker records what happened rather than policing every edge. It only
//! refuses to leave `Done` without an explicit reset.

use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildStage {
    /// No pass has started
    Idle,
    /// Fetching a document from the transport
    Acquiring,
    /// Evaluating a control's pins
    Filtering,
    /// Running or queueing a control's directives
    Dispatching,
    /// Descending into an included document
    Recursing,
    /// Restarting acquisition against a new root
    Redirecting,
    /// Persisting the task list
    Flushing,
    /// Pass finished (terminal)
    Done,
}

impl BuildStage {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done)
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Acquiring => "Acquiring config",
            Self::Filtering => "Evaluating pins",
            Self::Dispatching => "Dispatching directives",
            Self::Recursing => "Processing include",
            Self::Redirecting => "Redirecting to new root",
            Self::Flushing => "Writing task list",
            Self::Done => "Build complete",
        }
    }
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Current stage of a pass plus the ordered record of stage changes.
#[derive(Debug, Clone)]
pub struct StageTracker {
    current: BuildStage,
    history: Vec<BuildStage>,
}

impl Default for StageTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StageTracker {
    pub fn new() -> Self {
        Self {
            current: BuildStage::Idle,
            history: Vec::new(),
        }
    }

    pub fn current(&self) -> BuildStage {
        self.current
    }

    /// Stage changes since the last reset, oldest first. Repeats of the
    /// current stage are not recorded.
    pub fn history(&self) -> &[BuildStage] {
        &self.history
    }

    /// Move to `stage`. Returns false (and stays put) once the pass is done.
    pub fn enter(&mut self, stage: BuildStage) -> bool {
        if self.current.is_terminal() {
            return false;
        }
        if self.current != stage {
            debug!("Build stage: {} -> {}", self.current, stage);
            self.current = stage;
            self.history.push(stage);
        }
        true
    }

    /// Back to `Idle` for a new pass
    pub fn reset(&mut self) {
        self.current = BuildStage::Idle;
        self.history.clear();
    }
}
