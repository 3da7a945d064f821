//! Engine modules: the build pass that turns config documents into a task list.
//!
//! `builder` drives acquisition, pin filtering, dispatch, recursion and
//! redirects. `state` tracks which stage a pass is in.

pub mod builder;
pub mod state;

pub use builder::{ConfigBuilder, Flow, DEFAULT_BUILD_FILE};
pub use state::{BuildStage, StageTracker};
