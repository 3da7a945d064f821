//! autobuild Library
//!
//! This library provides the config build engine of the imaging agent: pin
//! evaluation, the action contract and registry, and the recursive build pass
//! that produces the task list.

pub mod actions;
pub mod buildinfo;
pub mod check;
pub mod cli;
pub mod config_file;
pub mod document;
pub mod engine;
pub mod error;
pub mod facts;
pub mod pin;
pub mod task;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use actions::registry::{ActionRegistry, ActionSpec, REALTIME_ACTIONS};
pub use actions::{Action, Multi, Signal, Single, TupleAction};
pub use buildinfo::BuildInfo;
pub use config_file::BuildConfig;
pub use document::{Control, ControlEntry, Document, Include};
pub use engine::{BuildStage, ConfigBuilder, Flow, DEFAULT_BUILD_FILE};
pub use error::{
    ActionError, BuildError, FactLookupError, TransportError, UnknownDirectiveError,
    ValidationError,
};
pub use facts::{FactSource, FactTable, FirmwareMode};
pub use pin::{Criterion, PinSet};
pub use task::TaskEntry;
pub use transport::{DocumentTransport, FileTransport};
pub use types::{ChooserKind, RegistryKind, RegistryRoot, WriteMode};
