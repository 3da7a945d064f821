//! Task list entries
//!
//! The task list is the build pass's only durable output: an ordered,
//! append-only sequence of deferred directives for the runner that executes
//! them later. Order is significant; later entries may depend on earlier
//! ones having run.

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;

/// Directive name of the segment timing markers
pub const TIMER_ACTION: &str = "SetTimer";

/// One queued directive.
///
/// Serialized as `{path: [...], data: {Name: args}}`. `path` is the config
/// path stack the directive was read under, so the runner can resolve
/// relative file references the same way the build did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEntry {
    #[serde(default)]
    pub path: Vec<String>,
    pub data: BTreeMap<String, Value>,
}

impl TaskEntry {
    pub fn new(path: Vec<String>, name: impl Into<String>, args: Value) -> Self {
        let mut data = BTreeMap::new();
        data.insert(name.into(), args);
        Self { path, data }
    }

    /// Segment timing marker (`SetTimer: [name]`)
    pub fn timer(path: Vec<String>, name: impl Into<String>) -> Self {
        Self::new(
            path,
            TIMER_ACTION,
            Value::Sequence(vec![Value::String(name.into())]),
        )
    }

    /// The directive name, if the entry is well formed (exactly one key).
    pub fn name(&self) -> Option<&str> {
        match self.data.len() {
            1 => self.data.keys().next().map(String::as_str),
            _ => None,
        }
    }

    pub fn args(&self) -> Option<&Value> {
        match self.data.len() {
            1 => self.data.values().next(),
            _ => None,
        }
    }

    /// The timer name if this entry is a timing marker
    pub fn timer_name(&self) -> Option<&str> {
        if self.name()? != TIMER_ACTION {
            return None;
        }
        self.args()?.as_sequence()?.first()?.as_str()
    }
}
