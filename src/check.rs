//! Offline validation of a written task list.
//!
//! Every entry is rebuilt through the `ActionRegistry` and validated, never
//! run. Directives this binary has no implementation for are reported as
//! unknown rather than failed: the runner that executes the list may well
//! provide them.

use crate::actions::registry::ActionRegistry;
use crate::task::TaskEntry;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Valid,
    /// No built-in implementation for this directive
    Unknown,
    Invalid(String),
    /// Entry does not hold exactly one directive
    Malformed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskCheck {
    pub index: usize,
    pub name: Option<String>,
    pub outcome: CheckOutcome,
}

impl TaskCheck {
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, CheckOutcome::Invalid(_) | CheckOutcome::Malformed)
    }
}

impl fmt::Display for TaskCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name.as_deref().unwrap_or("<malformed>");
        match &self.outcome {
            CheckOutcome::Valid => write!(f, "#{} {}: ok", self.index, name),
            CheckOutcome::Unknown => write!(f, "#{} {}: no built-in implementation", self.index, name),
            CheckOutcome::Invalid(reason) => write!(f, "#{} {}: {}", self.index, name, reason),
            CheckOutcome::Malformed => write!(f, "#{}: entry must hold exactly one directive", self.index),
        }
    }
}

/// Validate each entry of `tasks`, in order.
pub fn check_tasks(registry: &ActionRegistry, tasks: &[TaskEntry]) -> Vec<TaskCheck> {
    tasks
        .iter()
        .enumerate()
        .map(|(index, task)| {
            let (Some(name), Some(args)) = (task.name(), task.args()) else {
                return TaskCheck {
                    index,
                    name: None,
                    outcome: CheckOutcome::Malformed,
                };
            };

            let outcome = if !registry.contains(name) {
                CheckOutcome::Unknown
            } else {
                match registry.validate(name, args) {
                    Ok(()) => CheckOutcome::Valid,
                    Err(e) => CheckOutcome::Invalid(e.to_string()),
                }
            };

            TaskCheck {
                index,
                name: Some(name.to_string()),
                outcome,
            }
        })
        .collect()
}
