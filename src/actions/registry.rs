//! Directive name to Action constructor lookup
//!
//! The registry is filled once at startup (`with_core_actions`) and only read
//! afterwards. Tuple actions register both their plain and `Multi` names.
//!
//! Which directives run during the build (realtime) is a fixed engine-side
//! list, independent of what is registered: a deferred directive never needs
//! a registered constructor to be queued.

use super::chooser::{self, ShowChooser};
use super::reg::{RegAdd, RegDel};
use super::server::{self, ServerChangeEvent};
use super::timer::SetTimer;
use super::{Action, Multi, Single, TupleAction, MULTI_PREFIX};
use crate::error::{BuildError, UnknownDirectiveError};
use serde_yaml::Value;
use std::collections::HashMap;

/// Directives executed while configs are processed
pub const REALTIME_ACTIONS: &[&str] = &[server::NAME, chooser::NAME];

/// Whether the engine must run `name` now rather than queue it
pub fn is_realtime(name: &str) -> bool {
    REALTIME_ACTIONS.contains(&name)
}

/// Builds an action from a directive's argument data
pub type ActionFactory = fn(&Value) -> Box<dyn Action>;

/// A registered directive
#[derive(Debug, Clone)]
pub struct ActionSpec {
    pub name: String,
    pub description: String,
    factory: ActionFactory,
}

impl ActionSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>, factory: ActionFactory) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            factory,
        }
    }

    pub fn build(&self, data: &Value) -> Box<dyn Action> {
        (self.factory)(data)
    }
}

fn single<K: TupleAction + 'static>(data: &Value) -> Box<dyn Action> {
    Box::new(Single::<K>::new(data))
}

fn multi<K: TupleAction + 'static>(data: &Value) -> Box<dyn Action> {
    Box::new(Multi::<K>::new(data))
}

fn server_change(data: &Value) -> Box<dyn Action> {
    Box::new(ServerChangeEvent::new(data))
}

fn show_chooser(data: &Value) -> Box<dyn Action> {
    Box::new(ShowChooser::new(data))
}

/// Registry of known directives
#[derive(Debug, Default)]
pub struct ActionRegistry {
    actions: HashMap<String, ActionSpec>,
}

impl ActionRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a directive, replacing any earlier one with the same name
    pub fn register(&mut self, spec: ActionSpec) {
        self.actions.insert(spec.name.clone(), spec);
    }

    /// Register `K` and `MultiK`
    pub fn register_tuple<K: TupleAction + 'static>(&mut self, description: &str) {
        self.register(ActionSpec::new(K::NAME, description, single::<K>));
        self.register(ActionSpec::new(
            format!("{}{}", MULTI_PREFIX, K::NAME),
            format!("{} (list form)", description),
            multi::<K>,
        ));
    }

    pub fn get(&self, name: &str) -> Option<&ActionSpec> {
        self.actions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// Registered directive names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.actions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Construct the action for one directive occurrence
    pub fn create(&self, name: &str, data: &Value) -> Result<Box<dyn Action>, UnknownDirectiveError> {
        self.get(name)
            .map(|spec| spec.build(data))
            .ok_or_else(|| UnknownDirectiveError {
                name: name.to_string(),
            })
    }

    /// Construct and validate without running
    pub fn validate(&self, name: &str, data: &Value) -> Result<(), BuildError> {
        self.create(name, data)?.validate()?;
        Ok(())
    }

    /// Create a registry with the built-in directives
    pub fn with_core_actions() -> Self {
        let mut registry = Self::new();

        registry.register_tuple::<RegAdd>("Set a registry value");
        registry.register_tuple::<RegDel>("Remove a registry value");
        registry.register_tuple::<SetTimer>("Record a named timestamp");

        registry.register(ActionSpec::new(
            server::NAME,
            "Restart the build against another config server",
            server_change,
        ));
        registry.register(ActionSpec::new(
            chooser::NAME,
            "Ask for build options and record the answers",
            show_chooser,
        ));

        registry
    }
}
