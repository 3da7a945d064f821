//! Build-info handle shared by the engine and every action
//!
//! `BuildInfo` is the one piece of mutable state that survives from directive
//! to directive within a pass: the machine's facts, the answers given to any
//! chooser, the stack of config paths currently being processed, and the
//! collaborators actions reach out to when they run.

use crate::actions::chooser::{Chooser, DefaultChooser};
use crate::actions::reg::{MemoryRegistry, RegistryStore};
use crate::error::FactLookupError;
use crate::facts::{FactSource, FactTable};
use std::collections::BTreeMap;
use std::fmt;
use std::time::SystemTime;

/// Pin attributes with this prefix resolve against chooser responses
pub const USER_PREFIX: &str = "USER_";

pub struct BuildInfo {
    facts: FactTable,
    chooser_responses: BTreeMap<String, String>,
    active_path: Vec<String>,
    timers: BTreeMap<String, SystemTime>,
    config_server: String,
    use_reg_64: bool,
    registry: Box<dyn RegistryStore>,
    chooser: Box<dyn Chooser>,
}

impl BuildInfo {
    /// Create a build-info handle over a fact table.
    ///
    /// Defaults to the in-memory registry store, the non-interactive
    /// chooser and the 64-bit registry view.
    pub fn new(facts: FactTable) -> Self {
        Self {
            facts,
            chooser_responses: BTreeMap::new(),
            active_path: Vec::new(),
            timers: BTreeMap::new(),
            config_server: String::new(),
            use_reg_64: true,
            registry: Box::new(MemoryRegistry::new()),
            chooser: Box::new(DefaultChooser),
        }
    }

    pub fn with_registry(mut self, registry: Box<dyn RegistryStore>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_chooser(mut self, chooser: Box<dyn Chooser>) -> Self {
        self.chooser = chooser;
        self
    }

    pub fn with_config_server(mut self, server: impl Into<String>) -> Self {
        self.config_server = server.into();
        self
    }

    pub fn with_reg_64(mut self, use_reg_64: bool) -> Self {
        self.use_reg_64 = use_reg_64;
        self
    }

    pub fn facts(&self) -> &FactTable {
        &self.facts
    }

    pub fn config_server(&self) -> &str {
        &self.config_server
    }

    pub fn set_config_server(&mut self, server: impl Into<String>) {
        self.config_server = server.into();
    }

    /// Default registry view for actions that do not specify one
    pub fn use_reg_64(&self) -> bool {
        self.use_reg_64
    }

    pub fn registry(&mut self) -> &mut dyn RegistryStore {
        self.registry.as_mut()
    }

    pub fn chooser(&self) -> &dyn Chooser {
        self.chooser.as_ref()
    }

    /// Record a chooser answer so pins can match it as `USER_<name>`
    pub fn store_chooser_response(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.chooser_responses
            .insert(name.into().to_lowercase(), value.into());
    }

    pub fn chooser_response(&self, name: &str) -> Option<&str> {
        self.chooser_responses
            .get(&name.to_lowercase())
            .map(String::as_str)
    }

    /// Enter a nested config path (an `include`)
    pub fn push_path(&mut self, segment: impl Into<String>) {
        self.active_path.push(segment.into());
    }

    pub fn pop_path(&mut self) -> Option<String> {
        self.active_path.pop()
    }

    /// Config path stack of the document currently being processed
    pub fn active_path(&self) -> &[String] {
        &self.active_path
    }

    pub fn record_timer(&mut self, name: impl Into<String>) {
        self.timers.insert(name.into(), SystemTime::now());
    }

    pub fn timer(&self, name: &str) -> Option<SystemTime> {
        self.timers.get(name).copied()
    }
}

impl FactSource for BuildInfo {
    fn lookup(&self, name: &str, candidate: &str) -> Result<bool, FactLookupError> {
        let user_key = name
            .get(..USER_PREFIX.len())
            .filter(|prefix| prefix.eq_ignore_ascii_case(USER_PREFIX))
            .map(|_| &name[USER_PREFIX.len()..]);

        match user_key {
            // An unanswered chooser option never matches; it is not an error.
            Some(key) => Ok(self
                .chooser_response(key)
                .is_some_and(|v| v.eq_ignore_ascii_case(candidate))),
            None => self.facts.lookup(name, candidate),
        }
    }
}

impl fmt::Debug for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildInfo")
            .field("facts", &self.facts)
            .field("chooser_responses", &self.chooser_responses)
            .field("active_path", &self.active_path)
            .field("config_server", &self.config_server)
            .field("use_reg_64", &self.use_reg_64)
            .finish_non_exhaustive()
    }
}
