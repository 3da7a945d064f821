//! Config build engine
//!
//! `ConfigBuilder::start` walks a tree of configuration documents and turns it
//! into the task list:
//!
//! 1. read the document at `(root, file)`
//! 2. queue `SetTimer: [start_<root>_<file>]`
//! 3. for each control whose pins match, in order:
//!    - `template` expands the named templates in place
//!    - `include` processes each nested document in place
//!    - realtime directives are built, validated and run now
//!    - anything else is queued verbatim with the active config path
//! 4. queue `SetTimer: [stop_<root>_<file>]`
//!
//! A realtime directive may answer with `Signal::Redirect`. Processing of the
//! current document (and every document above it) stops, each open segment
//! still gets its stop marker, and `start` begins again at the new root with
//! the same file name. Entries queued before the redirect are kept.
//!
//! Once no redirect remains the whole list is appended to the output path.

use super::state::{BuildStage, StageTracker};
use crate::actions::registry::{self, ActionRegistry};
use crate::actions::Signal;
use crate::buildinfo::BuildInfo;
use crate::document::{Control, ControlEntry, Include};
use crate::error::{BuildError, Result};
use crate::pin;
use crate::task::TaskEntry;
use crate::transport::{join_root, DocumentTransport};
use crate::types::WriteMode;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Document every root is expected to provide
pub const DEFAULT_BUILD_FILE: &str = "build.yaml";

/// Outcome of processing a document or control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Stop here and restart acquisition at this root
    Redirect(String),
}

impl From<Signal> for Flow {
    fn from(signal: Signal) -> Self {
        match signal {
            Signal::Continue => Self::Continue,
            Signal::Redirect(root) => Self::Redirect(root),
        }
    }
}

type Templates = BTreeMap<String, Control>;

/// Timer name bracketing one document
fn segment_marker(edge: &str, root: &str, file: &str) -> String {
    format!("{}_{}_{}", edge, root.trim_end_matches('/'), file)
}

pub struct ConfigBuilder<T: DocumentTransport> {
    build: BuildInfo,
    registry: ActionRegistry,
    transport: T,
    task_list: Vec<TaskEntry>,
    stages: StageTracker,
}

impl<T: DocumentTransport> ConfigBuilder<T> {
    /// Builder with the built-in directives registered
    pub fn new(build: BuildInfo, transport: T) -> Self {
        Self {
            build,
            registry: ActionRegistry::with_core_actions(),
            transport,
            task_list: Vec::new(),
            stages: StageTracker::new(),
        }
    }

    pub fn with_registry(mut self, registry: ActionRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Task list of the current (or last) pass
    pub fn task_list(&self) -> &[TaskEntry] {
        &self.task_list
    }

    pub fn build_info(&self) -> &BuildInfo {
        &self.build
    }

    pub fn build_info_mut(&mut self) -> &mut BuildInfo {
        &mut self.build
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn stage(&self) -> BuildStage {
        self.stages.current()
    }

    pub fn stage_history(&self) -> &[BuildStage] {
        self.stages.history()
    }

    /// Run a pass starting at `root`/`build.yaml` and append the result to `out`.
    pub fn start(&mut self, out: &Path, root: &str) -> Result<()> {
        self.start_with_file(out, root, DEFAULT_BUILD_FILE)
    }

    /// Run a pass starting at `root`/`file` and append the result to `out`.
    ///
    /// Nothing is written if the pass fails.
    pub fn start_with_file(&mut self, out: &Path, root: &str, file: &str) -> Result<()> {
        self.task_list.clear();
        self.stages.reset();

        let mut root = root.to_string();
        loop {
            info!("Building config from '{}' ({})", root, file);
            match self.process_document(&root, file)? {
                Flow::Continue => break,
                Flow::Redirect(next) => {
                    self.stages.enter(BuildStage::Redirecting);
                    info!("Redirected from '{}' to '{}'", root, next);
                    root = next;
                }
            }
        }

        self.stages.enter(BuildStage::Flushing);
        info!(
            "Writing {} task(s) to {}",
            self.task_list.len(),
            out.display()
        );
        self.transport.write(out, &self.task_list, WriteMode::Append)?;
        self.stages.enter(BuildStage::Done);
        Ok(())
    }

    /// Process one document as a timed segment.
    fn process_document(&mut self, root: &str, file: &str) -> Result<Flow> {
        self.stages.enter(BuildStage::Acquiring);
        let document = self.transport.read(root, file)?;

        self.push_task(TaskEntry::timer(
            self.build.active_path().to_vec(),
            segment_marker("start", root, file),
        ));
        let flow = self.process_controls(&document.controls, &document.templates, root)?;
        self.push_task(TaskEntry::timer(
            self.build.active_path().to_vec(),
            segment_marker("stop", root, file),
        ));

        Ok(flow)
    }

    fn process_controls(&mut self, controls: &[Control], templates: &Templates, root: &str) -> Result<Flow> {
        for control in controls {
            if let Flow::Redirect(next) = self.process_control(control, templates, root)? {
                return Ok(Flow::Redirect(next));
            }
        }
        Ok(Flow::Continue)
    }

    /// Pin-filter one control and dispatch its entries.
    fn process_control(&mut self, control: &Control, templates: &Templates, root: &str) -> Result<Flow> {
        self.stages.enter(BuildStage::Filtering);
        if let Some(pins) = &control.pin {
            if !pin::matches(pins, &self.build)? {
                debug!("Skipping control, pins did not match: {:?}", pins);
                return Ok(Flow::Continue);
            }
        }

        self.stages.enter(BuildStage::Dispatching);
        for entry in &control.entries {
            let flow = match entry {
                ControlEntry::Template(names) => self.process_templates(names, templates, root)?,
                ControlEntry::Include(includes) => self.process_includes(includes, root)?,
                ControlEntry::Directive { name, data } if registry::is_realtime(name) => {
                    self.run_realtime(name, data)?
                }
                ControlEntry::Directive { name, data } => {
                    debug!("Queueing {}", name);
                    self.push_task(TaskEntry::new(
                        self.build.active_path().to_vec(),
                        name.clone(),
                        data.clone(),
                    ));
                    Flow::Continue
                }
            };
            if let Flow::Redirect(next) = flow {
                return Ok(Flow::Redirect(next));
            }
        }
        Ok(Flow::Continue)
    }

    fn process_templates(&mut self, names: &[String], templates: &Templates, root: &str) -> Result<Flow> {
        for name in names {
            let template = templates
                .get(name)
                .ok_or_else(|| BuildError::config(format!("Unknown template '{}'", name)))?;
            debug!("Expanding template {}", name);
            if let Flow::Redirect(next) = self.process_control(template, templates, root)? {
                return Ok(Flow::Redirect(next));
            }
        }
        Ok(Flow::Continue)
    }

    fn process_includes(&mut self, includes: &[Include], root: &str) -> Result<Flow> {
        for include in includes {
            self.stages.enter(BuildStage::Recursing);
            let nested_root = join_root(root, &include.path);
            debug!("Including {} from '{}'", include.file, nested_root);

            self.build.push_path(include.path.trim_end_matches('/'));
            let flow = self.process_document(&nested_root, &include.file);
            self.build.pop_path();

            if let Flow::Redirect(next) = flow? {
                return Ok(Flow::Redirect(next));
            }
        }
        Ok(Flow::Continue)
    }

    /// Build, validate and run a realtime directive.
    fn run_realtime(&mut self, name: &str, data: &Value) -> Result<Flow> {
        let action = self.registry.create(name, data)?;
        action.validate()?;
        info!("Running realtime directive {}", name);
        Ok(action.run(&mut self.build)?.into())
    }

    fn push_task(&mut self, entry: TaskEntry) {
        self.task_list.push(entry);
    }
}
