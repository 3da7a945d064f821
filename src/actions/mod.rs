//! Action contracts
//!
//! Every directive, realtime or deferred, is backed by an `Action`: a value
//! built from the directive's argument data that can be validated (pure,
//! structural checks) and run (the effect, scoped by `BuildInfo`).
//!
//! # Single and Multi
//!
//! Most directives take one positional tuple (`RegAdd: [root, path, ...]`).
//! Each such kind implements `TupleAction` once, and gets two directive
//! names for free:
//!
//! | Directive       | Wrapper        | Argument data              |
//! |-----------------|----------------|----------------------------|
//! | `RegAdd`        | `Single<RegAdd>` | `[a, b, c, d, e]`          |
//! | `MultiRegAdd`   | `Multi<RegAdd>`  | `[[a, b, c, d, e], [...]]` |
//!
//! The argument shape is resolved once into `DirectiveArgs` when the action is
//! constructed, never re-inspected per call.

pub mod chooser;
pub mod reg;
pub mod registry;
pub mod server;
pub mod timer;

use crate::buildinfo::BuildInfo;
use crate::error::{ActionError, ValidationError};
use serde_yaml::Value;
use std::marker::PhantomData;

/// Prefix that turns a tuple action name into its list form
pub const MULTI_PREFIX: &str = "Multi";

/// What the engine should do after an action ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// Carry on with the next directive
    Continue,
    /// Abandon the current document and restart acquisition at this root
    Redirect(String),
}

/// The two-phase contract every directive implements.
pub trait Action {
    /// Directive name this action was built for
    fn name(&self) -> &str;

    /// Check the argument data's structure. Must not have side effects.
    fn validate(&self) -> Result<(), ValidationError>;

    /// Perform the effect.
    fn run(&self, build: &mut BuildInfo) -> Result<Signal, ActionError>;
}

/// Declared argument shape of a directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// One flat argument list
    Single,
    /// A list of argument lists
    Multi,
}

/// Argument data resolved against a declared arity.
#[derive(Debug, Clone, PartialEq)]
pub enum DirectiveArgs {
    Single(Vec<Value>),
    Multi(Vec<Vec<Value>>),
    /// Data that does not have the declared shape; kept for error messages
    Malformed(Value),
}

impl DirectiveArgs {
    pub fn resolve(data: &Value, arity: Arity) -> Self {
        match (arity, data) {
            (Arity::Single, Value::Sequence(items)) => Self::Single(items.clone()),
            (Arity::Multi, Value::Sequence(items)) => items
                .iter()
                .map(|item| item.as_sequence().cloned())
                .collect::<Option<Vec<_>>>()
                .map(Self::Multi)
                .unwrap_or_else(|| Self::Malformed(data.clone())),
            _ => Self::Malformed(data.clone()),
        }
    }
}

/// A directive kind that consumes one positional argument tuple.
pub trait TupleAction {
    const NAME: &'static str;

    fn validate_tuple(args: &[Value]) -> Result<(), ValidationError>;

    fn run_tuple(args: &[Value], build: &mut BuildInfo) -> Result<(), ActionError>;
}

/// `K` applied to a single argument tuple.
#[derive(Debug)]
pub struct Single<K> {
    args: DirectiveArgs,
    kind: PhantomData<fn() -> K>,
}

impl<K: TupleAction> Single<K> {
    pub fn new(data: &Value) -> Self {
        Self {
            args: DirectiveArgs::resolve(data, Arity::Single),
            kind: PhantomData,
        }
    }
}

impl<K: TupleAction> Action for Single<K> {
    fn name(&self) -> &str {
        K::NAME
    }

    fn validate(&self) -> Result<(), ValidationError> {
        let DirectiveArgs::Single(args) = &self.args else {
            return Err(ValidationError::new(K::NAME, "arguments must be a list"));
        };
        if args.iter().any(Value::is_sequence) {
            return Err(ValidationError::new(
                K::NAME,
                format!("nested argument lists are only accepted by {}{}", MULTI_PREFIX, K::NAME),
            ));
        }
        K::validate_tuple(args)
    }

    fn run(&self, build: &mut BuildInfo) -> Result<Signal, ActionError> {
        let DirectiveArgs::Single(args) = &self.args else {
            return Err(ActionError::new(K::NAME, "arguments must be a list"));
        };
        K::run_tuple(args, build)?;
        Ok(Signal::Continue)
    }
}

/// `K` applied to each of a list of argument tuples, in order, stopping at
/// the first failure.
#[derive(Debug)]
pub struct Multi<K> {
    name: String,
    args: DirectiveArgs,
    kind: PhantomData<fn() -> K>,
}

impl<K: TupleAction> Multi<K> {
    pub fn new(data: &Value) -> Self {
        Self {
            name: format!("{}{}", MULTI_PREFIX, K::NAME),
            args: DirectiveArgs::resolve(data, Arity::Multi),
            kind: PhantomData,
        }
    }

    fn tuples(&self) -> Option<&[Vec<Value>]> {
        match &self.args {
            DirectiveArgs::Multi(tuples) => Some(tuples),
            _ => None,
        }
    }
}

impl<K: TupleAction> Action for Multi<K> {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<(), ValidationError> {
        let tuples = self.tuples().ok_or_else(|| {
            ValidationError::new(&self.name, "arguments must be a list of argument lists")
        })?;
        for (index, tuple) in tuples.iter().enumerate() {
            K::validate_tuple(tuple).map_err(|e| {
                ValidationError::new(&self.name, format!("entry {}: {}", index, e.reason))
            })?;
        }
        Ok(())
    }

    fn run(&self, build: &mut BuildInfo) -> Result<Signal, ActionError> {
        let tuples = self.tuples().ok_or_else(|| {
            ActionError::new(&self.name, "arguments must be a list of argument lists")
        })?;
        for tuple in tuples {
            K::run_tuple(tuple, build)?;
        }
        Ok(Signal::Continue)
    }
}

/// Expected argument count, as a range of accepted lengths.
pub(crate) fn check_arity(args: &[Value], min: usize, max: usize) -> Result<(), String> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            min.to_string()
        } else {
            format!("{} or {}", min, max)
        };
        return Err(format!("expected {} arguments, got {}", expected, args.len()));
    }
    Ok(())
}

/// Positional string argument
pub(crate) fn str_arg<'a>(args: &'a [Value], index: usize, what: &str) -> Result<&'a str, String> {
    match args.get(index) {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(format!("{} (argument {}) must be a string", what, index + 1)),
        None => Err(format!("missing {} (argument {})", what, index + 1)),
    }
}

/// Optional positional bool argument
pub(crate) fn opt_bool_arg(args: &[Value], index: usize, what: &str) -> Result<Option<bool>, String> {
    match args.get(index) {
        None => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(format!("{} (argument {}) must be true or false", what, index + 1)),
    }
}
