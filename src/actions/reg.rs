//! Registry actions: `RegAdd`, `RegDel` and their `Multi` forms.
//!
//! # Argument Layout
//!
//! | Directive | Arguments |
//! |-----------|-----------|
//! | `RegAdd`  | `[root, path, name, value, type]` + optional `use_64` |
//! | `RegDel`  | `[root, path, name]` + optional `use_64` |
//!
//! `type` decides what `value` must be: `REG_DWORD`/`REG_QWORD` need an
//! integer, every other kind needs a string. When `use_64` is omitted the
//! build's default registry view applies.
//!
//! The actual write goes through a `RegistryStore`. Store failures are
//! reported as `ActionError` and never escape as the store's own type.

use super::{check_arity, opt_bool_arg, str_arg, TupleAction};
use crate::buildinfo::BuildInfo;
use crate::error::{ActionError, ValidationError};
use crate::types::{RegistryKind, RegistryRoot};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::info;

/// Data stored in a registry value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryData {
    Text(String),
    Integer(i64),
}

impl fmt::Display for RegistryData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{}", s),
            Self::Integer(n) => write!(f, "{}", n),
        }
    }
}

/// Location of a registry value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct RegistryKey {
    pub root: RegistryRoot,
    pub path: String,
    pub name: String,
    /// 64-bit registry view when true, 32-bit otherwise
    pub use_64: bool,
}

impl fmt::Display for RegistryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let view = if self.use_64 { 64 } else { 32 };
        write!(f, "{}\\{}\\{} ({}-bit)", self.root, self.path, self.name, view)
    }
}

/// Failures raised by a registry backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryStoreError {
    #[error("registry value {0} does not exist")]
    NotFound(String),

    #[error("access denied to {0}")]
    AccessDenied(String),

    #[error("registry backend failure: {0}")]
    Backend(String),
}

/// Registry backend the registry actions write through.
pub trait RegistryStore {
    fn set_value(
        &mut self,
        key: &RegistryKey,
        data: &RegistryData,
        kind: RegistryKind,
    ) -> Result<(), RegistryStoreError>;

    fn remove_value(&mut self, key: &RegistryKey) -> Result<(), RegistryStoreError>;
}

/// In-process registry. Used where no native registry exists and in tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    values: BTreeMap<RegistryKey, (RegistryKind, RegistryData)>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &RegistryKey) -> Option<&(RegistryKind, RegistryData)> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl RegistryStore for MemoryRegistry {
    fn set_value(
        &mut self,
        key: &RegistryKey,
        data: &RegistryData,
        kind: RegistryKind,
    ) -> Result<(), RegistryStoreError> {
        self.values.insert(key.clone(), (kind, data.clone()));
        Ok(())
    }

    fn remove_value(&mut self, key: &RegistryKey) -> Result<(), RegistryStoreError> {
        self.values
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| RegistryStoreError::NotFound(key.to_string()))
    }
}

/// Parsed `RegAdd` tuple, with the registry view still unresolved.
struct AddArgs {
    root: RegistryRoot,
    path: String,
    name: String,
    data: RegistryData,
    kind: RegistryKind,
    use_64: Option<bool>,
}

fn parse_root(args: &[Value]) -> Result<RegistryRoot, String> {
    let root = str_arg(args, 0, "root")?;
    root.parse()
        .map_err(|_| format!("unknown registry root '{}'", root))
}

fn parse_add(args: &[Value]) -> Result<AddArgs, String> {
    check_arity(args, 5, 6)?;
    let root = parse_root(args)?;
    let path = str_arg(args, 1, "path")?;
    let name = str_arg(args, 2, "name")?;
    let kind_name = str_arg(args, 4, "type")?;
    let kind: RegistryKind = kind_name
        .parse()
        .map_err(|_| format!("unknown registry type '{}'", kind_name))?;

    let data = match (&args[3], kind.is_numeric()) {
        (Value::Number(n), true) => n
            .as_i64()
            .or_else(|| n.as_u64().and_then(|u| i64::try_from(u).ok()))
            .map(RegistryData::Integer)
            .ok_or_else(|| format!("{} value must be an integer, got {}", kind, n))?,
        (other, true) => {
            return Err(format!("{} value must be an integer, got {}", kind, describe(other)));
        }
        (Value::String(s), false) => RegistryData::Text(s.clone()),
        (other, false) => {
            return Err(format!("{} value must be a string, got {}", kind, describe(other)));
        }
    };

    Ok(AddArgs {
        root,
        path: path.to_string(),
        name: name.to_string(),
        data,
        kind,
        use_64: opt_bool_arg(args, 5, "use_64")?,
    })
}

fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => format!("string '{}'", s),
        Value::Number(n) => format!("number {}", n),
        Value::Bool(b) => format!("bool {}", b),
        Value::Null => "null".to_string(),
        Value::Sequence(_) => "a list".to_string(),
        Value::Mapping(_) => "a mapping".to_string(),
        Value::Tagged(_) => "a tagged value".to_string(),
    }
}

/// Parsed `RegDel` tuple.
struct DelArgs {
    root: RegistryRoot,
    path: String,
    name: String,
    use_64: Option<bool>,
}

fn parse_del(args: &[Value]) -> Result<DelArgs, String> {
    check_arity(args, 3, 4)?;
    Ok(DelArgs {
        root: parse_root(args)?,
        path: str_arg(args, 1, "path")?.to_string(),
        name: str_arg(args, 2, "name")?.to_string(),
        use_64: opt_bool_arg(args, 3, "use_64")?,
    })
}

/// Set a registry value.
pub struct RegAdd;

impl TupleAction for RegAdd {
    const NAME: &'static str = "RegAdd";

    fn validate_tuple(args: &[Value]) -> Result<(), ValidationError> {
        parse_add(args)
            .map(|_| ())
            .map_err(|reason| ValidationError::new(Self::NAME, reason))
    }

    fn run_tuple(args: &[Value], build: &mut BuildInfo) -> Result<(), ActionError> {
        let add = parse_add(args).map_err(|reason| ActionError::new(Self::NAME, reason))?;
        let key = RegistryKey {
            root: add.root,
            path: add.path,
            name: add.name,
            use_64: add.use_64.unwrap_or(build.use_reg_64()),
        };

        info!("Setting registry value {} = {} ({})", key, add.data, add.kind);
        build
            .registry()
            .set_value(&key, &add.data, add.kind)
            .map_err(|e| ActionError::new(Self::NAME, e.to_string()))
    }
}

/// Remove a registry value.
pub struct RegDel;

impl TupleAction for RegDel {
    const NAME: &'static str = "RegDel";

    fn validate_tuple(args: &[Value]) -> Result<(), ValidationError> {
        parse_del(args)
            .map(|_| ())
            .map_err(|reason| ValidationError::new(Self::NAME, reason))
    }

    fn run_tuple(args: &[Value], build: &mut BuildInfo) -> Result<(), ActionError> {
        let del = parse_del(args).map_err(|reason| ActionError::new(Self::NAME, reason))?;
        let key = RegistryKey {
            root: del.root,
            path: del.path,
            name: del.name,
            use_64: del.use_64.unwrap_or(build.use_reg_64()),
        };

        info!("Removing registry value {}", key);
        build
            .registry()
            .remove_value(&key)
            .map_err(|e| ActionError::new(Self::NAME, e.to_string()))
    }
}
