//! Type-safe vocabulary shared by the engine, transport and actions
//!
//! Directive arguments arrive as loose YAML; wherever an argument is drawn
//! from a closed set of words it is parsed into one of these enums so the
//! rest of the code matches exhaustively instead of comparing strings.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// How a task list is written to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum WriteMode {
    /// Add entries after whatever the target already holds
    #[default]
    Append,
    /// Replace the target's contents
    Overwrite,
}

/// Registry root hive accepted by the registry actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
pub enum RegistryRoot {
    #[strum(to_string = "HKLM", serialize = "HKEY_LOCAL_MACHINE")]
    Hklm,
    #[strum(to_string = "HKCU", serialize = "HKEY_CURRENT_USER")]
    Hkcu,
    #[strum(to_string = "HKCR", serialize = "HKEY_CLASSES_ROOT")]
    Hkcr,
    #[strum(to_string = "HKU", serialize = "HKEY_USERS")]
    Hku,
    #[strum(to_string = "HKCC", serialize = "HKEY_CURRENT_CONFIG")]
    Hkcc,
}

/// Registry value kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistryKind {
    #[default]
    RegSz,
    RegExpandSz,
    RegMultiSz,
    RegBinary,
    RegDword,
    RegQword,
}

impl RegistryKind {
    /// Numeric kinds only accept integer data
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::RegDword | Self::RegQword)
    }
}

/// Presentation of a chooser option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum ChooserKind {
    /// Two-state on/off choice
    Toggle,
    /// Pick exactly one of several values
    Radio,
}
