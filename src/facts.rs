//! Machine facts used for pin evaluation
//!
//! A fact is a named attribute of the machine being imaged (`computer_model`,
//! `os_code`, `firmware`, ...) with one or more values. Pins ask a single
//! question of the fact source: "does attribute X have value Y here?".
//!
//! # Sources
//!
//! Facts come from three layers, later layers winning:
//!
//! 1. Detection from sysfs at startup (`FactTable::detect()`)
//! 2. A JSON fact file supplied by the provisioning environment
//! 3. Inline overrides (`--fact key=value`, `facts` in the config file)
//!
//! Detection never panics: a value that cannot be read is simply absent, and
//! a pin naming an absent attribute fails with `FactLookupError`.

use crate::error::FactLookupError;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Keyed boolean lookup the pin evaluator runs against.
pub trait FactSource {
    /// Returns true if this machine's value for `name` equals `candidate`.
    fn lookup(&self, name: &str, candidate: &str) -> Result<bool, FactLookupError>;
}

/// Detected firmware mode of the system.
///
/// Determined by checking for the existence of `/sys/firmware/efi`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FirmwareMode {
    Uefi,
    Bios,
}

impl fmt::Display for FirmwareMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uefi => write!(f, "uefi"),
            Self::Bios => write!(f, "bios"),
        }
    }
}

/// Model/manufacturer substrings that identify a hypervisor guest
const VIRTUAL_MARKERS: &[&str] = &[
    "virtual",
    "vmware",
    "kvm",
    "qemu",
    "virtualbox",
    "xen",
    "bochs",
];

/// Attribute name -> values, compared case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FactTable {
    facts: BTreeMap<String, Vec<String>>,
}

impl FactTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Detect the facts this machine exposes without any configuration.
    pub fn detect() -> Self {
        let mut table = Self::new();

        table.set("firmware", detect_firmware_mode().to_string());
        table.set("architecture", std::env::consts::ARCH);
        table.set("os_family", std::env::consts::OS);

        let model = read_dmi("product_name");
        let manufacturer = read_dmi("sys_vendor");
        let is_virtual = [&model, &manufacturer].iter().any(|value| {
            value.as_deref().is_some_and(|v| {
                let v = v.to_lowercase();
                VIRTUAL_MARKERS.iter().any(|marker| v.contains(marker))
            })
        });

        if let Some(model) = model {
            table.set("computer_model", model);
        }
        if let Some(manufacturer) = manufacturer {
            table.set("manufacturer", manufacturer);
        }
        table.set("is_virtual", is_virtual.to_string());

        info!("Detected facts: {}", table);
        table
    }

    /// Load a fact table from a JSON object.
    ///
    /// Values may be a string, a number, a bool or a list of those.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read fact file {:?}", path.as_ref()))?;
        let raw: BTreeMap<String, serde_json::Value> =
            serde_json::from_str(&content).context("Failed to parse fact file JSON")?;

        let mut table = Self::new();
        for (name, value) in raw {
            let values = match value {
                serde_json::Value::Array(items) => items.iter().map(json_scalar).collect(),
                other => vec![json_scalar(&other)],
            };
            table.set_all(name, values);
        }
        debug!("Loaded {} facts from {:?}", table.len(), path.as_ref());
        Ok(table)
    }

    /// Replace an attribute with a single value
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.facts.insert(name.into().to_lowercase(), vec![value.into()]);
    }

    /// Replace an attribute with several values
    pub fn set_all(&mut self, name: impl Into<String>, values: Vec<String>) {
        self.facts.insert(name.into().to_lowercase(), values);
    }

    /// Overlay `other` on top of this table; its attributes win.
    pub fn merge(&mut self, other: FactTable) {
        self.facts.extend(other.facts);
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.facts.get(&name.to_lowercase()).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

impl FactSource for FactTable {
    fn lookup(&self, name: &str, candidate: &str) -> Result<bool, FactLookupError> {
        let values = self
            .get(name)
            .ok_or_else(|| FactLookupError::UnknownAttribute {
                name: name.to_string(),
            })?;
        Ok(values.iter().any(|v| v.eq_ignore_ascii_case(candidate)))
    }
}

impl fmt::Display for FactTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .facts
            .iter()
            .map(|(k, v)| format!("{}={}", k, v.join("|")))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

fn json_scalar(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Detect firmware mode by checking for the EFI sysfs directory.
///
/// The Linux kernel exposes `/sys/firmware/efi` only when booted in UEFI mode.
pub fn detect_firmware_mode() -> FirmwareMode {
    if Path::new("/sys/firmware/efi").exists() {
        FirmwareMode::Uefi
    } else {
        FirmwareMode::Bios
    }
}

/// Read a DMI identity field, trimmed. Absent or empty fields yield `None`.
fn read_dmi(field: &str) -> Option<String> {
    let path = Path::new("/sys/class/dmi/id").join(field);
    let value = fs::read_to_string(path).ok()?;
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

// ============================================================================
// Tests
// ============================================================================
