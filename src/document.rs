//! Configuration document model
//!
//! A build configuration document is YAML:
//!
//! ```yaml
//! templates:
//!   base_registry:
//!     RegAdd: ['HKLM', 'SOFTWARE\Build', 'Stage', 'base', 'REG_SZ']
//! controls:
//!   - pin:
//!       os_code: [win10]
//!     include:
//!       - ['drivers/', 'build.yaml']
//!   - template: [base_registry]
//!     SetTimer: ['imaging']
//! ```
//!
//! Each control is a mapping. `pin`, `include` and `template` are structural
//! keys the engine interprets; every other key is a directive whose value is
//! its argument data. Keys are kept in document order.

use crate::pin::PinSet;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

pub const PIN_KEY: &str = "pin";
pub const INCLUDE_KEY: &str = "include";
pub const TEMPLATE_KEY: &str = "template";
pub const CONTROLS_KEY: &str = "controls";
pub const TEMPLATES_KEY: &str = "templates";

/// A nested document to process in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Include {
    /// Path relative to the including document's root
    pub path: String,
    pub file: String,
}

/// One non-pin key of a control.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEntry {
    Include(Vec<Include>),
    Template(Vec<String>),
    Directive { name: String, data: Value },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Control {
    pub pin: Option<PinSet>,
    pub entries: Vec<ControlEntry>,
}

impl Control {
    pub fn from_value(value: &Value) -> Result<Self, String> {
        let mapping = value
            .as_mapping()
            .ok_or_else(|| "each control must be a mapping".to_string())?;
        Self::from_mapping(mapping)
    }

    fn from_mapping(mapping: &Mapping) -> Result<Self, String> {
        let mut control = Self::default();

        for (key, value) in mapping {
            let key = key
                .as_str()
                .ok_or_else(|| "control keys must be strings".to_string())?;

            match key {
                PIN_KEY => control.pin = Some(PinSet::from_value(value)?),
                INCLUDE_KEY => control.entries.push(ControlEntry::Include(parse_includes(value)?)),
                TEMPLATE_KEY => control
                    .entries
                    .push(ControlEntry::Template(parse_template_names(value)?)),
                name => control.entries.push(ControlEntry::Directive {
                    name: name.to_string(),
                    data: value.clone(),
                }),
            }
        }

        Ok(control)
    }
}

fn parse_includes(value: &Value) -> Result<Vec<Include>, String> {
    let items = value
        .as_sequence()
        .ok_or_else(|| "include must be a list of [path, file] pairs".to_string())?;

    items
        .iter()
        .map(|item| match item.as_sequence().map(Vec::as_slice) {
            Some([path, file]) => match (path.as_str(), file.as_str()) {
                (Some(path), Some(file)) => Ok(Include {
                    path: path.to_string(),
                    file: file.to_string(),
                }),
                _ => Err("include path and file must be strings".to_string()),
            },
            _ => Err("include entries must be [path, file] pairs".to_string()),
        })
        .collect()
}

fn parse_template_names(value: &Value) -> Result<Vec<String>, String> {
    match value {
        Value::String(name) => Ok(vec![name.clone()]),
        Value::Sequence(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| "template names must be strings".to_string())
            })
            .collect(),
        _ => Err("template must be a name or a list of names".to_string()),
    }
}

/// A parsed configuration document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub controls: Vec<Control>,
    pub templates: BTreeMap<String, Control>,
}

impl Document {
    pub fn from_yaml_str(content: &str) -> Result<Self, String> {
        let value: Value = serde_yaml::from_str(content).map_err(|e| e.to_string())?;
        Self::from_value(&value)
    }

    /// An empty document (`null`) has no controls.
    pub fn from_value(value: &Value) -> Result<Self, String> {
        let mapping = match value {
            Value::Mapping(m) => m,
            Value::Null => return Ok(Self::default()),
            _ => return Err("document root must be a mapping".to_string()),
        };

        let controls = match mapping.get(CONTROLS_KEY) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Sequence(items)) => items
                .iter()
                .map(Control::from_value)
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => return Err("controls must be a list".to_string()),
        };

        let mut templates = BTreeMap::new();
        match mapping.get(TEMPLATES_KEY) {
            None | Some(Value::Null) => {}
            Some(Value::Mapping(entries)) => {
                for (name, body) in entries {
                    let name = name
                        .as_str()
                        .ok_or_else(|| "template names must be strings".to_string())?;
                    let control = Control::from_value(body)
                        .map_err(|e| format!("template '{}': {}", name, e))?;
                    templates.insert(name.to_string(), control);
                }
            }
            Some(_) => return Err("templates must be a mapping".to_string()),
        }

        Ok(Self {
            controls,
            templates,
        })
    }
}

/// Render a YAML scalar as the string a fact or argument comparison sees.
///
/// Returns `None` for lists, mappings and null.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pin::Criterion;

    const SAMPLE: &str = r#"
templates:
  base:
    SetTimer: ['base']
controls:
  - pin:
      os_code: [win10, '!win7']
    include:
      - ['drivers/', 'build.yaml']
      - ['apps', 'apps.yaml']
  - template: [base]
    CopyFile: ['C:\input.txt', 'C:\output.txt']
    RegAdd: ['HKLM', 'SOFTWARE\X', 'Name', 'Data', 'REG_SZ']
"#;

    #[test]
    fn test_parse_sample_document() {
        let doc = Document::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(doc.controls.len(), 2);
        assert!(doc.templates.contains_key("base"));

        let first = &doc.controls[0];
        let pin = first.pin.as_ref().unwrap();
        let (key, criteria) = pin.iter().next().unwrap();
        assert_eq!(key, "os_code");
        assert_eq!(criteria[1], Criterion::negated("win7"));

        assert_eq!(
            first.entries,
            vec![ControlEntry::Include(vec![
                Include {
                    path: "drivers/".to_string(),
                    file: "build.yaml".to_string()
                },
                Include {
                    path: "apps".to_string(),
                    file: "apps.yaml".to_string()
                },
            ])]
        );
    }

    #[test]
    fn test_directives_keep_document_order() {
        let doc = Document::from_yaml_str(SAMPLE).unwrap();
        let names: Vec<String> = doc.controls[1]
            .entries
            .iter()
            .map(|e| match e {
                ControlEntry::Template(_) => "template".to_string(),
                ControlEntry::Include(_) => "include".to_string(),
                ControlEntry::Directive { name, .. } => name.clone(),
            })
            .collect();
        assert_eq!(names, vec!["template", "CopyFile", "RegAdd"]);
        assert!(doc.controls[1].pin.is_none());
    }

    #[test]
    fn test_empty_document_has_no_controls() {
        let doc = Document::from_yaml_str("").unwrap();
        assert!(doc.controls.is_empty());

        let doc = Document::from_yaml_str("templates: {}\n").unwrap();
        assert!(doc.controls.is_empty());
    }

    #[test]
    fn test_malformed_documents_are_rejected() {
        assert!(Document::from_yaml_str("- just\n- a list\n").is_err());
        assert!(Document::from_yaml_str("controls: nope\n").is_err());
        assert!(Document::from_yaml_str("controls:\n  - include: [['only-path']]\n").is_err());
        assert!(Document::from_yaml_str("controls:\n  - pin: [win10]\n").is_err());
        assert!(Document::from_yaml_str("controls: [\n").is_err());
    }

    #[test]
    fn test_single_template_name_is_accepted() {
        let doc = Document::from_yaml_str("controls:\n  - template: base\n").unwrap();
        assert_eq!(
            doc.controls[0].entries,
            vec![ControlEntry::Template(vec!["base".to_string()])]
        );
    }

    #[test]
    fn test_scalar_to_string() {
        assert_eq!(scalar_to_string(&Value::Bool(true)).as_deref(), Some("true"));
        assert_eq!(scalar_to_string(&Value::from(42)).as_deref(), Some("42"));
        assert_eq!(scalar_to_string(&Value::Null), None);
        assert_eq!(scalar_to_string(&Value::Sequence(vec![])), None);
    }
}
