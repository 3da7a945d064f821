//! Pin evaluation: does a control apply to this machine?
//!
//! A pin set maps attribute names to criteria lists:
//!
//! ```yaml
//! pin:
//!   computer_model: ['HP Z640 Workstation', '!HP Z620 Workstation']
//!   os_code: [win10]
//! ```
//!
//! Keys are ANDed in document order, stopping at the first key that fails.
//! Within a key the criteria are scanned in order:
//!
//! - a negated criterion (`!literal`) that matches fails the whole pin set
//! - a positive criterion that matches satisfies the key immediately
//! - after the scan, the key holds only if it had no positive criteria
//!
//! Criteria are parsed into `{literal, negated}` once, when the document is
//! read, so the marker is never re-inspected during evaluation.

use crate::document::scalar_to_string;
use crate::error::FactLookupError;
use crate::facts::FactSource;
use serde_yaml::Value;
use tracing::debug;

/// Prefix marking a criterion as an exclusion
pub const NEGATION_MARKER: char = '!';

/// One entry of a pin's criteria list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Criterion {
    literal: String,
    negated: bool,
}

impl Criterion {
    /// Parse a raw criterion, stripping a single leading negation marker.
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix(NEGATION_MARKER) {
            Some(literal) => Self::negated(literal),
            None => Self::positive(raw),
        }
    }

    pub fn positive(literal: impl Into<String>) -> Self {
        Self {
            literal: literal.into(),
            negated: false,
        }
    }

    pub fn negated(literal: impl Into<String>) -> Self {
        Self {
            literal: literal.into(),
            negated: true,
        }
    }

    pub fn literal(&self) -> &str {
        &self.literal
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }
}

/// Attribute name -> criteria, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinSet {
    keys: Vec<(String, Vec<Criterion>)>,
}

impl PinSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form: append a key whose criteria are given in raw form.
    pub fn with(mut self, key: impl Into<String>, criteria: &[&str]) -> Self {
        self.push(key, criteria.iter().map(|c| Criterion::parse(c)).collect());
        self
    }

    pub fn push(&mut self, key: impl Into<String>, criteria: Vec<Criterion>) {
        self.keys.push((key.into(), criteria));
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Criterion])> {
        self.keys.iter().map(|(k, c)| (k.as_str(), c.as_slice()))
    }

    /// Parse the `pin` value of a control.
    ///
    /// A scalar criterion is accepted as a one-element list; `null` is an
    /// empty list.
    pub fn from_value(value: &Value) -> Result<Self, String> {
        let mapping = match value {
            Value::Mapping(m) => m,
            Value::Null => return Ok(Self::new()),
            other => return Err(format!("pin must be a mapping, got {}", kind_of(other))),
        };

        let mut pins = Self::new();
        for (key, raw) in mapping {
            let key = key
                .as_str()
                .ok_or_else(|| "pin attribute names must be strings".to_string())?;

            let criteria = match raw {
                Value::Sequence(items) => items
                    .iter()
                    .map(|item| {
                        scalar_to_string(item)
                            .map(|s| Criterion::parse(&s))
                            .ok_or_else(|| format!("pin '{}' has a non-scalar criterion", key))
                    })
                    .collect::<Result<Vec<_>, _>>()?,
                Value::Null => Vec::new(),
                scalar => {
                    let s = scalar_to_string(scalar)
                        .ok_or_else(|| format!("pin '{}' has a non-scalar criterion", key))?;
                    vec![Criterion::parse(&s)]
                }
            };
            pins.push(key, criteria);
        }
        Ok(pins)
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a bool",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// Evaluate a pin set against a fact source.
///
/// An empty pin set matches. Any lookup failure aborts the evaluation.
pub fn matches(pins: &PinSet, facts: &dyn FactSource) -> Result<bool, FactLookupError> {
    for (key, criteria) in pins.iter() {
        if !key_matches(key, criteria, facts)? {
            debug!("Pin '{}' did not match", key);
            return Ok(false);
        }
    }
    Ok(true)
}

fn key_matches(
    key: &str,
    criteria: &[Criterion],
    facts: &dyn FactSource,
) -> Result<bool, FactLookupError> {
    let mut has_positive = false;

    for criterion in criteria {
        let hit = facts.lookup(key, criterion.literal())?;
        if criterion.is_negated() {
            if hit {
                return Ok(false);
            }
        } else {
            has_positive = true;
            if hit {
                return Ok(true);
            }
        }
    }

    Ok(!has_positive)
}
