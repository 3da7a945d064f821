//! `ShowChooser`: ask the operator (or a policy) to pick build options.
//!
//! # Option Format
//!
//! ```yaml
//! ShowChooser:
//!   - name: locale
//!     type: radio
//!     prompt: System locale
//!     options:
//!       - {label: English, value: en-us, default: true}
//!       - {label: German, value: de-de}
//!   - name: encrypt
//!     type: toggle
//!     prompt: Enable disk encryption
//!     options:
//!       - {label: 'Off', value: false, default: true}
//!       - {label: 'On', value: true}
//! ```
//!
//! Each answer is stored on the build-info handle under the option's name,
//! so later controls can pin on `USER_locale: [de-de]`.

use super::{Action, Signal};
use crate::buildinfo::BuildInfo;
use crate::document::scalar_to_string;
use crate::error::{ActionError, ValidationError};
use crate::types::ChooserKind;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::info;

pub const NAME: &str = "ShowChooser";

/// One selectable value of a chooser option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub label: String,
    pub value: Value,
    #[serde(default)]
    pub default: bool,
}

/// One question presented by the chooser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChooserOption {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ChooserKind,
    #[serde(default)]
    pub prompt: String,
    pub options: Vec<Choice>,
}

impl ChooserOption {
    /// The choice marked default, or the first one.
    pub fn default_choice(&self) -> Option<&Choice> {
        self.options
            .iter()
            .find(|c| c.default)
            .or_else(|| self.options.first())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChooserError {
    #[error("chooser was cancelled")]
    Cancelled,

    #[error("option '{0}' has no selectable value")]
    NoChoice(String),

    #[error("chooser failed: {0}")]
    Failed(String),
}

/// Presents chooser options and returns `name -> selected value`.
pub trait Chooser {
    fn choose(&self, options: &[ChooserOption]) -> Result<BTreeMap<String, String>, ChooserError>;
}

/// Non-interactive chooser: every option takes its default.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultChooser;

impl Chooser for DefaultChooser {
    fn choose(&self, options: &[ChooserOption]) -> Result<BTreeMap<String, String>, ChooserError> {
        options
            .iter()
            .map(|option| {
                option
                    .default_choice()
                    .and_then(|choice| scalar_to_string(&choice.value))
                    .map(|value| (option.name.clone(), value))
                    .ok_or_else(|| ChooserError::NoChoice(option.name.clone()))
            })
            .collect()
    }
}

#[derive(Debug)]
pub struct ShowChooser {
    data: Value,
}

impl ShowChooser {
    pub fn new(data: &Value) -> Self {
        Self { data: data.clone() }
    }

    fn options(&self) -> Result<Vec<ChooserOption>, String> {
        let items = self
            .data
            .as_sequence()
            .ok_or_else(|| "arguments must be a list of chooser options".to_string())?;
        if items.is_empty() {
            return Err("at least one chooser option is required".to_string());
        }

        let mut names = BTreeSet::new();
        let mut options = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let option: ChooserOption = serde_yaml::from_value(item.clone())
                .map_err(|e| format!("option {}: {}", index, e))?;

            if !names.insert(option.name.to_lowercase()) {
                return Err(format!("duplicate option name '{}'", option.name));
            }
            if option.options.is_empty() {
                return Err(format!("option '{}' has no choices", option.name));
            }
            if let Some(bad) = option.options.iter().find(|c| scalar_to_string(&c.value).is_none()) {
                return Err(format!(
                    "option '{}': choice '{}' must have a scalar value",
                    option.name, bad.label
                ));
            }
            let defaults = option.options.iter().filter(|c| c.default).count();
            if option.kind == ChooserKind::Radio && defaults > 1 {
                return Err(format!("radio option '{}' has {} defaults", option.name, defaults));
            }
            options.push(option);
        }
        Ok(options)
    }
}

impl Action for ShowChooser {
    fn name(&self) -> &str {
        NAME
    }

    fn validate(&self) -> Result<(), ValidationError> {
        self.options()
            .map(|_| ())
            .map_err(|reason| ValidationError::new(NAME, reason))
    }

    fn run(&self, build: &mut BuildInfo) -> Result<Signal, ActionError> {
        let options = self
            .options()
            .map_err(|reason| ActionError::new(NAME, reason))?;

        let responses = build
            .chooser()
            .choose(&options)
            .map_err(|e| ActionError::new(NAME, e.to_string()))?;

        for (name, value) in responses {
            info!("Chooser response {} = {}", name, value);
            build.store_chooser_response(name, value);
        }
        Ok(Signal::Continue)
    }
}
