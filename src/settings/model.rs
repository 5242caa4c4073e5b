//! Typed view over the settings document.
//!
//! The store keeps the raw YAML so unknown keys survive a round trip; this
//! module only extracts what the shell needs: sections, their settings, and the
//! allowed values for each setting. Mapping order is preserved.

use serde::Serialize;
use serde_yaml::{Mapping, Value};

use crate::error::{Result, ShellError};

pub(crate) const DESCRIPTION_KEY: &str = "description";
pub(crate) const OPTIONS_KEY: &str = "options";
pub(crate) const VALUE_KEY: &str = "value";

/// Parsed settings document: `section -> {description, setting -> {...}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SettingsDocument {
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub name: String,
    pub description: Option<String>,
    pub settings: Vec<Setting>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Setting {
    pub name: String,
    pub description: Option<String>,
    /// Allowed values. `None` means any value is accepted.
    pub options: Option<Vec<String>>,
    pub value: Option<String>,
}

impl SettingsDocument {
    /// Build the typed view from a YAML value. An empty document (`~`) yields
    /// no sections.
    pub fn from_yaml(value: &Value) -> Result<Self> {
        let mapping = match value {
            Value::Null => return Ok(Self::default()),
            Value::Mapping(mapping) => mapping,
            other => {
                return Err(ShellError::Settings(format!(
                    "expected a mapping of sections, found {}",
                    kind_of(other)
                )))
            }
        };

        let mut sections = Vec::with_capacity(mapping.len());
        for (key, body) in mapping {
            let name = scalar_to_string(key).ok_or_else(|| {
                ShellError::Settings("section names must be scalars".to_string())
            })?;
            sections.push(Section::from_yaml(name, body)?);
        }

        Ok(Self { sections })
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn setting(&self, section: &str, setting: &str) -> Option<&Setting> {
        self.section(section)?.setting(setting)
    }
}

impl Section {
    fn from_yaml(name: String, body: &Value) -> Result<Self> {
        let mut section = Self {
            name,
            description: None,
            settings: Vec::new(),
        };

        let Value::Mapping(mapping) = body else {
            // `section: ~` declares an empty section
            if body.is_null() {
                return Ok(section);
            }
            return Err(ShellError::Settings(format!(
                "section '{}' must be a mapping, found {}",
                section.name,
                kind_of(body)
            )));
        };

        for (key, value) in mapping {
            let Some(key) = scalar_to_string(key) else {
                continue;
            };
            if key == DESCRIPTION_KEY {
                section.description = scalar_to_string(value);
                continue;
            }
            section.settings.push(Setting::from_yaml(key, value));
        }

        Ok(section)
    }

    pub fn setting(&self, name: &str) -> Option<&Setting> {
        self.settings.iter().find(|s| s.name == name)
    }
}

impl Setting {
    fn from_yaml(name: String, body: &Value) -> Self {
        match body {
            Value::Mapping(mapping) => Self {
                name,
                description: get(mapping, DESCRIPTION_KEY).and_then(scalar_to_string),
                options: get(mapping, OPTIONS_KEY).and_then(options_from_yaml),
                value: get(mapping, VALUE_KEY).and_then(scalar_to_string),
            },
            // Shorthand: `setting: value`
            other => Self {
                name,
                description: None,
                options: None,
                value: scalar_to_string(other),
            },
        }
    }

    /// Whether `value` is acceptable for this setting.
    pub fn accepts(&self, value: &str) -> bool {
        match &self.options {
            Some(options) if !options.is_empty() => options.iter().any(|o| o == value),
            _ => true,
        }
    }
}

/// Options may be a sequence of values or a mapping of value -> description.
fn options_from_yaml(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Sequence(seq) => Some(seq.iter().filter_map(scalar_to_string).collect()),
        Value::Mapping(mapping) => Some(mapping.keys().filter_map(scalar_to_string).collect()),
        Value::Null => None,
        other => scalar_to_string(other).map(|v| vec![v]),
    }
}

pub(crate) fn get<'a>(mapping: &'a Mapping, key: &str) -> Option<&'a Value> {
    mapping.get(key)
}

pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
