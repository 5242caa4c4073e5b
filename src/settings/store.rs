//! Settings persistence.
//!
//! The `set` command treats the store as plain key/value persistence:
//! sections, settings, allowed options, current values. The YAML store keeps
//! the whole document on disk and re-reads it on every query, so external
//! edits are picked up by the next `set` without a reload.

use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};
use serde_yaml::{Mapping, Value};

use super::model::{SettingsDocument, VALUE_KEY};
use crate::error::{Result, ShellError};

/// Key/value settings collaborator used by `set`.
///
/// Implementations must be callable from any job's task and allow at most one
/// writer at a time.
pub trait SettingsStore: Send + Sync {
    /// The full document: every section with its settings.
    fn get_config(&self) -> Result<SettingsDocument>;

    /// Allowed values of `section.setting`, or `None` when any value goes.
    fn get_setting_options(&self, section: &str, setting: &str) -> Result<Option<Vec<String>>> {
        let document = self.get_config()?;
        let found = document
            .setting(section, setting)
            .ok_or_else(|| unknown_setting(section, setting))?;
        Ok(found.options.clone())
    }

    /// Current value of `section.setting`.
    fn get_value(&self, section: &str, setting: &str) -> Result<Option<String>> {
        let document = self.get_config()?;
        let found = document
            .setting(section, setting)
            .ok_or_else(|| unknown_setting(section, setting))?;
        Ok(found.value.clone())
    }

    /// Persist `value` for `section.setting`.
    fn update_setting(&self, section: &str, setting: &str, value: &str) -> Result<()>;
}

fn unknown_setting(section: &str, setting: &str) -> ShellError {
    ShellError::Settings(format!("unknown setting: {}.{}", section, setting))
}

/// Write `value` into the raw document. Mapping settings get their `value`
/// key replaced; shorthand scalars are replaced outright.
fn apply_update(document: &mut Value, section: &str, setting: &str, value: &str) -> Result<()> {
    let entry = document
        .as_mapping_mut()
        .and_then(|root| root.get_mut(section))
        .and_then(Value::as_mapping_mut)
        .and_then(|body| body.get_mut(setting))
        .ok_or_else(|| unknown_setting(section, setting))?;

    let new_value = Value::String(value.to_string());
    match entry {
        Value::Mapping(body) => {
            body.insert(Value::String(VALUE_KEY.to_string()), new_value);
        }
        other => *other = new_value,
    }
    Ok(())
}

/// Settings store backed by a YAML file.
pub struct YamlSettingsStore {
    path: PathBuf,
    /// Serialises writers; readers go straight to disk.
    write_lock: Mutex<()>,
}

impl YamlSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn read_raw(&self) -> Result<Value> {
        if !self.path.exists() {
            tracing::debug!("Settings file not found at {:?}, using an empty document", self.path);
            return Ok(Value::Mapping(Mapping::new()));
        }

        let contents = std::fs::read_to_string(&self.path)?;
        serde_yaml::from_str(&contents).map_err(|e| {
            ShellError::Settings(format!("failed to parse {}: {}", self.path.display(), e))
        })
    }

    fn write_raw(&self, document: &Value) -> Result<()> {
        let yaml = serde_yaml::to_string(document)
            .map_err(|e| ShellError::Settings(format!("failed to serialize settings: {}", e)))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        // Atomic write: write to temp file, then rename
        let temp_path = self.path.with_extension("yaml.tmp");
        std::fs::write(&temp_path, yaml)?;
        std::fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

impl SettingsStore for YamlSettingsStore {
    fn get_config(&self) -> Result<SettingsDocument> {
        SettingsDocument::from_yaml(&self.read_raw()?)
    }

    fn update_setting(&self, section: &str, setting: &str, value: &str) -> Result<()> {
        let _guard = self.write_lock.lock();
        let mut document = self.read_raw()?;
        apply_update(&mut document, section, setting, value)?;
        self.write_raw(&document)?;
        tracing::info!("Saved {}.{} = {} to {:?}", section, setting, value, self.path);
        Ok(())
    }
}

/// In-memory store, for embedding without a file and for tests.
#[derive(Default)]
pub struct MemorySettingsStore {
    document: RwLock<Value>,
    writes: Mutex<usize>,
}

impl MemorySettingsStore {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let document: Value = serde_yaml::from_str(yaml)
            .map_err(|e| ShellError::Settings(format!("invalid settings document: {}", e)))?;
        // Validate the shape up front
        SettingsDocument::from_yaml(&document)?;
        Ok(Self {
            document: RwLock::new(document),
            writes: Mutex::new(0),
        })
    }

    /// Number of successful `update_setting` calls.
    pub fn write_count(&self) -> usize {
        *self.writes.lock()
    }

    /// Replace the whole document, as an external edit would.
    pub fn replace(&self, yaml: &str) -> Result<()> {
        let document: Value = serde_yaml::from_str(yaml)
            .map_err(|e| ShellError::Settings(format!("invalid settings document: {}", e)))?;
        SettingsDocument::from_yaml(&document)?;
        *self.document.write() = document;
        Ok(())
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get_config(&self) -> Result<SettingsDocument> {
        SettingsDocument::from_yaml(&self.document.read())
    }

    fn update_setting(&self, section: &str, setting: &str, value: &str) -> Result<()> {
        let mut writes = self.writes.lock();
        apply_update(&mut self.document.write(), section, setting, value)?;
        *writes += 1;
        Ok(())
    }
}
