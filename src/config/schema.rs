//! Shell configuration schema.
//!
//! Every section uses `#[serde(default)]` so a partial file is enough.

use serde::{Deserialize, Serialize};

use crate::dispatcher::DEFAULT_HISTORY_LIMIT;

/// Root configuration, loaded from `~/.jobshell/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Schema version for migrations
    pub version: u32,

    pub shell: ShellSettings,

    /// Where the `set` command reads and writes settings
    pub settings: SettingsFileSettings,

    pub logging: LoggingSettings,
}

/// Prompt and history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellSettings {
    pub prompt: String,

    /// Maximum number of remembered input lines
    pub history_limit: usize,

    /// Append submitted lines to this file. Supports `$VAR` references.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_file: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsFileSettings {
    /// YAML settings document. Falls back to `$JOBSHELL_SETTINGS`, then
    /// `~/.jobshell/settings.yaml`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Level of the crate's own `tracing` output; `RUST_LOG` adds directives
    pub level: String,

    /// Minimum severity of job logs shown in the console:
    /// "debug" | "info" | "warning" | "error"
    pub console_severity: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            version: 1,
            shell: ShellSettings::default(),
            settings: SettingsFileSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl Default for ShellSettings {
    fn default() -> Self {
        Self {
            prompt: "> ".to_string(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            history_file: None,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            console_severity: "info".to_string(),
        }
    }
}
