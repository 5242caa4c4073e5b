//! Configuration loading, saving, and environment variable interpolation.
//!
//! The `ConfigManager` handles:
//! - Loading `~/.jobshell/config.toml`
//! - Resolving `$VAR` and `${VAR}` references in path fields
//! - First-run template generation

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::sync::RwLock;

use super::schema::ShellConfig;

/// Embedded template for first-run generation.
const TEMPLATE: &str = include_str!("template.toml");

/// Environment variable naming the settings document.
pub const SETTINGS_ENV_VAR: &str = "JOBSHELL_SETTINGS";

fn base_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".jobshell")
}

/// Path of the global configuration file.
pub fn config_path() -> PathBuf {
    base_dir().join("config.toml")
}

/// Settings document used when neither the config nor the environment names one.
pub fn default_settings_path() -> PathBuf {
    base_dir().join("settings.yaml")
}

/// Loads, caches and persists the shell configuration.
pub struct ConfigManager {
    /// Cached config (with env vars resolved)
    config: RwLock<ShellConfig>,

    path: PathBuf,
}

impl ConfigManager {
    /// Load from the default location.
    pub async fn new() -> Result<Self> {
        Self::with_path(config_path()).await
    }

    /// Load from `path`. A missing file yields the defaults.
    pub async fn with_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let config = Self::load_from_path(&path).await?;

        Ok(Self {
            config: RwLock::new(config),
            path,
        })
    }

    async fn load_from_path(path: &Path) -> Result<ShellConfig> {
        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(ShellConfig::default());
        }

        let contents = tokio::fs::read_to_string(path)
            .await
            .context("Failed to read config file")?;

        let mut config: ShellConfig =
            toml::from_str(&contents).context("Failed to deserialize config")?;

        Self::resolve_env_vars(&mut config);

        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Resolve $ENV_VAR references in path fields.
    fn resolve_env_vars(config: &mut ShellConfig) {
        fn resolve_opt(value: &mut Option<String>) {
            if let Some(v) = value {
                if let Some(resolved) = resolve_env_ref(v) {
                    *v = resolved;
                }
            }
        }

        resolve_opt(&mut config.shell.history_file);
        resolve_opt(&mut config.settings.path);
    }

    pub async fn get(&self) -> ShellConfig {
        self.config.read().await.clone()
    }

    /// Value at a dot-notation key (e.g., "shell.prompt").
    pub async fn get_value(&self, key: &str) -> Result<serde_json::Value> {
        let config = self.config.read().await;
        let json = serde_json::to_value(&*config)?;

        let mut current = &json;
        for part in key.split('.') {
            current = current
                .get(part)
                .ok_or_else(|| anyhow::anyhow!("Config key '{}' not found", key))?;
        }

        Ok(current.clone())
    }

    /// The settings document: config value, then `$JOBSHELL_SETTINGS`, then
    /// `~/.jobshell/settings.yaml`.
    pub async fn settings_path(&self) -> PathBuf {
        let config = self.config.read().await;
        get_with_env_fallback(&config.settings.path, &[SETTINGS_ENV_VAR], None)
            .map(PathBuf::from)
            .unwrap_or_else(default_settings_path)
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the config file from the template if it is missing.
    ///
    /// Returns `true` if a new file was created.
    pub async fn ensure_config_file(&self) -> Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&self.path, TEMPLATE).await?;
        tracing::info!("Generated config template at {:?}", self.path);
        Ok(true)
    }

    /// Reload from disk.
    pub async fn reload(&self) -> Result<()> {
        let config = Self::load_from_path(&self.path).await?;
        *self.config.write().await = config;
        Ok(())
    }
}

/// Resolve a $ENV_VAR or ${ENV_VAR} reference.
///
/// Returns `None` if the value is not a reference or the variable is unset.
fn resolve_env_ref(value: &str) -> Option<String> {
    let trimmed = value.trim();
    let name = trimmed.strip_prefix('$')?;
    let name = name
        .strip_prefix('{')
        .and_then(|n| n.strip_suffix('}'))
        .unwrap_or(name);
    std::env::var(name).ok()
}

/// Setting value, else the first set environment variable, else `default`.
/// Empty strings count as unset.
pub fn get_with_env_fallback(
    setting: &Option<String>,
    env_vars: &[&str],
    default: Option<String>,
) -> Option<String> {
    if let Some(v) = setting.as_ref().filter(|v| !v.is_empty()) {
        return Some(v.clone());
    }

    env_vars
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|v| !v.is_empty())
        .or(default)
}
