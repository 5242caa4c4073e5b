//! Shell configuration stored in `~/.jobshell/config.toml`.
//!
//! Values may reference environment variables with `$VAR` or `${VAR}`. The
//! settings path also falls back to `$JOBSHELL_SETTINGS`:
//!
//! ```rust,ignore
//! use jobshell_lib::config::ConfigManager;
//!
//! let manager = ConfigManager::new().await?;
//! let config = manager.get().await;
//! let settings = manager.settings_path().await;
//! ```

pub mod loader;
pub mod schema;

pub use loader::{config_path, get_with_env_fallback, ConfigManager};
pub use schema::ShellConfig;
