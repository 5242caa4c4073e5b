//! CLI bootstrap - wire config, settings, commands and the dispatcher.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use parking_lot::RwLock;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::command::{Command, Help, InteractiveShell, Jobs, Set, Sleep};
use crate::config::{ConfigManager, ShellConfig};
use crate::dispatcher::{Dispatcher, History};
use crate::events::{Severity, ShellEvent};
use crate::job::JobRegistry;
use crate::runtime::ChannelRuntime;
use crate::settings::YamlSettingsStore;

use super::args::Args;

/// How long shutdown waits for killed jobs to settle.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Everything the CLI needs to run command lines.
pub struct CliContext {
    /// Event sink shared by every job
    pub runtime: Arc<ChannelRuntime>,

    pub dispatcher: Arc<Dispatcher>,

    pub registry: Arc<JobRegistry>,

    pub config_manager: Arc<ConfigManager>,

    /// Config snapshot, refreshed by `reload`
    config: RwLock<ShellConfig>,

    pub settings_store: Arc<YamlSettingsStore>,

    pub args: Args,
}

impl CliContext {
    /// Route job events to a fresh receiver.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<ShellEvent> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        self.runtime.replace_event_tx(event_tx);
        event_rx
    }

    /// Minimum severity of job logs to display.
    pub fn console_severity(&self) -> Severity {
        if self.args.verbose {
            return Severity::Debug;
        }
        if self.args.quiet {
            return Severity::Error;
        }
        self.config
            .read()
            .logging
            .console_severity
            .parse()
            .unwrap_or_else(|e| {
                tracing::warn!("{}, showing info and above", e);
                Severity::Info
            })
    }

    /// Current config snapshot.
    pub fn config(&self) -> ShellConfig {
        self.config.read().clone()
    }

    /// Re-read the config file and rebuild command trees.
    ///
    /// Prompt and console severity follow the new file. The settings path,
    /// history and log level stay as they were at startup.
    pub async fn reload(&self) -> Result<()> {
        self.config_manager
            .reload()
            .await
            .context("Failed to reload config")?;
        *self.config.write() = self.config_manager.get().await;
        self.dispatcher.reload()?;
        Ok(())
    }

    /// Kill every live job and give them a moment to settle.
    pub async fn shutdown(self) -> Result<()> {
        let handles: Vec<_> = self
            .registry
            .ids()
            .iter()
            .filter_map(|id| self.registry.get(id))
            .collect();
        if handles.is_empty() {
            return Ok(());
        }

        tracing::debug!(jobs = handles.len(), "cancelling live jobs");
        for handle in &handles {
            handle.cancel();
        }

        let settled = tokio::time::timeout(SHUTDOWN_GRACE, async {
            while handles.iter().any(|h| !h.status().is_terminal()) {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await;
        if settled.is_err() {
            tracing::warn!("Some jobs did not stop within {:?}", SHUTDOWN_GRACE);
        }
        Ok(())
    }
}

/// Initialize the CLI context.
pub async fn initialize(args: &Args) -> Result<CliContext> {
    let config_manager = Arc::new(match &args.config {
        Some(path) => ConfigManager::with_path(path).await,
        None => ConfigManager::new().await,
    }
    .context("Failed to initialize config manager")?);

    // Ensure config file exists (creates template on first run)
    if args.config.is_none() {
        if let Err(e) = config_manager.ensure_config_file().await {
            tracing::warn!("Failed to create config template: {}", e);
        }
    }

    let config = config_manager.get().await;

    // Initialize logging based on verbosity
    let log_level = if args.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let directive = format!("jobshell_lib={}", log_level)
        .parse()
        .with_context(|| format!("Invalid log level: {}", log_level))?;
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(directive))
        .try_init();

    let settings_path = match &args.settings {
        Some(path) => path.clone(),
        None => config_manager.settings_path().await,
    };
    let settings_store = Arc::new(YamlSettingsStore::new(&settings_path));
    if args.verbose {
        eprintln!("[cli] Config: {}", config_manager.path().display());
        eprintln!("[cli] Settings: {}", settings_path.display());
    }

    let (runtime, _) = ChannelRuntime::channel();
    let runtime = Arc::new(runtime);
    let registry = Arc::new(JobRegistry::new());

    let commands: Vec<Arc<dyn Command>> = vec![
        Arc::new(Help::new()),
        Arc::new(
            Set::new(settings_store.clone())
                .with_context(|| format!("Failed to load settings from {}", settings_path.display()))?,
        ),
        Arc::new(Jobs::new(registry.clone())?),
        Arc::new(Sleep::new()?),
        Arc::new(InteractiveShell::bash()),
        Arc::new(InteractiveShell::python()),
    ];

    let history = match &config.shell.history_file {
        Some(path) => History::with_file(path, config.shell.history_limit)
            .with_context(|| format!("Failed to open history file {}", path))?,
        None => History::new(config.shell.history_limit),
    };

    let dispatcher = Dispatcher::new(
        commands,
        registry.clone(),
        runtime.clone(),
        Handle::current(),
    )?
    .with_history(history);

    Ok(CliContext {
        runtime,
        dispatcher: Arc::new(dispatcher),
        registry,
        config_manager,
        config: RwLock::new(config),
        settings_store,
        args: args.clone(),
    })
}
