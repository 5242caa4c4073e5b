//! Entry point for the host: completion queries and submitted lines.
//!
//! The dispatcher owns the registered commands, resolves the first token of a
//! line to one of them and either asks it for suggestions or builds, registers
//! and starts a job. It never waits for a job: `on_submit` returns as soon as
//! the job's task is spawned.

mod history;

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;

use crate::command::{Command, CommandEnv, CommandSummary};
use crate::error::{Result, ShellError};
use crate::events::{Severity, ShellEvent};
use crate::job::{JobHandle, JobRegistry};
use crate::runtime::EventSink;

pub use history::{History, DEFAULT_HISTORY_LIMIT};

/// Outcome of `on_submit`.
#[derive(Debug)]
pub enum Submission {
    /// A job was registered and started.
    Started(JobHandle),
    /// Blank input.
    Ignored,
    /// Unknown command or invalid arguments. Also reported as `Notify`.
    Rejected(ShellError),
}

impl Submission {
    pub fn job(&self) -> Option<&JobHandle> {
        match self {
            Submission::Started(handle) => Some(handle),
            _ => None,
        }
    }
}

/// Split on ASCII space. Empty tokens from repeated spaces are dropped, but a
/// trailing empty token is kept: it marks "completing a new word".
pub fn tokenize(line: &str) -> Vec<&str> {
    let line = line.trim_end_matches(['\r', '\n']);
    let mut tokens: Vec<&str> = line.split(' ').filter(|t| !t.is_empty()).collect();
    if line.ends_with(' ') && !tokens.is_empty() {
        tokens.push("");
    }
    tokens
}

pub struct Dispatcher {
    commands: Vec<Arc<dyn Command>>,
    registry: Arc<JobRegistry>,
    sink: Arc<dyn EventSink>,
    runtime: Handle,
    history: Mutex<History>,
}

impl Dispatcher {
    /// Register `commands` in order. Names must be unique. Every command is
    /// told about the full list once.
    pub fn new(
        commands: Vec<Arc<dyn Command>>,
        registry: Arc<JobRegistry>,
        sink: Arc<dyn EventSink>,
        runtime: Handle,
    ) -> Result<Self> {
        let mut summaries: Vec<CommandSummary> = Vec::with_capacity(commands.len());
        for command in &commands {
            if summaries.iter().any(|s| s.name == command.name()) {
                return Err(ShellError::DuplicateCommand(command.name().to_string()));
            }
            summaries.push(command.summary());
        }
        for command in &commands {
            command.bind_commands(&summaries)?;
        }

        tracing::debug!(commands = commands.len(), "dispatcher ready");
        Ok(Self {
            commands,
            registry,
            sink,
            runtime,
            history: Mutex::new(History::default()),
        })
    }

    pub fn with_history(self, history: History) -> Self {
        *self.history.lock() = history;
        self
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    pub fn command(&self, name: &str) -> Option<&Arc<dyn Command>> {
        self.commands.iter().find(|command| command.name() == name)
    }

    /// Command names in registration order.
    pub fn command_names(&self) -> Vec<String> {
        self.commands
            .iter()
            .map(|command| command.name().to_string())
            .collect()
    }

    /// Completion candidates for the word being typed at the end of `line`.
    pub fn on_partial_input(&self, line: &str) -> Vec<String> {
        let tokens = tokenize(line);

        match tokens.as_slice() {
            [] => self.command_names(),
            [prefix] => self
                .command_names()
                .into_iter()
                .filter(|name| name.starts_with(prefix))
                .collect(),
            [name, path @ .., prefix] => {
                let Some(command) = self.command(name) else {
                    return Vec::new();
                };
                let path: Vec<String> = path.iter().map(|t| t.to_string()).collect();
                command
                    .suggest(&path)
                    .into_iter()
                    .filter(|candidate| candidate.starts_with(prefix))
                    .collect()
            }
        }
    }

    /// Resolve, validate, register and start. Never blocks on the job.
    pub fn on_submit(&self, line: &str) -> Submission {
        let tokens: Vec<String> = tokenize(line)
            .into_iter()
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        let Some((name, args)) = tokens.split_first() else {
            return Submission::Ignored;
        };

        self.history.lock().push(line);

        match self.start_job(name, args) {
            Ok(handle) => Submission::Started(handle),
            Err(e) => {
                tracing::debug!(%name, "submission rejected: {}", e);
                if let Err(emit_err) = self.sink.emit(ShellEvent::Notify {
                    title: e.title().to_string(),
                    message: e.to_string(),
                    severity: Severity::Error,
                }) {
                    tracing::warn!("failed to report rejection: {}", emit_err);
                }
                Submission::Rejected(e)
            }
        }
    }

    fn start_job(&self, name: &str, args: &[String]) -> Result<JobHandle> {
        let command = self
            .command(name)
            .ok_or_else(|| ShellError::UnknownCommand(name.to_string()))?;

        let env = CommandEnv::new(&self.commands, &self.registry);
        let job = command.create_job(args, &env)?;
        let handle = job.handle();

        self.registry.add(handle.clone())?;
        job.start(self.sink.clone(), &self.runtime);
        Ok(handle)
    }

    /// Rebuild every command's tree from its collaborators.
    pub fn reload(&self) -> Result<()> {
        for command in &self.commands {
            command.reload()?;
        }
        tracing::info!("command trees reloaded");
        self.sink.emit(ShellEvent::Reloaded)?;
        Ok(())
    }

    /// Submitted lines, newest first.
    pub fn history(&self) -> Vec<String> {
        self.history.lock().entries()
    }
}
