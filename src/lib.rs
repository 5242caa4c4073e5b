//! Embeddable command shell runtime.
//!
//! A host feeds raw input lines to a [`Dispatcher`]. Each registered
//! [`Command`] owns a [`CommandTree`] that drives completion and argument
//! validation; submitting a line turns it into a [`job::Job`] that runs on
//! the tokio runtime and reports back through an [`EventSink`].
//!
//! The `cli` feature adds a line-oriented host (`jobshell` binary).

pub mod command;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod job;
pub mod runtime;
pub mod settings;
pub mod tree;

#[cfg(feature = "cli")]
pub mod cli;

#[cfg(test)]
mod integration_tests;

pub use command::{Command, CommandEnv, CommandSummary};
pub use dispatcher::{tokenize, Dispatcher, History, Submission};
pub use error::{Result, ShellError};
pub use events::{Screen, Severity, ShellEvent};
pub use job::{Job, JobBody, JobContext, JobHandle, JobRegistry, JobStatus, ViewHandle};
pub use runtime::{ChannelRuntime, EventSink};
pub use settings::{MemorySettingsStore, SettingsDocument, SettingsStore, YamlSettingsStore};
pub use tree::{CommandTree, NodeKind};
