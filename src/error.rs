use serde::Serialize;
use thiserror::Error;

use crate::job::JobStatus;

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("Duplicate name '{name}' under parent '{parent}'")]
    DuplicateName { name: String, parent: String },

    #[error("Parent node not found: {0}")]
    ParentNotFound(crate::tree::NodeId),

    #[error("Command already registered: {0}")]
    DuplicateCommand(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Job id already registered: {0}")]
    DuplicateJobId(String),

    #[error("Invalid status transition for {job_id}: {from} -> {to}")]
    InvalidTransition {
        job_id: String,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Job failed: {0}")]
    JobExecution(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Runtime error: {0}")]
    Runtime(#[from] crate::runtime::RuntimeError),
}

impl ShellError {
    /// Short title used when a rejection is reported to the host.
    pub fn title(&self) -> &'static str {
        match self {
            ShellError::UnknownCommand(_) => "Invalid Command",
            ShellError::InvalidArgument(_) => "Invalid Argument",
            ShellError::Settings(_) | ShellError::Io(_) => "Settings",
            _ => "Shell",
        }
    }
}

// Hosts forward rejections as JSON
impl Serialize for ShellError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ShellError>;
