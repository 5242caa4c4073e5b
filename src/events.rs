use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::job::{JobHandle, JobStatus, ViewHandle};

/// Log severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        };
        f.write_str(label)
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Severity::Debug),
            "info" => Ok(Severity::Info),
            "warn" | "warning" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            other => Err(format!("unknown severity: {}", other)),
        }
    }
}

/// A surface the host should display.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Screen {
    /// Rendered help for a command (Markdown).
    Help { command: String, text: String },
    /// Interactive view owned by a running job.
    View { view: ViewHandle },
}

/// Events emitted by jobs and the dispatcher, consumed by the host.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShellEvent {
    /// A job was started. Always the first event of a job.
    Start { job: JobHandle },

    /// A job changed status.
    StatusChange { job_id: String, status: JobStatus },

    /// A job's task is over. Emitted exactly once, last.
    Finish { job_id: String },

    Log {
        source: String,
        message: String,
        severity: Severity,
    },

    PushScreen { screen: Screen },

    /// A setting was persisted by `set`.
    SettingsChanged {
        section: String,
        setting: String,
        value: String,
    },

    /// A rejected submission (unknown command, invalid arguments).
    Notify {
        title: String,
        message: String,
        severity: Severity,
    },

    /// Re-surface the view of a running job.
    AttachView { job_id: String, view: ViewHandle },

    /// Output produced by an interactive job.
    Output { job_id: String, data: String },

    /// Command trees were rebuilt from their collaborators.
    Reloaded,
}

impl ShellEvent {
    pub fn log(source: impl Into<String>, message: impl Into<String>, severity: Severity) -> Self {
        ShellEvent::Log {
            source: source.into(),
            message: message.into(),
            severity,
        }
    }

    /// The job an event belongs to, if any.
    pub fn job_id(&self) -> Option<&str> {
        match self {
            ShellEvent::Start { job } => Some(job.id()),
            ShellEvent::StatusChange { job_id, .. }
            | ShellEvent::Finish { job_id }
            | ShellEvent::AttachView { job_id, .. }
            | ShellEvent::Output { job_id, .. } => Some(job_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering_and_parse() {
        assert!(Severity::Debug < Severity::Info);
        assert!(Severity::Warning < Severity::Error);
        assert_eq!("warn".parse::<Severity>().unwrap(), Severity::Warning);
        assert_eq!("ERROR".parse::<Severity>().unwrap(), Severity::Error);
        assert!("loud".parse::<Severity>().is_err());
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = ShellEvent::StatusChange {
            job_id: "sleep_000001".to_string(),
            status: JobStatus::Completed,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "status_change",
                "job_id": "sleep_000001",
                "status": "completed"
            })
        );

        let log = ShellEvent::log("set", "hello", Severity::Info);
        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(json["severity"], "INFO");
        assert_eq!(log.job_id(), None);
    }
}
