//! CLI output handling - event receiver loop.
//!
//! Every event goes through the registry first, so `Finish` removes the job
//! before anything is printed, then it is rendered as text or as a JSON line.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;

use crate::events::{Screen, Severity, ShellEvent};
use crate::job::JobRegistry;

/// How events are rendered.
#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    /// One JSON object per line instead of text
    pub json: bool,
    /// Logs below this severity are dropped
    pub min_severity: Severity,
    /// Show job lifecycle (start, status changes)
    pub lifecycle: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            json: false,
            min_severity: Severity::Info,
            lifecycle: false,
        }
    }
}

/// Where a rendered event goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    Stdout(String),
    Stderr(String),
    /// Raw terminal output, written without a trailing newline.
    Raw(String),
}

/// Process events until the channel closes or, when `until` is set, until
/// that job finishes.
pub async fn run_event_loop(
    mut event_rx: mpsc::UnboundedReceiver<ShellEvent>,
    registry: Arc<JobRegistry>,
    options: OutputOptions,
    until: Option<String>,
) -> Result<()> {
    while let Some(event) = event_rx.recv().await {
        registry.apply(&event);

        if let Some(rendered) = render(&event, &options)? {
            emit(rendered)?;
        }

        if let (Some(target), ShellEvent::Finish { job_id }) = (&until, &event) {
            if target == job_id {
                break;
            }
        }
    }

    Ok(())
}

fn emit(rendered: Rendered) -> Result<()> {
    match rendered {
        Rendered::Stdout(line) => {
            println!("{}", line);
            io::stdout().flush()?;
        }
        Rendered::Stderr(line) => eprintln!("{}", line),
        Rendered::Raw(data) => {
            let mut stdout = io::stdout();
            stdout.write_all(data.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

/// Render one event, or `None` when it is filtered out.
pub fn render(event: &ShellEvent, options: &OutputOptions) -> Result<Option<Rendered>> {
    if let ShellEvent::Log { severity, .. } = event {
        if *severity < options.min_severity {
            return Ok(None);
        }
    }

    if options.json {
        return Ok(Some(Rendered::Stdout(serde_json::to_string(event)?)));
    }

    let rendered = match event {
        ShellEvent::Start { job } if options.lifecycle => {
            Rendered::Stderr(format!("[{}] started", job.id()))
        }
        ShellEvent::StatusChange { job_id, status } if options.lifecycle => {
            Rendered::Stderr(format!("[{}] {}", job_id, status))
        }
        ShellEvent::Finish { job_id } if options.lifecycle => {
            Rendered::Stderr(format!("[{}] finished", job_id))
        }
        ShellEvent::Start { .. } | ShellEvent::StatusChange { .. } | ShellEvent::Finish { .. } => {
            return Ok(None)
        }
        ShellEvent::Log {
            source,
            message,
            severity,
        } => {
            let line = format!("[{}] {}: {}", severity, source, message);
            if *severity >= Severity::Warning {
                Rendered::Stderr(line)
            } else {
                Rendered::Stdout(line)
            }
        }
        ShellEvent::PushScreen {
            screen: Screen::Help { text, .. },
        } => Rendered::Stdout(text.clone()),
        ShellEvent::PushScreen {
            screen: Screen::View { view },
        }
        | ShellEvent::AttachView { view, .. } => Rendered::Stderr(format!(
            "[{}] {} attached; send input with /send {} <text>",
            view.id(),
            view.title(),
            view.id()
        )),
        ShellEvent::SettingsChanged {
            section,
            setting,
            value,
        } => Rendered::Stdout(format!("[set] {}.{} = {}", section, setting, value)),
        ShellEvent::Notify { title, message, .. } => {
            Rendered::Stderr(format!("{}: {}", title, message))
        }
        ShellEvent::Output { data, .. } => Rendered::Raw(data.clone()),
        ShellEvent::Reloaded => Rendered::Stderr("[reload] command trees rebuilt".to_string()),
    };

    Ok(Some(rendered))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::tests::Script;
    use crate::job::{Job, JobStatus};

    fn log(severity: Severity) -> ShellEvent {
        ShellEvent::log("sleep", "hello", severity)
    }

    #[test]
    fn test_logs_below_threshold_are_dropped() {
        let options = OutputOptions {
            min_severity: Severity::Warning,
            ..Default::default()
        };
        assert_eq!(render(&log(Severity::Info), &options).unwrap(), None);
        assert_eq!(
            render(&log(Severity::Error), &options).unwrap(),
            Some(Rendered::Stderr("[ERROR] sleep: hello".to_string()))
        );
    }

    #[test]
    fn test_lifecycle_hidden_by_default() {
        let event = ShellEvent::StatusChange {
            job_id: "sleep_000001".into(),
            status: JobStatus::Running,
        };
        assert_eq!(render(&event, &OutputOptions::default()).unwrap(), None);

        let verbose = OutputOptions {
            lifecycle: true,
            ..Default::default()
        };
        assert_eq!(
            render(&event, &verbose).unwrap(),
            Some(Rendered::Stderr("[sleep_000001] Running".to_string()))
        );
    }

    #[test]
    fn test_json_lines() {
        let options = OutputOptions {
            json: true,
            ..Default::default()
        };
        let Some(Rendered::Stdout(line)) = render(&ShellEvent::Reloaded, &options).unwrap() else {
            panic!("expected a stdout line");
        };
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["type"], "reloaded");
    }

    #[tokio::test]
    async fn test_loop_applies_events_and_stops_on_target() {
        let registry = Arc::new(JobRegistry::new());
        let handle = Job::new("sleep_000001", "sleep", Script::Complete).handle();
        registry.add(handle).unwrap();

        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(ShellEvent::StatusChange {
            job_id: "sleep_000001".into(),
            status: JobStatus::Running,
        })
        .unwrap();
        tx.send(ShellEvent::Finish {
            job_id: "sleep_000001".into(),
        })
        .unwrap();

        // The sender stays open: only the target's Finish ends the loop
        run_event_loop(
            rx,
            registry.clone(),
            OutputOptions::default(),
            Some("sleep_000001".into()),
        )
        .await
        .unwrap();
        assert!(registry.is_empty());
        drop(tx);
    }
}
