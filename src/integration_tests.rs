//! End-to-end scenarios through the dispatcher.
//!
//! Each test wires the built-in commands to a `ChannelRuntime` and drains the
//! event stream the way a host would: every event is applied to the registry
//! before it is inspected.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::command::{Command, Help, Jobs, Set, Sleep};
use crate::dispatcher::{Dispatcher, Submission};
use crate::error::ShellError;
use crate::events::{Screen, Severity, ShellEvent};
use crate::job::tests::statuses;
use crate::job::{JobRegistry, JobStatus};
use crate::runtime::ChannelRuntime;
use crate::settings::{MemorySettingsStore, SettingsStore};

const SETTINGS: &str = r#"
sectionA:
  opt1:
    description: Engine speed
    options: [fast, slow]
    value: fast
  opt2:
    options: ["on", "off"]
    value: "on"
"#;

struct Harness {
    dispatcher: Dispatcher,
    registry: Arc<JobRegistry>,
    store: Arc<MemorySettingsStore>,
    events: mpsc::UnboundedReceiver<ShellEvent>,
}

impl Harness {
    fn new() -> Self {
        let store = Arc::new(MemorySettingsStore::from_yaml(SETTINGS).unwrap());
        let registry = Arc::new(JobRegistry::new());
        let (runtime, events) = ChannelRuntime::channel();

        let commands: Vec<Arc<dyn Command>> = vec![
            Arc::new(Help::new()),
            Arc::new(Set::new(store.clone()).unwrap()),
            Arc::new(Jobs::new(registry.clone()).unwrap()),
            Arc::new(Sleep::new().unwrap()),
        ];
        let dispatcher = Dispatcher::new(
            commands,
            registry.clone(),
            Arc::new(runtime),
            Handle::current(),
        )
        .unwrap();

        Self {
            dispatcher,
            registry,
            store,
            events,
        }
    }

    fn submit(&self, line: &str) -> String {
        match self.dispatcher.on_submit(line) {
            Submission::Started(handle) => handle.id().to_string(),
            other => panic!("expected '{}' to start a job, got {:?}", line, other),
        }
    }

    /// Receive events until `job_ids` have all finished.
    async fn settle(&mut self, job_ids: &[&str]) -> Vec<ShellEvent> {
        let mut pending: Vec<&str> = job_ids.to_vec();
        let mut events = Vec::new();
        while !pending.is_empty() {
            let event = self.events.recv().await.expect("event stream closed");
            self.registry.apply(&event);
            if let ShellEvent::Finish { job_id } = &event {
                pending.retain(|id| id != job_id);
            }
            events.push(event);
        }
        events
    }
}

fn of_job(events: &[ShellEvent], job_id: &str) -> Vec<ShellEvent> {
    events
        .iter()
        .filter(|e| e.job_id() == Some(job_id))
        .cloned()
        .collect()
}

#[tokio::test]
async fn completion_walks_command_trees() {
    let h = Harness::new();

    assert_eq!(
        h.dispatcher.on_partial_input(""),
        vec!["help", "set", "jobs", "sleep"]
    );
    assert_eq!(h.dispatcher.on_partial_input("s"), vec!["set", "sleep"]);
    assert_eq!(
        h.dispatcher.on_partial_input("set sectionA opt1 "),
        vec!["fast", "slow"]
    );
    assert_eq!(h.dispatcher.on_partial_input("set sectionA o"), vec!["opt1", "opt2"]);
    assert_eq!(
        h.dispatcher.on_partial_input("help "),
        vec!["help", "set", "jobs", "sleep"]
    );
    assert_eq!(h.dispatcher.on_partial_input("jobs k"), vec!["kill"]);
    assert!(h.dispatcher.on_partial_input("nope ").is_empty());
}

#[tokio::test(start_paused = true)]
async fn sleep_runs_to_completion() {
    let mut h = Harness::new();
    let started = tokio::time::Instant::now();

    let id = h.submit("sleep 3");
    assert!(id.starts_with("sleep_"));
    assert!(h.registry.contains(&id));

    let events = h.settle(&[&id]).await;
    assert!(started.elapsed() >= Duration::from_secs(3));

    assert!(matches!(events.first(), Some(ShellEvent::Start { .. })));
    assert!(matches!(events.last(), Some(ShellEvent::Finish { .. })));
    assert_eq!(
        statuses(&events),
        vec![JobStatus::Running, JobStatus::Completed]
    );
    assert!(h.registry.is_empty());
}

#[tokio::test]
async fn set_persists_a_valid_value() {
    let mut h = Harness::new();

    let id = h.submit("set sectionA opt1 slow");
    let events = h.settle(&[&id]).await;

    assert_eq!(
        statuses(&events),
        vec![JobStatus::Running, JobStatus::Completed]
    );
    assert!(events.iter().any(|e| matches!(
        e,
        ShellEvent::SettingsChanged { section, setting, value }
            if section == "sectionA" && setting == "opt1" && value == "slow"
    )));
    assert_eq!(h.store.get_value("sectionA", "opt1").unwrap().as_deref(), Some("slow"));
    assert_eq!(h.store.write_count(), 1);
}

#[tokio::test]
async fn set_with_unknown_value_fails_without_writing() {
    let mut h = Harness::new();

    let id = h.submit("set sectionA opt1 medium");
    let events = h.settle(&[&id]).await;

    assert_eq!(statuses(&events), vec![JobStatus::Running, JobStatus::Error]);
    assert!(events.iter().any(|e| matches!(
        e,
        ShellEvent::Log { message, severity: Severity::Error, .. } if message.contains("medium")
    )));
    assert_eq!(h.store.write_count(), 0);
    assert_eq!(h.store.get_value("sectionA", "opt1").unwrap().as_deref(), Some("fast"));
}

#[tokio::test]
async fn jobs_kill_cancels_a_running_job() {
    let mut h = Harness::new();

    let sleeper = h.submit("sleep 600");
    let killer = h.submit(&format!("jobs kill {}", sleeper));
    let events = h.settle(&[&sleeper, &killer]).await;

    let sleeper_events = of_job(&events, &sleeper);
    assert_eq!(
        statuses(&sleeper_events),
        vec![JobStatus::Running, JobStatus::Cancelled]
    );
    let finishes = sleeper_events
        .iter()
        .filter(|e| matches!(e, ShellEvent::Finish { .. }))
        .count();
    assert_eq!(finishes, 1);

    assert_eq!(
        statuses(&of_job(&events, &killer)),
        vec![JobStatus::Running, JobStatus::Completed]
    );
    assert!(h.registry.is_empty());
}

#[tokio::test]
async fn jobs_kill_of_unknown_job_is_an_error() {
    let mut h = Harness::new();

    let id = h.submit("jobs kill sleep_999999");
    let events = h.settle(&[&id]).await;
    assert_eq!(statuses(&events), vec![JobStatus::Running, JobStatus::Error]);
}

#[tokio::test]
async fn help_pushes_a_help_screen() {
    let mut h = Harness::new();

    let id = h.submit("help sleep");
    let events = h.settle(&[&id]).await;
    let text = events
        .iter()
        .find_map(|e| match e {
            ShellEvent::PushScreen {
                screen: Screen::Help { command, text },
            } if command == "sleep" => Some(text.clone()),
            _ => None,
        })
        .expect("help screen");
    assert!(text.contains("Sleep for x seconds."));
    assert!(text.contains("seconds"));
}

#[tokio::test]
async fn rejected_lines_are_notified() {
    let mut h = Harness::new();

    let unknown = h.dispatcher.on_submit("frobnicate now");
    assert!(matches!(
        unknown,
        Submission::Rejected(ShellError::UnknownCommand(ref name)) if name == "frobnicate"
    ));
    let Some(ShellEvent::Notify { title, severity, .. }) = h.events.recv().await else {
        panic!("expected a notification");
    };
    assert_eq!(title, "Invalid Command");
    assert_eq!(severity, Severity::Error);

    let invalid = h.dispatcher.on_submit("set sectionB opt1 fast");
    assert!(matches!(
        invalid,
        Submission::Rejected(ShellError::InvalidArgument(_))
    ));
    assert!(matches!(
        h.events.recv().await,
        Some(ShellEvent::Notify { .. })
    ));

    assert!(matches!(
        h.dispatcher.on_submit("sleep soon"),
        Submission::Rejected(ShellError::InvalidArgument(_))
    ));
    assert!(h.registry.is_empty());
}

#[tokio::test]
async fn blank_input_is_ignored() {
    let h = Harness::new();

    assert!(matches!(h.dispatcher.on_submit(""), Submission::Ignored));
    assert!(matches!(h.dispatcher.on_submit("   \n"), Submission::Ignored));
    assert!(h.dispatcher.history().is_empty());
}

#[tokio::test]
async fn reload_rebuilds_trees_from_the_store() {
    let mut h = Harness::new();

    h.store
        .replace("sectionB:\n  opt9:\n    options: [a, b]\n    value: a\n")
        .unwrap();
    assert_eq!(h.dispatcher.on_partial_input("set "), vec!["sectionA"]);

    h.dispatcher.reload().unwrap();
    assert!(matches!(h.events.recv().await, Some(ShellEvent::Reloaded)));
    assert_eq!(h.dispatcher.on_partial_input("set "), vec!["sectionB"]);
    assert_eq!(h.dispatcher.on_partial_input("set sectionB opt9 "), vec!["a", "b"]);
}

#[tokio::test]
async fn history_records_submitted_lines() {
    let mut h = Harness::new();

    let id = h.submit("sleep 0");
    h.dispatcher.on_submit("nope");
    h.settle(&[&id]).await;

    assert_eq!(h.dispatcher.history(), vec!["nope", "sleep 0"]);
}
