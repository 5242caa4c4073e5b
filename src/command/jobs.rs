use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{Command, CommandEnv};
use crate::error::{Result, ShellError};
use crate::job::{Job, JobBody, JobContext, JobRegistry};
use crate::tree::{CommandNode, CommandTree};

const LIST: &str = "list";
const ATTACH: &str = "attach";
const KILL: &str = "kill";
const JOB_ID: &str = "job_id";

/// `jobs list | attach <id> | kill <id>`: manage live jobs.
pub struct Jobs {
    registry: Arc<JobRegistry>,
    tree: RwLock<CommandTree>,
}

impl Jobs {
    pub fn new(registry: Arc<JobRegistry>) -> Result<Self> {
        let mut tree = CommandTree::new(CommandNode::subcommand("jobs"));
        tree.add_child(
            CommandNode::subcommand(LIST).with_description("List the running jobs."),
            None,
        )?;
        let attach = tree.add_child(
            CommandNode::subcommand(ATTACH).with_description("Attach to the job's screen."),
            None,
        )?;
        tree.add_child(CommandNode::argument(JOB_ID), Some(attach))?;
        let kill = tree.add_child(
            CommandNode::subcommand(KILL).with_description("Kill the job."),
            None,
        )?;
        tree.add_child(CommandNode::argument(JOB_ID), Some(kill))?;

        Ok(Self {
            registry,
            tree: RwLock::new(tree),
        })
    }
}

impl Command for Jobs {
    fn name(&self) -> &str {
        "jobs"
    }

    fn description(&self) -> &str {
        "Manage jobs."
    }

    fn definition(&self) -> &RwLock<CommandTree> {
        &self.tree
    }

    /// Live job ids after `attach` and `kill` instead of the placeholder.
    fn suggest(&self, path: &[String]) -> Vec<String> {
        match path {
            [action] if action == ATTACH || action == KILL => self.registry.ids(),
            _ => self.tree.read().suggest(path),
        }
    }

    fn create_job(&self, args: &[String], env: &CommandEnv<'_>) -> Result<Job> {
        let parsed = self.validate(args)?;
        let action = match (parsed.path.first().map(String::as_str), parsed.get(JOB_ID)) {
            (Some(LIST), _) => Action::List,
            (Some(ATTACH), Some(id)) => Action::Attach(id.to_string()),
            (Some(KILL), Some(id)) => Action::Kill(id.to_string()),
            _ => {
                return Err(ShellError::InvalidArgument(format!(
                    "invalid jobs invocation: {}",
                    args.join(" ")
                )))
            }
        };

        env.new_job(
            self.name(),
            JobsJob {
                registry: self.registry.clone(),
                action,
            },
        )
    }
}

enum Action {
    List,
    Attach(String),
    Kill(String),
}

struct JobsJob {
    registry: Arc<JobRegistry>,
    action: Action,
}

#[async_trait]
impl JobBody for JobsJob {
    async fn execute(&mut self, ctx: &JobContext) -> anyhow::Result<()> {
        ctx.running()?;

        match &self.action {
            Action::List => {
                let jobs = self.registry.list();
                let others: Vec<_> = jobs.iter().filter(|job| job.id != ctx.id()).collect();
                if others.is_empty() {
                    ctx.info("No running jobs.");
                }
                for job in others {
                    let view = if job.has_view { " [view]" } else { "" };
                    ctx.info(format!("{}  {}{}", job.id, job.status, view));
                }
            }
            Action::Attach(job_id) => {
                if !self.registry.contains(job_id) {
                    ctx.fail(format!("No job with id {}", job_id))?;
                    return Ok(());
                }
                if self.registry.attach_view(job_id, ctx.sink().as_ref()).is_none() {
                    ctx.fail(format!("Job {} has no screen to attach to", job_id))?;
                    return Ok(());
                }
            }
            Action::Kill(job_id) => {
                if !self.registry.kill(job_id) {
                    ctx.fail(format!("No job with id {}", job_id))?;
                    return Ok(());
                }
                ctx.info(format!("Cancellation requested for {}", job_id));
            }
        }

        ctx.completed()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tokio::runtime::Handle;

    use super::*;
    use crate::events::ShellEvent;
    use crate::job::tests::{drain, statuses, Script};
    use crate::job::{JobStatus, ViewHandle};
    use crate::runtime::ChannelRuntime;

    fn args(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    async fn run(jobs: &Jobs, registry: &JobRegistry, tokens: &[&str]) -> Vec<ShellEvent> {
        let env = CommandEnv::new(&[], registry);
        let job = jobs.create_job(&args(tokens), &env).unwrap();
        let (runtime, mut rx) = ChannelRuntime::channel();
        job.start(Arc::new(runtime), &Handle::current());
        drain(&mut rx).await
    }

    #[test]
    fn test_suggests_live_ids() {
        let registry = Arc::new(JobRegistry::new());
        let jobs = Jobs::new(registry.clone()).unwrap();
        registry
            .add(Job::new("sleep_000001", "sleep", Script::Complete).handle())
            .unwrap();

        assert_eq!(jobs.suggest(&[]), vec!["list", "attach", "kill"]);
        assert_eq!(jobs.suggest(&args(&["kill"])), vec!["sleep_000001"]);
        assert!(jobs.suggest(&args(&["list"])).is_empty());
    }

    #[test]
    fn test_rejects_missing_id() {
        let registry = Arc::new(JobRegistry::new());
        let jobs = Jobs::new(registry.clone()).unwrap();
        let env = CommandEnv::new(&[], &registry);
        assert!(matches!(
            jobs.create_job(&args(&["kill"]), &env),
            Err(ShellError::InvalidArgument(_))
        ));
        assert!(jobs.create_job(&args(&["stop", "x"]), &env).is_err());
    }

    #[tokio::test]
    async fn test_kill_cancels_target() {
        let registry = Arc::new(JobRegistry::new());
        let jobs = Jobs::new(registry.clone()).unwrap();
        let target = Job::new("sleep_000001", "sleep", Script::WaitForCancel).handle();
        registry.add(target.clone()).unwrap();

        let events = run(&jobs, &registry, &["kill", "sleep_000001"]).await;
        assert!(target.is_cancel_requested());
        assert_eq!(
            statuses(&events),
            vec![JobStatus::Running, JobStatus::Completed]
        );
    }

    #[tokio::test]
    async fn test_kill_unknown_is_an_error() {
        let registry = Arc::new(JobRegistry::new());
        let jobs = Jobs::new(registry.clone()).unwrap();
        let events = run(&jobs, &registry, &["kill", "sleep_000009"]).await;
        assert_eq!(statuses(&events), vec![JobStatus::Running, JobStatus::Error]);
    }

    #[tokio::test]
    async fn test_list_logs_each_job() {
        let registry = Arc::new(JobRegistry::new());
        let jobs = Jobs::new(registry.clone()).unwrap();
        registry
            .add(Job::new("sleep_000001", "sleep", Script::Complete).handle())
            .unwrap();

        let events = run(&jobs, &registry, &["list"]).await;
        assert!(events.iter().any(|e| matches!(
            e,
            ShellEvent::Log { message, .. } if message.starts_with("sleep_000001")
        )));
    }

    #[tokio::test]
    async fn test_attach_surfaces_view() {
        let registry = Arc::new(JobRegistry::new());
        let jobs = Jobs::new(registry.clone()).unwrap();

        // Run a job that publishes a view, then attach to it
        let (runtime, mut rx) = ChannelRuntime::channel();
        let runtime = Arc::new(runtime);
        let viewer = Job::new("bash_000001", "bash", PublishView);
        let handle = viewer.handle();
        registry.add(handle.clone()).unwrap();
        viewer.start(runtime.clone(), &Handle::current());
        loop {
            if let Some(ShellEvent::StatusChange {
                status: JobStatus::Running,
                ..
            }) = rx.recv().await
            {
                break;
            }
        }

        let events = run(&jobs, &registry, &["attach", "bash_000001"]).await;
        assert!(events.iter().any(|e| matches!(
            e,
            ShellEvent::AttachView { job_id, .. } if job_id == "bash_000001"
        )));
        handle.cancel();
    }

    struct PublishView;

    #[async_trait]
    impl JobBody for PublishView {
        async fn execute(&mut self, ctx: &JobContext) -> anyhow::Result<()> {
            ctx.attach_view(ViewHandle::new(ctx.id(), "view"));
            ctx.running()?;
            ctx.wait_for_cancel().await;
            ctx.release_view();
            ctx.cancelled()?;
            Ok(())
        }
    }
}
