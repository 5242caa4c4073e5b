use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{Command, CommandEnv};
use crate::error::{Result, ShellError};
use crate::job::{Job, JobBody, JobContext};
use crate::tree::{CommandNode, CommandTree};

/// `sleep <seconds>`: wait, or stop early when killed.
pub struct Sleep {
    tree: RwLock<CommandTree>,
}

impl Sleep {
    pub fn new() -> Result<Self> {
        let mut tree = CommandTree::new(CommandNode::subcommand("sleep"));
        tree.add_child(
            CommandNode::argument("seconds").with_description("How long to sleep, fractions allowed."),
            None,
        )?;
        Ok(Self {
            tree: RwLock::new(tree),
        })
    }
}

fn parse_seconds(token: &str) -> Result<Duration> {
    token
        .parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .ok_or_else(|| {
            ShellError::InvalidArgument(format!("'{}' is not a number of seconds", token))
        })
}

impl Command for Sleep {
    fn name(&self) -> &str {
        "sleep"
    }

    fn description(&self) -> &str {
        "Sleep for x seconds."
    }

    fn definition(&self) -> &RwLock<CommandTree> {
        &self.tree
    }

    fn create_job(&self, args: &[String], env: &CommandEnv<'_>) -> Result<Job> {
        let parsed = self.validate(args)?;
        let seconds = parsed.get("seconds").unwrap_or_default();
        let duration = parse_seconds(seconds)?;
        env.new_job(self.name(), SleepJob { duration })
    }
}

struct SleepJob {
    duration: Duration,
}

#[async_trait]
impl JobBody for SleepJob {
    async fn execute(&mut self, ctx: &JobContext) -> anyhow::Result<()> {
        ctx.running()?;
        ctx.debug(format!("sleeping for {:?}", self.duration));

        tokio::select! {
            _ = tokio::time::sleep(self.duration) => ctx.completed()?,
            _ = ctx.wait_for_cancel() => ctx.cancelled()?,
        }
        Ok(())
    }
}
