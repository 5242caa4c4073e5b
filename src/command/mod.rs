//! Commands: a name, a definition tree and a job factory.
//!
//! Every command owns a [`CommandTree`] describing its grammar. The tree drives
//! completion and help; [`Command::create_job`] validates the submitted tokens
//! and hands back a pending [`Job`] for the dispatcher to start.
//!
//! Built-in commands:
//! - [`Help`]: show the help text of another command
//! - [`Set`]: edit a setting in the settings store
//! - [`Jobs`]: list, attach to or kill live jobs
//! - [`Sleep`]: wait for a number of seconds
//! - [`InteractiveShell`]: `bash`/`python` sub-shells in a PTY

mod help;
mod interactive;
mod jobs;
mod set;
mod sleep;

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use crate::error::{Result, ShellError};
use crate::job::id::unique_job_id;
use crate::job::{Job, JobBody, JobRegistry};
use crate::tree::{CommandTree, ParsedArgs};

pub use help::Help;
pub use interactive::InteractiveShell;
pub use jobs::Jobs;
pub use set::Set;
pub use sleep::Sleep;

/// Name and one-line description of a registered command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandSummary {
    pub name: String,
    pub description: String,
}

/// A named command the dispatcher can run.
pub trait Command: Send + Sync {
    /// Lowercase name typed by the user. Never changes.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// The grammar of the command. Locked so `reload` can rebuild it.
    fn definition(&self) -> &RwLock<CommandTree>;

    /// Candidate next tokens after `path` (tokens after the command name).
    fn suggest(&self, path: &[String]) -> Vec<String> {
        self.definition().read().suggest(path)
    }

    /// Markdown help: the description followed by the rendered tree.
    fn help(&self) -> String {
        let tree = self.definition().read();
        format!(
            "{}\n\n{}",
            self.description(),
            tree.describe(CommandTree::ROOT)
        )
    }

    /// Check `args` against the definition tree.
    fn validate(&self, args: &[String]) -> Result<ParsedArgs> {
        self.definition().read().validate(args)
    }

    /// Build a pending job for `args`. Invalid arguments yield no job.
    fn create_job(&self, args: &[String], env: &CommandEnv<'_>) -> Result<Job>;

    /// Receive the full command list once every command is registered.
    fn bind_commands(&self, _commands: &[CommandSummary]) -> Result<()> {
        Ok(())
    }

    /// Rebuild the definition tree from its sources.
    fn reload(&self) -> Result<()> {
        Ok(())
    }

    fn summary(&self) -> CommandSummary {
        CommandSummary {
            name: self.name().to_string(),
            description: self.description().to_string(),
        }
    }
}

/// What a command may consult while building a job.
pub struct CommandEnv<'a> {
    commands: &'a [Arc<dyn Command>],
    registry: &'a JobRegistry,
}

impl<'a> CommandEnv<'a> {
    pub fn new(commands: &'a [Arc<dyn Command>], registry: &'a JobRegistry) -> Self {
        Self { commands, registry }
    }

    /// Registered command called `name`.
    pub fn command(&self, name: &str) -> Option<&'a Arc<dyn Command>> {
        self.commands.iter().find(|command| command.name() == name)
    }

    pub fn registry(&self) -> &'a JobRegistry {
        self.registry
    }

    /// Wrap `body` in a job with an id no live job uses.
    pub fn new_job(&self, command: &str, body: impl JobBody) -> Result<Job> {
        let id = unique_job_id(command, |candidate| self.registry.contains(candidate))
            .ok_or_else(|| {
                ShellError::JobExecution(format!("no free job id for command {}", command))
            })?;
        Ok(Job::new(id, command, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::tests::Script;
    use crate::job::JobStatus;
    use crate::tree::CommandNode;

    /// Static command with a two-level grammar.
    struct Echo {
        tree: RwLock<CommandTree>,
    }

    impl Echo {
        fn new() -> Self {
            let mut tree = CommandTree::new(CommandNode::subcommand("echo"));
            let loud = tree
                .add_child(
                    CommandNode::subcommand("loud").with_description("Shout it"),
                    None,
                )
                .unwrap();
            tree.add_child(CommandNode::argument("text"), Some(loud))
                .unwrap();
            Self {
                tree: RwLock::new(tree),
            }
        }
    }

    impl Command for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Print text."
        }

        fn definition(&self) -> &RwLock<CommandTree> {
            &self.tree
        }

        fn create_job(&self, args: &[String], env: &CommandEnv<'_>) -> Result<Job> {
            self.validate(args)?;
            env.new_job(self.name(), Script::Complete)
        }
    }

    fn args(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_default_suggest_and_help() {
        let echo = Echo::new();
        assert_eq!(echo.suggest(&[]), vec!["loud"]);
        assert_eq!(echo.suggest(&args(&["loud"])), vec!["text"]);

        let help = echo.help();
        assert!(help.starts_with("Print text.\n\n"));
        assert!(help.contains("loud"));
        assert!(help.contains("Shout it"));
    }

    #[test]
    fn test_create_job_validates() {
        let echo = Echo::new();
        let registry = JobRegistry::new();
        let env = CommandEnv::new(&[], &registry);

        let err = echo.create_job(&args(&["quiet"]), &env).unwrap_err();
        assert!(matches!(err, ShellError::InvalidArgument(_)));

        let job = echo.create_job(&args(&["loud", "hi"]), &env).unwrap();
        assert!(job.id().starts_with("echo_"));
        assert_eq!(job.status(), JobStatus::Pending);
    }

    #[test]
    fn test_env_looks_up_commands() {
        let commands: Vec<Arc<dyn Command>> = vec![Arc::new(Echo::new())];
        let registry = JobRegistry::new();
        let env = CommandEnv::new(&commands, &registry);
        assert!(env.command("echo").is_some());
        assert!(env.command("nope").is_none());
        assert_eq!(
            commands[0].summary(),
            CommandSummary {
                name: "echo".into(),
                description: "Print text.".into()
            }
        );
    }
}
