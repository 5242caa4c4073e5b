use async_trait::async_trait;
use parking_lot::RwLock;

use super::{Command, CommandEnv, CommandSummary};
use crate::error::{Result, ShellError};
use crate::events::Screen;
use crate::job::{Job, JobBody, JobContext};
use crate::tree::{CommandNode, CommandTree};

/// `help [command]`: push the help screen of a command.
pub struct Help {
    tree: RwLock<CommandTree>,
}

impl Help {
    pub fn new() -> Self {
        Self {
            tree: RwLock::new(CommandTree::new(CommandNode::subcommand("help"))),
        }
    }
}

impl Default for Help {
    fn default() -> Self {
        Self::new()
    }
}

impl Command for Help {
    fn name(&self) -> &str {
        "help"
    }

    fn description(&self) -> &str {
        "Display the help for a given command."
    }

    fn definition(&self) -> &RwLock<CommandTree> {
        &self.tree
    }

    /// One sub-command per registered command, so `help <TAB>` lists them.
    fn bind_commands(&self, commands: &[CommandSummary]) -> Result<()> {
        let mut tree = self.tree.write();
        tree.reset();
        for summary in commands {
            tree.add_child(
                CommandNode::subcommand(&summary.name).with_description(&summary.description),
                None,
            )?;
        }
        Ok(())
    }

    /// Only the header and description; listing every command here would
    /// duplicate the completion list.
    fn help(&self) -> String {
        format!(
            "### Command: {}\n**Description:** {}",
            self.name(),
            self.description()
        )
    }

    fn create_job(&self, args: &[String], env: &CommandEnv<'_>) -> Result<Job> {
        let target = if args.is_empty() {
            self.name().to_string()
        } else {
            self.validate(args)?;
            args[0].clone()
        };

        let command = env
            .command(&target)
            .ok_or_else(|| ShellError::UnknownCommand(target.clone()))?;
        let text = command.help();

        env.new_job(
            self.name(),
            ShowHelp {
                command: target,
                text,
            },
        )
    }
}

struct ShowHelp {
    command: String,
    text: String,
}

#[async_trait]
impl JobBody for ShowHelp {
    async fn execute(&mut self, ctx: &JobContext) -> anyhow::Result<()> {
        ctx.running()?;
        ctx.push_screen(Screen::Help {
            command: std::mem::take(&mut self.command),
            text: std::mem::take(&mut self.text),
        });
        ctx.completed()?;
        Ok(())
    }
}
