use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{Command, CommandEnv};
use crate::error::{Result, ShellError};
use crate::events::ShellEvent;
use crate::job::{Job, JobBody, JobContext};
use crate::settings::SettingsStore;
use crate::tree::{CommandNode, CommandTree, NodeKind};

/// `set <section> <setting> <value>`: persist a setting.
///
/// The grammar mirrors the settings store: one sub-command per section, one
/// option per setting. Value membership is checked by the job against the
/// store as it is when the job runs, so an out-of-date tree never lets a bad
/// value through.
pub struct Set {
    store: Arc<dyn SettingsStore>,
    tree: RwLock<CommandTree>,
}

impl Set {
    pub fn new(store: Arc<dyn SettingsStore>) -> Result<Self> {
        let set = Self {
            store,
            tree: RwLock::new(CommandTree::new(CommandNode::subcommand("set"))),
        };
        set.reload()?;
        Ok(set)
    }
}

impl Command for Set {
    fn name(&self) -> &str {
        "set"
    }

    fn description(&self) -> &str {
        "Set Shell Variables and update config.yaml"
    }

    fn definition(&self) -> &RwLock<CommandTree> {
        &self.tree
    }

    fn create_job(&self, args: &[String], env: &CommandEnv<'_>) -> Result<Job> {
        let [section, setting, value] = args else {
            return Err(ShellError::InvalidArgument(format!(
                "usage: set <section> <setting> <value> (got {} arguments)",
                args.len()
            )));
        };

        {
            let tree = self.tree.read();
            let node = tree
                .find(&args[..2])
                .and_then(|id| tree.node(id))
                .filter(|node| node.kind == NodeKind::Option);
            if node.is_none() {
                return Err(ShellError::InvalidArgument(format!(
                    "unknown setting: {}.{}",
                    section, setting
                )));
            }
        }

        env.new_job(
            self.name(),
            SetJob {
                store: self.store.clone(),
                section: section.clone(),
                setting: setting.clone(),
                value: value.clone(),
            },
        )
    }

    fn reload(&self) -> Result<()> {
        let document = self.store.get_config()?;
        let mut tree = self.tree.write();
        tree.reset();
        tree.extend_from_settings(None, &document)?;
        tracing::debug!(sections = document.sections.len(), "set tree rebuilt");
        Ok(())
    }
}

struct SetJob {
    store: Arc<dyn SettingsStore>,
    section: String,
    setting: String,
    value: String,
}

#[async_trait]
impl JobBody for SetJob {
    async fn execute(&mut self, ctx: &JobContext) -> anyhow::Result<()> {
        ctx.running()?;

        let options = self
            .store
            .get_setting_options(&self.section, &self.setting)?;
        if let Some(options) = options.filter(|options| !options.is_empty()) {
            if !options.contains(&self.value) {
                ctx.fail(format!(
                    "Invalid value '{}' for {}.{} (expected one of: {})",
                    self.value,
                    self.section,
                    self.setting,
                    options.join(", ")
                ))?;
                return Ok(());
            }
        }

        self.store
            .update_setting(&self.section, &self.setting, &self.value)?;
        ctx.emit(ShellEvent::SettingsChanged {
            section: self.section.clone(),
            setting: self.setting.clone(),
            value: self.value.clone(),
        });
        ctx.info(format!(
            "{}.{} = {}",
            self.section, self.setting, self.value
        ));
        ctx.completed()?;
        Ok(())
    }
}
