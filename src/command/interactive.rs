//! Interactive sub-shells (`bash`, `python`) running in a pseudo-terminal.
//!
//! The job owns the child process and the PTY master. Output is pumped to the
//! host from a reader thread as `Output` events; keystrokes arrive through the
//! job's [`ViewHandle`] and are handed to a writer thread, so a child that
//! stops reading never blocks the job's task. The child is killed on every
//! exit path by [`ChildGuard`].

use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;

use anyhow::Context;
use async_trait::async_trait;
use parking_lot::RwLock;
use portable_pty::{native_pty_system, Child, CommandBuilder, PtySize};
use tokio_util::sync::CancellationToken;

use super::{Command, CommandEnv};
use crate::error::Result;
use crate::events::{Screen, ShellEvent};
use crate::job::{Job, JobBody, JobContext, ViewHandle};
use crate::runtime::EventSink;
use crate::tree::{CommandNode, CommandTree};

const ROWS: u16 = 24;
const COLS: u16 = 80;

/// A command that opens an interactive program in a PTY.
pub struct InteractiveShell {
    name: String,
    description: String,
    program: String,
    args: Vec<String>,
    tree: RwLock<CommandTree>,
}

impl InteractiveShell {
    pub fn new<I, S>(
        name: impl Into<String>,
        description: impl Into<String>,
        program: impl Into<String>,
        args: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        Self {
            tree: RwLock::new(CommandTree::new(CommandNode::subcommand(&name))),
            name,
            description: description.into(),
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn bash() -> Self {
        Self::new("bash", "Run a bash shell.", "bash", ["-i"])
    }

    pub fn python() -> Self {
        Self::new("python", "Run a Python interpreter.", "python3", ["-i", "-q"])
    }
}

impl Command for InteractiveShell {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn definition(&self) -> &RwLock<CommandTree> {
        &self.tree
    }

    fn create_job(&self, args: &[String], env: &CommandEnv<'_>) -> Result<Job> {
        self.validate(args)?;
        env.new_job(
            &self.name,
            ShellSession {
                program: self.program.clone(),
                args: self.args.clone(),
            },
        )
    }
}

/// Kills the child unless it already exited.
struct ChildGuard(Box<dyn Child + Send + Sync>);

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if let Ok(None) = self.0.try_wait() {
            tracing::debug!(pid = ?self.0.process_id(), "killing sub-shell");
            let _ = self.0.kill();
            let _ = self.0.wait();
        }
    }
}

enum Exit {
    Cancelled,
    Exited,
}

struct ShellSession {
    program: String,
    args: Vec<String>,
}

impl ShellSession {
    fn working_directory() -> PathBuf {
        std::env::current_dir()
            .ok()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("/"))
    }
}

#[async_trait]
impl JobBody for ShellSession {
    async fn execute(&mut self, ctx: &JobContext) -> anyhow::Result<()> {
        let pair = native_pty_system()
            .openpty(PtySize {
                rows: ROWS,
                cols: COLS,
                pixel_width: 0,
                pixel_height: 0,
            })
            .context("failed to open a pty")?;

        let mut cmd = CommandBuilder::new(&self.program);
        cmd.args(&self.args);
        cmd.env("TERM", "xterm-256color");
        cmd.cwd(Self::working_directory());

        let child = pair
            .slave
            .spawn_command(cmd)
            .with_context(|| format!("failed to start {}", self.program))?;
        let mut child = ChildGuard(child);
        drop(pair.slave);

        let writer = pair.master.take_writer()?;
        let reader = pair.master.try_clone_reader()?;
        let keystrokes = spawn_writer(writer, ctx.id().to_string());

        let exited = CancellationToken::new();
        spawn_reader(
            reader,
            ctx.id().to_string(),
            ctx.sink().clone(),
            exited.clone(),
        );

        let (view, mut input) = ViewHandle::interactive(ctx.id(), self.program.clone());
        ctx.attach_view(view.clone());
        ctx.push_screen(Screen::View { view });
        ctx.running()?;

        let exit = loop {
            tokio::select! {
                _ = ctx.wait_for_cancel() => break Exit::Cancelled,
                _ = exited.cancelled() => break Exit::Exited,
                Some(data) = input.recv() => {
                    if keystrokes.send(data).is_err() {
                        ctx.warning("input dropped: the terminal is closed");
                    }
                }
            }
        };
        // Ends the writer thread once it drains
        drop(keystrokes);

        ctx.release_view();
        match exit {
            Exit::Cancelled => {
                drop(child);
                ctx.cancelled()?;
            }
            Exit::Exited => {
                let status = child.0.wait()?;
                ctx.info(format!(
                    "{} exited with code {}",
                    self.program,
                    status.exit_code()
                ));
                ctx.completed()?;
            }
        }
        Ok(())
    }
}

/// Write keystrokes to the PTY until the sender is dropped or a write fails.
fn spawn_writer(mut writer: Box<dyn Write + Send>, job_id: String) -> mpsc::Sender<Vec<u8>> {
    let (tx, rx) = mpsc::channel::<Vec<u8>>();
    thread::spawn(move || {
        for data in rx {
            if let Err(e) = writer.write_all(&data).and_then(|()| writer.flush()) {
                tracing::debug!(%job_id, "pty write ended: {}", e);
                break;
            }
        }
    });
    tx
}

/// Pump PTY output to the host until the child closes its side.
fn spawn_reader(
    mut reader: Box<dyn Read + Send>,
    job_id: String,
    sink: Arc<dyn EventSink>,
    exited: CancellationToken,
) {
    thread::spawn(move || {
        let mut buf = [0u8; 4096];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    let data = String::from_utf8_lossy(&buf[..n]).to_string();
                    if sink
                        .emit(ShellEvent::Output {
                            job_id: job_id.clone(),
                            data,
                        })
                        .is_err()
                    {
                        break;
                    }
                }
                // EIO once the slave side is gone
                Err(e) => {
                    tracing::debug!(%job_id, "pty read ended: {}", e);
                    break;
                }
            }
        }
        exited.cancel();
    });
}
