//! Non-interactive execution: one line, or a file of lines.

use std::path::Path;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;

use crate::dispatcher::Submission;
use crate::job::JobStatus;

use super::bootstrap::CliContext;
use super::output::{run_event_loop, OutputOptions};

impl CliContext {
    pub fn output_options(&self) -> OutputOptions {
        OutputOptions {
            json: self.args.json,
            min_severity: self.console_severity(),
            lifecycle: self.args.verbose,
        }
    }
}

/// Submit `line` and wait for its job to finish.
///
/// Fails when the line is rejected or the job ends in `Error`.
pub async fn execute_once(ctx: &CliContext, line: &str) -> Result<()> {
    // Fresh channel so this execution sees only its own events
    let event_rx = ctx.subscribe();

    let handle = match ctx.dispatcher.on_submit(line) {
        Submission::Started(handle) => handle,
        Submission::Ignored => return Ok(()),
        Submission::Rejected(e) => {
            // Drain the Notify the dispatcher just emitted
            let output: JoinHandle<Result<()>> = tokio::spawn(run_event_loop(
                event_rx,
                ctx.registry.clone(),
                ctx.output_options(),
                None,
            ));
            ctx.subscribe();
            let _ = output.await;
            return Err(e).with_context(|| format!("Rejected: {}", line));
        }
    };

    let output: JoinHandle<Result<()>> = tokio::spawn(run_event_loop(
        event_rx,
        ctx.registry.clone(),
        ctx.output_options(),
        Some(handle.id().to_string()),
    ));

    match output.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!("Output handler error: {}", e),
        Err(e) => tracing::warn!("Output handler panicked: {}", e),
    }

    match handle.status() {
        JobStatus::Error => anyhow::bail!("Job {} failed", handle.id()),
        _ => Ok(()),
    }
}

/// Run each non-empty, non-comment line of `file_path` in turn.
///
/// Lines starting with `#` are comments. Stops at the first failure.
pub async fn execute_batch(ctx: &CliContext, file_path: &Path) -> Result<()> {
    let content = tokio::fs::read_to_string(file_path)
        .await
        .with_context(|| format!("Failed to read command file: {}", file_path.display()))?;

    let lines = command_lines(&content);
    if lines.is_empty() {
        anyhow::bail!("No commands found in file: {}", file_path.display());
    }

    let total = lines.len();
    for (i, line) in lines.iter().enumerate() {
        if ctx.args.verbose {
            eprintln!("[batch] [{}/{}] {}", i + 1, total, line);
        }
        execute_once(ctx, line).await?;
    }

    if ctx.args.verbose {
        eprintln!("[batch] All {} command(s) completed", total);
    }
    Ok(())
}

fn command_lines(content: &str) -> Vec<&str> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect()
}
