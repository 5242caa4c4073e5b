//! jobshell - run commands as cancellable background jobs.
//!
//! # Usage
//!
//! ```bash
//! # Run one command line and wait for its job
//! jobshell -e "sleep 3"
//!
//! # Change a setting in a specific settings document
//! jobshell --settings ./settings.yaml -e "set sectionA opt1 slow"
//!
//! # JSON event stream for scripting
//! jobshell -e "jobs list" --json | jq .
//!
//! # Command lines from a file
//! jobshell -f setup.txt
//!
//! # Interactive REPL (when no -e or -f provided)
//! jobshell
//! ```

use anyhow::Result;
use clap::Parser;

use jobshell_lib::cli::{execute_batch, execute_once, initialize, run_repl, Args};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let ctx = initialize(&args).await?;

    let result = if let Some(ref line) = args.execute {
        execute_once(&ctx, line).await
    } else if let Some(ref file) = args.file {
        execute_batch(&ctx, file).await
    } else {
        run_repl(&ctx).await
    };

    ctx.shutdown().await?;

    result
}
