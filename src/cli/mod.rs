//! Command-line host for the shell runtime.
//!
//! The CLI wires a `ChannelRuntime` between the jobs and the output handler:
//!
//! ```text
//! +-------------+     +----------------+     +---------------+
//! | Dispatcher  | --> | ChannelRuntime | --> | output.rs     |
//! | (jobs)      |     | (emit())       |     | (print/JSON)  |
//! +-------------+     +----------------+     +---------------+
//! ```
//!
//! Without `-e` or `-f` the CLI enters the REPL, see `repl.rs`.

mod args;
mod bootstrap;
mod output;
mod repl;
mod runner;

pub use args::Args;
pub use bootstrap::{initialize, CliContext};
pub use output::{render, run_event_loop, OutputOptions, Rendered};
pub use repl::run_repl;
pub use runner::{execute_batch, execute_once};
