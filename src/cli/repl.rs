//! Line-oriented REPL.
//!
//! Supports:
//! - `/quit`, `/exit`, `/q` - exit
//! - `/reload` - re-read the config and rebuild command trees
//! - `/history` - list submitted lines, newest first
//! - `/config [key]` - show the config, or one dot-path value of it
//! - `/send <job_id> <text>` - write a line to an interactive job
//! - a line ending in `?` - print completions for the text before it
//!
//! Anything else is submitted to the dispatcher. Jobs run in the background
//! and their events are printed as they arrive.

use std::io::{self, BufRead, Write};

use anyhow::Result;
use tokio::task::JoinHandle;

use super::bootstrap::CliContext;
use super::output::run_event_loop;

#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    Quit,
    Reload,
    History,
    /// Show the config, or the value at a dot-path key
    Config(Option<String>),
    /// Forward a line of input to a job's view
    Send { job_id: String, text: String },
    /// Completion request for the text before the `?`
    Complete(String),
    /// Unknown slash command
    Unknown(String),
    /// Command line for the dispatcher
    Line(String),
    Empty,
}

impl ReplCommand {
    pub fn parse(input: &str) -> Self {
        let input = input.trim_end_matches(['\r', '\n']);
        let trimmed = input.trim();

        if trimmed.is_empty() {
            return ReplCommand::Empty;
        }

        if !trimmed.starts_with('/') {
            if let Some(partial) = input.trim_start().strip_suffix('?') {
                return ReplCommand::Complete(partial.to_string());
            }
            return ReplCommand::Line(trimmed.to_string());
        }

        let (command, rest) = trimmed.split_once(' ').unwrap_or((trimmed, ""));
        match command.to_lowercase().as_str() {
            "/quit" | "/exit" | "/q" => ReplCommand::Quit,
            "/reload" => ReplCommand::Reload,
            "/history" => ReplCommand::History,
            "/config" => {
                let key = rest.trim();
                ReplCommand::Config((!key.is_empty()).then(|| key.to_string()))
            }
            "/send" => match rest.trim_start().split_once(' ') {
                Some((job_id, text)) => ReplCommand::Send {
                    job_id: job_id.to_string(),
                    text: text.to_string(),
                },
                None => ReplCommand::Unknown(trimmed.to_string()),
            },
            _ => ReplCommand::Unknown(trimmed.to_string()),
        }
    }
}

/// Run an interactive session. Returns on `/quit` or EOF (Ctrl+D).
pub async fn run_repl(ctx: &CliContext) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let interactive = atty::is(atty::Stream::Stdin);

    let mut output = spawn_output(ctx);

    if interactive {
        eprintln!("jobshell interactive mode");
        eprintln!("Type help <command>, a line ending in ? for completions, /quit to exit\n");
    }

    loop {
        if interactive {
            print!("{}", ctx.config().shell.prompt);
            stdout.flush()?;
        }

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            if interactive {
                eprintln!("\nGoodbye!");
            }
            break;
        }

        match ReplCommand::parse(&input) {
            ReplCommand::Empty => continue,
            ReplCommand::Quit => {
                if interactive {
                    eprintln!("Goodbye!");
                }
                break;
            }
            ReplCommand::Reload => {
                if let Err(e) = ctx.reload().await {
                    eprintln!("Error: {:#}", e);
                }
                // New severity filter; the old loop ends once its sender is replaced
                output = spawn_output(ctx);
            }
            ReplCommand::History => {
                for (i, line) in ctx.dispatcher.history().iter().enumerate() {
                    println!("{:>4}  {}", i + 1, line);
                }
            }
            ReplCommand::Config(None) => match toml::to_string_pretty(&ctx.config()) {
                Ok(text) => println!("{}", text.trim_end()),
                Err(e) => eprintln!("Error: {}", e),
            },
            ReplCommand::Config(Some(key)) => match ctx.config_manager.get_value(&key).await {
                Ok(value) => println!("{} = {}", key, value),
                Err(e) => eprintln!("Error: {}", e),
            },
            ReplCommand::Send { job_id, text } => {
                let data = format!("{}\n", text).into_bytes();
                if let Err(e) = ctx.registry.send_input(&job_id, data) {
                    eprintln!("Error: {}", e);
                }
            }
            ReplCommand::Complete(partial) => {
                let candidates = ctx.dispatcher.on_partial_input(&partial);
                if candidates.is_empty() {
                    eprintln!("(no completions)");
                } else {
                    println!("{}", candidates.join("  "));
                }
            }
            ReplCommand::Unknown(cmd) => {
                eprintln!("Unknown command: {}", cmd);
                eprintln!("Available: /quit, /reload, /history, /config [key], /send <job_id> <text>");
            }
            ReplCommand::Line(line) => {
                // Outcome is reported through the event stream
                ctx.dispatcher.on_submit(&line);
            }
        }
    }

    output.abort();
    Ok(())
}

fn spawn_output(ctx: &CliContext) -> JoinHandle<Result<()>> {
    tokio::spawn(run_event_loop(
        ctx.subscribe(),
        ctx.registry.clone(),
        ctx.output_options(),
        None,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    // ────────────────────────────────────────────────────────────────────────────────
    // Tests for ReplCommand::parse
    // ────────────────────────────────────────────────────────────────────────────────

    mod parse_tests {
        use super::*;

        #[test]
        fn parses_quit_aliases() {
            assert_eq!(ReplCommand::parse("/quit"), ReplCommand::Quit);
            assert_eq!(ReplCommand::parse("/exit"), ReplCommand::Quit);
            assert_eq!(ReplCommand::parse("/Q"), ReplCommand::Quit);
            assert_eq!(ReplCommand::parse("  /quit  \n"), ReplCommand::Quit);
        }

        #[test]
        fn parses_reload_and_history() {
            assert_eq!(ReplCommand::parse("/reload"), ReplCommand::Reload);
            assert_eq!(ReplCommand::parse("/HISTORY"), ReplCommand::History);
        }

        #[test]
        fn parses_config() {
            assert_eq!(ReplCommand::parse("/config"), ReplCommand::Config(None));
            assert_eq!(
                ReplCommand::parse("/config  shell.prompt "),
                ReplCommand::Config(Some("shell.prompt".to_string()))
            );
        }

        #[test]
        fn parses_send() {
            assert_eq!(
                ReplCommand::parse("/send bash_123456 ls -la"),
                ReplCommand::Send {
                    job_id: "bash_123456".to_string(),
                    text: "ls -la".to_string()
                }
            );
            assert_eq!(
                ReplCommand::parse("/send bash_123456"),
                ReplCommand::Unknown("/send bash_123456".to_string())
            );
        }

        #[test]
        fn parses_completion_request_keeping_trailing_space() {
            assert_eq!(
                ReplCommand::parse("set sectionA opt1 ?\n"),
                ReplCommand::Complete("set sectionA opt1 ".to_string())
            );
            assert_eq!(
                ReplCommand::parse("se?"),
                ReplCommand::Complete("se".to_string())
            );
            assert_eq!(
                ReplCommand::parse("?"),
                ReplCommand::Complete(String::new())
            );
        }

        #[test]
        fn slash_commands_are_never_completions() {
            assert_eq!(
                ReplCommand::parse("/send python_000001 print('why?')"),
                ReplCommand::Send {
                    job_id: "python_000001".to_string(),
                    text: "print('why?')".to_string()
                }
            );
        }

        #[test]
        fn parses_unknown_slash_command() {
            assert_eq!(
                ReplCommand::parse("/foo"),
                ReplCommand::Unknown("/foo".to_string())
            );
        }

        #[test]
        fn parses_command_line() {
            assert_eq!(
                ReplCommand::parse("  sleep 3  "),
                ReplCommand::Line("sleep 3".to_string())
            );
        }

        #[test]
        fn parses_empty_input() {
            assert_eq!(ReplCommand::parse(""), ReplCommand::Empty);
            assert_eq!(ReplCommand::parse("   "), ReplCommand::Empty);
            assert_eq!(ReplCommand::parse("\t\n"), ReplCommand::Empty);
        }
    }
}
