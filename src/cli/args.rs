//! CLI argument parsing using clap.

use clap::Parser;
use std::path::PathBuf;

/// jobshell - run commands as cancellable background jobs
#[derive(Parser, Debug, Clone)]
#[command(name = "jobshell")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Config file (default: ~/.jobshell/config.toml)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Settings document edited by `set` (overrides config and env)
    #[arg(short = 's', long, env = "JOBSHELL_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Run a single command line, wait for its job and exit
    #[arg(short = 'e', long, conflicts_with = "file")]
    pub execute: Option<String>,

    /// Run command lines from a file (one per line) and exit
    #[arg(short = 'f', long, conflicts_with = "execute")]
    pub file: Option<PathBuf>,

    /// Output events as JSON lines (for scripting/parsing)
    #[arg(long)]
    pub json: bool,

    /// Only show errors
    #[arg(long, short = 'q')]
    pub quiet: bool,

    /// Show debug logs and job lifecycle events
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_default_values() {
        let args = Args::parse_from(["jobshell"]);
        assert!(args.config.is_none());
        assert!(args.execute.is_none());
        assert!(!args.json);
        assert!(!args.quiet);
        assert!(!args.verbose);
    }

    #[test]
    fn test_args_execute_flag() {
        let args = Args::parse_from(["jobshell", "-e", "sleep 3"]);
        assert_eq!(args.execute, Some("sleep 3".to_string()));
    }

    #[test]
    fn test_args_paths() {
        let args = Args::parse_from([
            "jobshell",
            "--config",
            "/tmp/config.toml",
            "--settings",
            "/tmp/settings.yaml",
        ]);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/config.toml")));
        assert_eq!(args.settings, Some(PathBuf::from("/tmp/settings.yaml")));
    }

    #[test]
    fn test_args_execute_conflicts_with_file() {
        let result = Args::try_parse_from(["jobshell", "-e", "jobs list", "-f", "lines.txt"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_args_output_modes() {
        let args = Args::parse_from(["jobshell", "--json", "--quiet", "-v"]);
        assert!(args.json);
        assert!(args.quiet);
        assert!(args.verbose);
    }
}
