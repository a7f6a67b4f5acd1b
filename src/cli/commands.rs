//! CLI command definitions using clap
//!
//! Defines all CLI subcommands and their arguments.

use clap::{Parser, Subcommand, ValueEnum};
use std::collections::HashMap;
use std::path::PathBuf;

/// Process-execution facade.
///
/// Runs a command with live output streaming, optional output capture,
/// and cancellation by timeout.
#[derive(Parser, Debug)]
#[command(name = "subrun")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (overrides default XDG paths)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute a command and report its outcome
    Run(RunArgs),

    /// Show resolved configuration
    Config(ConfigArgs),
}

/// Arguments for the `run` subcommand
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Command to execute (first element is the executable)
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,

    /// Timeout in seconds, fractions allowed (defaults to the configured
    /// value; 0 for no timeout)
    #[arg(short, long)]
    pub timeout: Option<f64>,

    /// Capture output instead of streaming it live
    #[arg(long)]
    pub catch_output: bool,

    /// Report failure through the exit code only, without an error message
    #[arg(long)]
    pub catch_errors: bool,

    /// Working directory for the command
    #[arg(long)]
    pub cwd: Option<PathBuf>,

    /// Environment variables in KEY=VALUE format
    #[arg(short = 'e', long = "env", value_parser = parse_key_value)]
    pub env: Vec<(String, String)>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

impl RunArgs {
    /// Convert env pairs to a HashMap
    pub fn env_as_map(&self) -> HashMap<String, String> {
        self.env.iter().cloned().collect()
    }
}

/// Parse KEY=VALUE argument
fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid argument '{}': expected KEY=VALUE format", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

/// Output format options
#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Captured output only, as the child produced it
    Plain,
    /// JSON rendering of the run result
    Json,
    /// Human-readable summary
    Table,
}

/// Arguments for the `config` subcommand
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse_run_simple() {
        let cli = Cli::parse_from(["subrun", "run", "echo", "kek"]);
        if let Commands::Run(args) = cli.command {
            assert_eq!(args.command, vec!["echo", "kek"]);
            assert!(args.timeout.is_none());
            assert!(!args.catch_output);
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn test_cli_parse_run_with_timeout() {
        let cli = Cli::parse_from(["subrun", "run", "-t", "0.5", "sleep", "5"]);
        if let Commands::Run(args) = cli.command {
            assert_eq!(args.timeout, Some(0.5));
            assert_eq!(args.command, vec!["sleep", "5"]);
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn test_cli_parse_run_with_hyphen_values() {
        let cli = Cli::parse_from(["subrun", "run", "--", "sh", "-c", "exit 1"]);
        if let Commands::Run(args) = cli.command {
            assert_eq!(args.command, vec!["sh", "-c", "exit 1"]);
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn test_cli_parse_run_with_env() {
        let cli = Cli::parse_from([
            "subrun", "run", "-e", "FOO=bar", "-e", "BAZ=1", "--", "env",
        ]);
        if let Commands::Run(args) = cli.command {
            let env = args.env_as_map();
            assert_eq!(env.get("FOO"), Some(&"bar".to_string()));
            assert_eq!(env.get("BAZ"), Some(&"1".to_string()));
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn test_cli_parse_run_catch_flags() {
        let cli = Cli::parse_from([
            "subrun",
            "run",
            "--catch-output",
            "--catch-errors",
            "--",
            "false",
        ]);
        if let Commands::Run(args) = cli.command {
            assert!(args.catch_output);
            assert!(args.catch_errors);
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn test_cli_parse_run_json_format() {
        let cli = Cli::parse_from(["subrun", "run", "-f", "json", "--", "echo", "kek"]);
        if let Commands::Run(args) = cli.command {
            assert!(matches!(args.format, OutputFormat::Json));
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn test_cli_parse_config() {
        let cli = Cli::parse_from(["subrun", "config"]);
        assert!(matches!(cli.command, Commands::Config(_)));
    }

    #[test]
    fn test_cli_verbose_flag() {
        let cli = Cli::parse_from(["subrun", "-v", "config"]);
        assert!(cli.verbose);
    }

    #[test]
    fn test_cli_config_flag() {
        let cli = Cli::parse_from(["subrun", "-c", "/path/to/config.toml", "config"]);
        assert_eq!(cli.config, Some("/path/to/config.toml".to_string()));
    }

    #[test]
    fn test_parse_key_value_valid() {
        let result = parse_key_value("FOO=bar");
        assert_eq!(result, Ok(("FOO".to_string(), "bar".to_string())));
    }

    #[test]
    fn test_parse_key_value_with_equals() {
        let result = parse_key_value("FOO=bar=baz");
        assert_eq!(result, Ok(("FOO".to_string(), "bar=baz".to_string())));
    }

    #[test]
    fn test_parse_key_value_invalid() {
        let result = parse_key_value("INVALID");
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_verify() {
        // Verify CLI structure is valid
        Cli::command().debug_assert();
    }
}
