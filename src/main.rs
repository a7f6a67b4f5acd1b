//! subrun CLI entry point
//!
//! Usage:
//!   subrun run -- <command>...    Execute a command through the facade
//!   subrun config                 Show resolved configuration

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;

use subrun::cli::commands::{ConfigArgs, OutputFormat, RunArgs};
use subrun::cli::{Cli, Commands};
use subrun::config::load_config;
use subrun::{run, RunError, RunOptions, RunResult};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    match dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so captured child output on stdout stays clean.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default_filter = if verbose { "subrun=info" } else { "subrun=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn dispatch(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Run(args) => run_command(args, cli.config.as_deref(), cli.verbose).await,
        Commands::Config(args) => {
            show_config(args, cli.config.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Execute a command through the facade
async fn run_command(args: RunArgs, config_path: Option<&str>, verbose: bool) -> Result<ExitCode> {
    let config = load_config(config_path)?;

    let mut options = RunOptions::new();

    let timeout_secs = args.timeout.unwrap_or(config.defaults.timeout as f64);
    if timeout_secs > 0.0 {
        options = options.with_timeout(Duration::from_secs_f64(timeout_secs));
    }
    if args.catch_output || config.defaults.catch_output {
        options = options.catch_output();
    }
    if args.catch_errors {
        options = options.catch_errors();
    }
    if let Some(ref dir) = args.cwd {
        options = options.in_dir(dir);
    }
    for (key, value) in args.env_as_map() {
        options = options.with_env(key, value);
    }

    let result = match run(&args.command, options).await {
        Ok(result) => result,
        Err(e @ (RunError::CommandFailed { .. } | RunError::Cancelled { .. })) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            let code = match e.result() {
                Some(result) => {
                    print_result(result, &args.format);
                    result.returncode
                }
                None => None,
            };
            return Ok(ExitCode::from(exit_code_byte(code)));
        }
        Err(e) => return Err(e.into()),
    };

    if verbose && result.success() {
        eprintln!(
            "{}: command completed with exit code {:?}",
            "success".green(),
            result.returncode
        );
    }

    let code = result.returncode;
    print_result(&result, &args.format);
    Ok(ExitCode::from(exit_code_byte(code)))
}

/// Render a run result according to the selected output format.
fn print_result(result: &RunResult, format: &OutputFormat) {
    match format {
        OutputFormat::Plain => {
            // Live forwarding already showed the output unless the run
            // caught it; print the accumulation in that case.
            if let Some(ref stdout) = result.stdout {
                print!("{}", stdout);
            }
            if let Some(ref stderr) = result.stderr {
                eprint!("{}", stderr);
            }
        }
        OutputFormat::Json => match serde_json::to_string_pretty(result) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("{}: failed to render result: {}", "error".red().bold(), e),
        },
        OutputFormat::Table => {
            println!("{}: {}", "Id".cyan(), result.id);
            println!("{}: {:?}", "Exit code".cyan(), result.returncode);
            println!("{}: {}", "Killed by token".cyan(), result.killed_by_token);
            if let Some(ref stdout) = result.stdout {
                if !stdout.is_empty() {
                    println!("{}:", "Stdout".cyan());
                    print!("{}", stdout);
                }
            }
            if let Some(ref stderr) = result.stderr {
                if !stderr.is_empty() {
                    println!("{}:", "Stderr".cyan());
                    print!("{}", stderr);
                }
            }
        }
    }
}

/// Show resolved configuration
fn show_config(args: ConfigArgs, config_path: Option<&str>) -> Result<()> {
    let config = load_config(config_path)?;

    match args.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        OutputFormat::Plain => {
            print!("{}", toml::to_string(&config)?);
        }
        OutputFormat::Table => {
            println!("{}: {}", "Timeout".cyan(), config.defaults.timeout);
            println!("{}: {}", "Catch output".cyan(), config.defaults.catch_output);
        }
    }

    Ok(())
}

/// Mirror the child's exit status in the CLI's own exit code. Codes the
/// OS can't represent (signals, out of range) collapse to 1.
fn exit_code_byte(returncode: Option<i32>) -> u8 {
    match returncode {
        Some(code) if (0..=255).contains(&code) => code as u8,
        _ => 1,
    }
}
