//! subrun - Process-Execution Facade
//!
//! Launches an external program, streams its stdout and stderr
//! concurrently, and produces a structured result with the captured
//! output and exit code.
//!
//! ## Features
//!
//! - Live per-line forwarding of both output streams, with replaceable
//!   callbacks and flush-on-every-line defaults
//! - Cooperative cancellation through composable tokens (manual trigger,
//!   deadline, arbitrary predicate) and/or a plain timeout
//! - A watchdog that hard-kills the child the moment cancellation fires
//! - Failure and cancellation reported as typed errors carrying the full
//!   result, or suppressed into a normal return
//! - XDG-compliant layered configuration for the `subrun` CLI
//!
//! ## Example
//!
//! ```no_run
//! use std::time::Duration;
//! use subrun::{run, RunOptions};
//!
//! # async fn demo() -> Result<(), subrun::RunError> {
//! let result = run(
//!     &["sh", "-c", "echo hello"],
//!     RunOptions::new().with_timeout(Duration::from_secs(5)),
//! )
//! .await?;
//! assert_eq!(result.stdout.as_deref(), Some("hello\n"));
//! # Ok(())
//! # }
//! ```

pub mod callbacks;
pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod result;
pub mod token;

pub use callbacks::LineCallback;
pub use cli::{Cli, Commands};
pub use config::Config;
pub use error::RunError;
pub use executor::{run, run_sync, RunOptions};
pub use result::RunResult;
pub use token::{CancelCause, CancelToken};
