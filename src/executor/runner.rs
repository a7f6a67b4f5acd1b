//! The execution orchestrator.
//!
//! Starts a child process with piped output streams, drains stderr on a
//! spawned task while stdout is drained inline, runs a cancellation
//! watchdog when a token is present, and reconciles everything into one
//! [`RunResult`] and a single success/failure/cancellation decision.
//!
//! The asymmetry between the two drains is deliberate: the call only
//! returns after both streams hit end-of-stream and the process exited,
//! so one inline drain plus one concurrent drain is enough to keep the OS
//! pipe buffers moving on both streams at once. A child that floods
//! stderr while stdout is idle (or the reverse) can otherwise block
//! forever against a full pipe.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::fmt;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};

use crate::callbacks::{self, LineCallback};
use crate::error::RunError;
use crate::result::RunResult;
use crate::token::CancelToken;

/// How often the watchdog rechecks the token and process liveness.
const WATCHDOG_POLL_INTERVAL: Duration = Duration::from_micros(100);

/// Options for one command execution.
pub struct RunOptions {
    /// Keep output accumulation only; never forward lines anywhere.
    pub catch_output: bool,
    /// Return the result instead of an error on failure or cancellation.
    pub catch_errors: bool,
    /// Kill the process once this much time has elapsed.
    pub timeout: Option<Duration>,
    /// Caller-supplied cancellation token.
    pub token: Option<CancelToken>,
    /// Working directory for the command.
    pub working_dir: Option<PathBuf>,
    /// Environment variables to set.
    pub env: HashMap<String, String>,
    /// Replaces the default stdout forwarder.
    pub stdout_line: Option<LineCallback>,
    /// Replaces the default stderr forwarder.
    pub stderr_line: Option<LineCallback>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            catch_output: false,
            catch_errors: false,
            timeout: None,
            token: None,
            working_dir: None,
            env: HashMap::new(),
            stdout_line: None,
            stderr_line: None,
        }
    }
}

impl RunOptions {
    /// Create default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulate output without forwarding it anywhere.
    pub fn catch_output(mut self) -> Self {
        self.catch_output = true;
        self
    }

    /// Report failure and cancellation through the returned result rather
    /// than as errors.
    pub fn catch_errors(mut self) -> Self {
        self.catch_errors = true;
        self
    }

    /// Set the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set timeout in seconds.
    pub fn with_timeout_secs(self, secs: u64) -> Self {
        self.with_timeout(Duration::from_secs(secs))
    }

    /// Attach a cancellation token.
    pub fn with_token(mut self, token: CancelToken) -> Self {
        self.token = Some(token);
        self
    }

    /// Set the working directory for the command.
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Add an environment variable.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Replace the default stdout line forwarder.
    pub fn on_stdout_line<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&str) + Send + 'static,
    {
        self.stdout_line = Some(Box::new(callback));
        self
    }

    /// Replace the default stderr line forwarder.
    pub fn on_stderr_line<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&str) + Send + 'static,
    {
        self.stderr_line = Some(Box::new(callback));
        self
    }
}

impl fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunOptions")
            .field("catch_output", &self.catch_output)
            .field("catch_errors", &self.catch_errors)
            .field("timeout", &self.timeout)
            .field("token", &self.token)
            .field("working_dir", &self.working_dir)
            .field("env", &self.env)
            .field("stdout_line", &self.stdout_line.as_ref().map(|_| "<callback>"))
            .field("stderr_line", &self.stderr_line.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

/// Execute a command and capture its output.
///
/// `arguments` is the full argument sequence; the first element is the
/// executable. Elements may be anything `OsStr`-convertible, including
/// `Path` values.
///
/// # Errors
/// * [`RunError::EmptyCommand`] / [`RunError::ArgumentNotText`] - invalid
///   argument list, checked before any process is spawned
/// * [`RunError::Spawn`] - the command couldn't be started
/// * [`RunError::CommandFailed`] - nonzero exit (unless `catch_errors`)
/// * [`RunError::Cancelled`] - killed by token or timeout (unless
///   `catch_errors`)
pub async fn run<S: AsRef<OsStr>>(
    arguments: &[S],
    options: RunOptions,
) -> Result<RunResult, RunError> {
    let arguments = validate_arguments(arguments)?;
    let command = format_command(&arguments);

    let RunOptions {
        catch_output,
        catch_errors,
        timeout,
        token,
        working_dir,
        env,
        stdout_line,
        stderr_line,
    } = options;

    let token = merge_token(token, timeout);
    let mut result = RunResult::new();

    tracing::info!("The beginning of the execution of the command \"{}\".", command);

    let mut cmd = Command::new(&arguments[0]);
    cmd.args(&arguments[1..]);
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.kill_on_drop(true); // Kill process if future is dropped

    if let Some(ref dir) = working_dir {
        cmd.current_dir(dir);
    }
    for (key, value) in &env {
        cmd.env(key, value);
    }

    let mut child = cmd.spawn().map_err(|e| RunError::Spawn {
        command: command.clone(),
        source: e,
    })?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let stdout_forward = forwarder(catch_output, stdout_line, callbacks::forward_to_stdout);
    let stderr_forward = forwarder(catch_output, stderr_line, callbacks::forward_to_stderr);

    let killed = Arc::new(AtomicBool::new(false));

    // Stderr drains on its own task for the whole lifetime of the child.
    let stderr_task = tokio::spawn(drain_lines(stderr, stderr_forward));

    // With a token the watchdog takes ownership of the child and reaps
    // it; without one the child can only end by exiting on its own.
    let waiter = match &token {
        Some(token) => Waiter::Watchdog(tokio::spawn(watch_and_reap(
            child,
            token.clone(),
            Arc::clone(&killed),
        ))),
        None => Waiter::Exit(child),
    };

    // Stdout drains inline; EOF means the child closed the descriptor,
    // normally at exit.
    let stdout_text = drain_lines(stdout, stdout_forward).await;

    let stderr_text = stderr_task.await.map_err(join_error)?;
    let status = match waiter {
        Waiter::Watchdog(handle) => handle.await.map_err(join_error)??,
        Waiter::Exit(mut child) => child.wait().await?,
    };

    result.killed_by_token = killed.load(Ordering::SeqCst);
    result.fill(stdout_text, stderr_text, exit_code(&status));

    if !result.success() {
        if result.killed_by_token {
            tracing::error!(
                "The execution of the \"{}\" command was canceled using a cancellation token.",
                command
            );
            return match token.as_ref().and_then(CancelToken::fired_cause) {
                Some(cause) if !catch_errors => Err(RunError::Cancelled {
                    command,
                    cause,
                    result,
                }),
                _ => Ok(result),
            };
        }

        tracing::error!("Error when executing the command \"{}\".", command);
        if catch_errors {
            return Ok(result);
        }
        return Err(RunError::CommandFailed { command, result });
    }

    tracing::info!("The command \"{}\" has been successfully executed.", command);
    Ok(result)
}

/// Blocking wrapper around [`run`] for use in non-async code.
pub fn run_sync<S: AsRef<OsStr>>(
    arguments: &[S],
    options: RunOptions,
) -> Result<RunResult, RunError> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| {
            RunError::Io(std::io::Error::other(format!(
                "Failed to create runtime: {}",
                e
            )))
        })?;

    rt.block_on(run(arguments, options))
}

/// Who waits for the child: the watchdog task (token present) or the
/// orchestrator itself.
enum Waiter {
    Watchdog(tokio::task::JoinHandle<std::io::Result<ExitStatus>>),
    Exit(Child),
}

/// Check every argument converts to text, before anything is spawned.
fn validate_arguments<S: AsRef<OsStr>>(arguments: &[S]) -> Result<Vec<String>, RunError> {
    if arguments.is_empty() {
        return Err(RunError::EmptyCommand);
    }

    arguments
        .iter()
        .enumerate()
        .map(|(position, argument)| {
            let argument = argument.as_ref();
            argument
                .to_str()
                .map(str::to_owned)
                .ok_or_else(|| RunError::ArgumentNotText {
                    position: position + 1,
                    value: argument.to_string_lossy().into_owned(),
                })
        })
        .collect()
}

/// Human-readable form of the argument list for logs and error messages.
/// Arguments containing whitespace are quoted in the message only.
fn format_command(arguments: &[String]) -> String {
    arguments
        .iter()
        .map(|argument| {
            if argument.chars().any(char::is_whitespace) {
                format!("\"{}\"", argument)
            } else {
                argument.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Fold an optional timeout into the cancellation token. With both, the
/// caller's token is checked first when the cause is reported.
fn merge_token(token: Option<CancelToken>, timeout: Option<Duration>) -> Option<CancelToken> {
    match (token, timeout) {
        (Some(token), Some(limit)) => Some(token.or(&CancelToken::after(limit))),
        (None, Some(limit)) => Some(CancelToken::after(limit)),
        (token, None) => token,
    }
}

/// Pick the forwarding callback for one stream. `catch_output` wins over
/// any custom callback.
fn forwarder(
    catch_output: bool,
    custom: Option<LineCallback>,
    default: fn(&str),
) -> Option<LineCallback> {
    if catch_output {
        return None;
    }
    Some(custom.unwrap_or_else(|| Box::new(default)))
}

/// Fully consume one output stream, line by line, until end-of-stream.
///
/// Reuses the line buffer across iterations instead of allocating a new
/// String each time.
async fn drain_lines<R: AsyncRead + Unpin>(
    reader: Option<R>,
    mut forward: Option<LineCallback>,
) -> String {
    let Some(reader) = reader else {
        return String::new();
    };

    let mut lines = BufReader::new(reader);
    let mut accumulated = String::new();
    let mut line = String::with_capacity(4096);

    loop {
        line.clear();
        match lines.read_line(&mut line).await {
            Ok(0) => break, // EOF
            Ok(_) => {
                accumulated.push_str(&line);
                if let Some(callback) = forward.as_mut() {
                    callback(&line);
                }
            }
            Err(e) => {
                tracing::warn!("Error reading child output: {}", e);
                break;
            }
        }
    }

    accumulated
}

/// Watch the token and the child; kill the child as soon as the token
/// fires, and reap it either way.
///
/// Liveness is checked before the token so that a child that already
/// exited is never killed. The kill itself may still race a last-instant
/// exit; a failed kill on an exited child is ignored.
async fn watch_and_reap(
    mut child: Child,
    token: CancelToken,
    killed: Arc<AtomicBool>,
) -> std::io::Result<ExitStatus> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if token.is_fired() {
            let _ = child.start_kill();
            killed.store(true, Ordering::SeqCst);
            return child.wait().await;
        }
        tokio::time::sleep(WATCHDOG_POLL_INTERVAL).await;
    }
}

fn join_error(e: tokio::task::JoinError) -> RunError {
    RunError::Io(std::io::Error::other(format!("worker task failed: {}", e)))
}

/// Exit code of a finished child. A signal-terminated child on Unix maps
/// to the negated signal number, so a killed child is always nonzero.
fn exit_code(status: &ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        status
            .code()
            .unwrap_or_else(|| status.signal().map_or(-1, |signal| -signal))
    }
    #[cfg(not(unix))]
    {
        status.code().unwrap_or(-1)
    }
}
