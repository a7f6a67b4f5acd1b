//! Result record produced by one command execution.

use serde::Serialize;
use uuid::Uuid;

/// Outcome of a single command execution.
///
/// `stdout`, `stderr` and `returncode` stay `None` while the run is in
/// flight and are filled together once the process has exited and both
/// output streams have been fully drained. A result obtained from
/// [`run`](crate::run) or from an error is therefore always complete.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    /// Unique identifier for this invocation. Not derived from the child
    /// PID, which the OS may reuse.
    pub id: Uuid,
    /// Accumulated standard output, lines concatenated with their
    /// terminators preserved.
    pub stdout: Option<String>,
    /// Accumulated standard error.
    pub stderr: Option<String>,
    /// Child exit code. On Unix a signal-terminated child is reported as
    /// the negated signal number.
    pub returncode: Option<i32>,
    /// True iff the cancellation watchdog killed the process.
    pub killed_by_token: bool,
}

impl RunResult {
    pub(crate) fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            stdout: None,
            stderr: None,
            returncode: None,
            killed_by_token: false,
        }
    }

    /// Fill the output fields. Called exactly once, after the process has
    /// exited and both drains finished.
    pub(crate) fn fill(&mut self, stdout: String, stderr: String, returncode: i32) {
        self.stdout = Some(stdout);
        self.stderr = Some(stderr);
        self.returncode = Some(returncode);
    }

    /// Whether the command exited with code 0.
    pub fn success(&self) -> bool {
        self.returncode == Some(0)
    }
}
