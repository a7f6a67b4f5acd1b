//! Error types for subrun.
//!
//! The two outcome errors carry the fully populated [`RunResult`] of the
//! run that produced them, so a caller can inspect captured output and the
//! exit code even when the run is reported as an error.

use thiserror::Error;

use crate::result::RunResult;
use crate::token::CancelCause;

/// Main error type for command execution.
#[derive(Error, Debug)]
pub enum RunError {
    /// The command exited with a nonzero code on its own.
    #[error("Error when executing the command \"{command}\".")]
    CommandFailed { command: String, result: RunResult },

    /// The cancellation watchdog killed the command.
    #[error("The execution of the \"{command}\" command was canceled using a cancellation token.")]
    Cancelled {
        command: String,
        cause: CancelCause,
        result: RunResult,
    },

    /// A positional argument could not be represented as text.
    #[error("Only text and filesystem paths can be passed as command arguments. Argument {position} (\"{value}\") is not valid UTF-8.")]
    ArgumentNotText { position: usize, value: String },

    /// The argument list was empty.
    #[error("An empty argument list was passed, there is no command to execute.")]
    EmptyCommand,

    /// The child process could not be started.
    #[error("Failed to spawn command: {command}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RunError {
    /// The result attached to a failed or cancelled run, if any.
    pub fn result(&self) -> Option<&RunResult> {
        match self {
            RunError::CommandFailed { result, .. } | RunError::Cancelled { result, .. } => {
                Some(result)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed_result(code: i32) -> RunResult {
        let mut result = RunResult::new();
        result.fill(String::new(), String::new(), code);
        result
    }

    #[test]
    fn test_command_failed_message() {
        let err = RunError::CommandFailed {
            command: "sh -c \"exit 1\"".to_string(),
            result: completed_result(1),
        };
        assert_eq!(
            err.to_string(),
            "Error when executing the command \"sh -c \"exit 1\"\"."
        );
    }

    #[test]
    fn test_cancelled_message() {
        let token = crate::token::CancelToken::manual();
        token.cancel();
        let err = RunError::Cancelled {
            command: "sleep 100".to_string(),
            cause: token.fired_cause().unwrap(),
            result: completed_result(-9),
        };
        assert_eq!(
            err.to_string(),
            "The execution of the \"sleep 100\" command was canceled using a cancellation token."
        );
    }

    #[test]
    fn test_argument_not_text_names_the_value() {
        let err = RunError::ArgumentNotText {
            position: 2,
            value: "fo\u{FFFD}o".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("Argument 2"));
        assert!(message.contains("fo\u{FFFD}o"));
        assert!(message.contains("not valid UTF-8"));
    }

    #[test]
    fn test_result_accessor() {
        let err = RunError::CommandFailed {
            command: "false".to_string(),
            result: completed_result(1),
        };
        assert_eq!(err.result().unwrap().returncode, Some(1));

        let err = RunError::EmptyCommand;
        assert!(err.result().is_none());
    }
}
