//! Execution Errors
//!
//! Failures raised while running a statement. None of these terminate the
//! shell: redirection and expansion failures abort the current statement
//! with a non-zero status, and spawn failures print a diagnostic and set
//! the status without stopping the loop. Loop/exit control flow is not an
//! error and travels as [`ControlSignal`](crate::interpreter::types::ControlSignal).

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutionError {
    /// An external program (or a command-substitution subshell) could not
    /// be started.
    #[error("{command}: {source}")]
    SpawnFailure {
        command: String,
        source: io::Error,
    },
    #[error("divide by zero error")]
    DivideByZero,
    /// A redirection target could not be opened, or shuffling bytes
    /// between redirection files failed.
    #[error("{target}: {source}")]
    RedirectionFailure {
        target: String,
        source: io::Error,
    },
}

impl ExecutionError {
    pub fn spawn(command: impl Into<String>, source: io::Error) -> Self {
        Self::SpawnFailure {
            command: command.into(),
            source,
        }
    }

    pub fn redirect(target: impl Into<String>, source: io::Error) -> Self {
        Self::RedirectionFailure {
            target: target.into(),
            source,
        }
    }
}
