//! Error types for cmdflow.
//!
//! Command failures are ordinary results (non-zero `code`); these errors only
//! cover what a caller can't express as a result: a rejected await, misuse of
//! a runner, or an I/O failure while wiring streams.

use crate::runner::Captured;
use thiserror::Error;

/// Result type alias using cmdflow's Error.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone)]
pub enum Error {
    /// The command finished with a non-zero code and the runner rejects failures.
    #[error("command failed with exit code {code}: {}", .stderr.text().trim_end())]
    CommandFailed {
        code: i32,
        stdout: Captured,
        stderr: Captured,
    },

    /// I/O error while wiring stdin/stdout of a runner.
    #[error("io error: {0}")]
    Io(String),

    /// The runner was already started and can no longer be reconfigured.
    #[error("runner already started")]
    AlreadyStarted,

    /// A runner can't be piped into itself.
    #[error("cannot pipe a command into itself")]
    SelfPipe,

    /// A synchronous wait was requested from inside a current-thread runtime.
    #[error("cannot block on a runner from inside a current-thread runtime")]
    BlockingInAsync,

    /// Unexpected internal failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Exit code carried by the error, if it describes a finished command.
    pub fn code(&self) -> Option<i32> {
        match self {
            Error::CommandFailed { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}
