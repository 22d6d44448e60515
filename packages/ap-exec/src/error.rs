use std::{fmt, time::Duration};

use thiserror::Error;

/// Category of an [`ExecError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The invocation itself was malformed, nothing was spawned
    InvalidInvocation,
    /// The executable could not be started
    Launch,
    /// The process ran but exited with a non-zero status
    NonZeroExit,
    /// The process did not finish before its deadline and was killed
    Timeout,
    /// Waiting on or talking to the child failed
    Io,
}

impl ErrorKind {
    /// A stable categorical code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInvocation => "invalid invocation",
            ErrorKind::Launch => "shell execution failed",
            ErrorKind::NonZeroExit => "non-zero exit status",
            ErrorKind::Timeout => "command timed out",
            ErrorKind::Io => "process io error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Unified command execution error type
#[derive(Error, Debug)]
pub enum ExecError {
    /// Empty executable name, zero deadline, etc.
    #[error("invalid invocation: {0}")]
    InvalidInvocation(String),

    /// Executable not found, permission denied, etc.
    #[error("failed to launch `{program}`: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The process exited with a non-zero status
    #[error("`{program}` exited with {}", describe_code(.code))]
    NonZeroExit { program: String, code: Option<i32> },

    /// The deadline elapsed before the process exited
    #[error("`{program}` timed out after {deadline:?}")]
    Timeout { program: String, deadline: Duration },

    /// IO error while waiting on the child
    #[error("IO error while running `{program}`: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

impl ExecError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExecError::InvalidInvocation(_) => ErrorKind::InvalidInvocation,
            ExecError::Launch { .. } => ErrorKind::Launch,
            ExecError::NonZeroExit { .. } => ErrorKind::NonZeroExit,
            ExecError::Timeout { .. } => ErrorKind::Timeout,
            ExecError::Io { .. } => ErrorKind::Io,
        }
    }

    /// Shorthand for `self.kind().code()`
    pub fn code(&self) -> &'static str {
        self.kind().code()
    }
}

/// Command execution result type alias
pub type ExecResult<T> = Result<T, ExecError>;
