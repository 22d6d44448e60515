use std::fmt;

use crate::error::{ExecError, ExecResult};

/// The classified result of one bounded invocation
///
/// Produced exactly once per [`crate::Invocation::run_bounded`] call.
#[derive(Debug)]
pub enum Outcome {
    /// The process exited with status zero
    Success { output: String },
    /// The process could not be launched, or exited non-zero
    Failure { error: ExecError, output: String },
    /// The deadline elapsed and the process group was killed
    Timeout {
        error: ExecError,
        partial_output: String,
    },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Outcome::Timeout { .. })
    }

    /// The combined output captured, whatever the classification
    pub fn output(&self) -> &str {
        match self {
            Outcome::Success { output } | Outcome::Failure { output, .. } => output,
            Outcome::Timeout { partial_output, .. } => partial_output,
        }
    }

    pub fn error(&self) -> Option<&ExecError> {
        match self {
            Outcome::Success { .. } => None,
            Outcome::Failure { error, .. } | Outcome::Timeout { error, .. } => Some(error),
        }
    }

    /// Turn the outcome into a plain result, dropping the output of non-success variants
    pub fn into_result(self) -> ExecResult<String> {
        match self {
            Outcome::Success { output } => Ok(output),
            Outcome::Failure { error, .. } | Outcome::Timeout { error, .. } => Err(error),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success { output } => f.write_str(output),
            Outcome::Failure { error, output } => {
                write!(f, "command failed: {error}, output: {output}")
            }
            Outcome::Timeout { partial_output, .. } => {
                write!(f, "command timed out: {partial_output}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_display() {
        let outcome = Outcome::Timeout {
            error: ExecError::Timeout {
                program: "sleep".to_string(),
                deadline: Duration::from_secs(1),
            },
            partial_output: "zzz".to_string(),
        };
        assert_eq!(outcome.to_string(), "command timed out: zzz");
        assert_eq!(outcome.output(), "zzz");
        assert!(outcome.is_timeout());

        let outcome = Outcome::Failure {
            error: ExecError::NonZeroExit {
                program: "false".to_string(),
                code: Some(1),
            },
            output: String::new(),
        };
        assert_eq!(
            outcome.to_string(),
            "command failed: `false` exited with exit code 1, output: "
        );
        assert!(outcome.into_result().is_err());
    }
}
