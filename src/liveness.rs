//! Reachability checks on top of the bounded runner.
//!
//! Whether a host is reachable is decided by looking for marker phrases in
//! `ping`'s output. That is a policy of this module, not something the runner
//! guarantees: the phrases depend on the locale and on the ping implementation,
//! which is why they are configurable.
use std::time::Duration;

use ap_exec::{DEFAULT_DEADLINE, Invocation, Outcome};
use thiserror::Error;
use tracing::debug;

/// Phrases that mean the target could not be reached even though ping exited zero
pub const DEFAULT_UNREACHABLE_MARKERS: &[&str] = &[
    "unknown host",
    "Name or service not known",
    "Destination Host Unreachable",
    "could not find host",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reachability {
    Reachable,
    Unreachable,
}

/// The probe command itself did not succeed
#[derive(Debug, Error)]
#[error("{outcome}")]
pub struct ProbeError {
    outcome: Outcome,
}

impl ProbeError {
    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    pub fn is_timeout(&self) -> bool {
        self.outcome.is_timeout()
    }

    /// Whatever the probe printed before failing
    pub fn output(&self) -> &str {
        self.outcome.output()
    }
}

/// Sends a single echo request to a host
#[derive(Debug, Clone)]
pub struct ReachabilityProbe {
    program: String,
    deadline: Duration,
    unreachable_markers: Vec<String>,
}

impl Default for ReachabilityProbe {
    fn default() -> Self {
        Self {
            program: "ping".to_string(),
            deadline: DEFAULT_DEADLINE,
            unreachable_markers: DEFAULT_UNREACHABLE_MARKERS
                .iter()
                .map(|marker| marker.to_string())
                .collect(),
        }
    }
}

impl ReachabilityProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_unreachable_markers(mut self, markers: Vec<String>) -> Self {
        self.unreachable_markers = markers;
        self
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// `ping -c 1 <host>` (`-n 1` on Windows)
    pub fn invocation(&self, host: &str) -> Invocation {
        let count_flag = if cfg!(windows) { "-n" } else { "-c" };
        Invocation::new(self.program.as_str(), [count_flag, "1", host])
    }

    /// Run the probe and hand back the raw outcome
    pub fn probe(&self, host: &str) -> Outcome {
        self.invocation(host).run_bounded(self.deadline)
    }

    /// Run the probe and classify a successful run by its output
    ///
    /// Timeouts and failures are returned as [`ProbeError`].
    pub fn check(&self, host: &str) -> Result<Reachability, ProbeError> {
        match self.probe(host) {
            Outcome::Success { output } => {
                let reachability = self.classify(&output);
                debug!("{host}: {reachability:?}");
                Ok(reachability)
            }
            outcome => Err(ProbeError { outcome }),
        }
    }

    /// Reachable if there is any output and none of the markers appear in it
    ///
    /// Markers are matched case-insensitively.
    pub fn classify(&self, output: &str) -> Reachability {
        if output.trim().is_empty() {
            return Reachability::Unreachable;
        }
        let output = output.to_lowercase();
        let unreachable = self
            .unreachable_markers
            .iter()
            .any(|marker| output.contains(&marker.to_lowercase()));
        if unreachable {
            Reachability::Unreachable
        } else {
            Reachability::Reachable
        }
    }
}

#[cfg(test)]
mod tests {
    use ap_exec::ErrorKind;

    use super::*;

    const REPLY: &str = "PING 8.8.8.8 (8.8.8.8) 56(84) bytes of data.\n\
        64 bytes from 8.8.8.8: icmp_seq=1 ttl=117 time=9.81 ms\n";

    #[test]
    fn test_classify() {
        let probe = ReachabilityProbe::new();
        assert_eq!(probe.classify(REPLY), Reachability::Reachable);
        assert_eq!(probe.classify(""), Reachability::Unreachable);
        assert_eq!(probe.classify("  \n"), Reachability::Unreachable);
        assert_eq!(
            probe.classify("From 10.0.0.1 icmp_seq=1 Destination Host Unreachable\n"),
            Reachability::Unreachable
        );
        assert_eq!(
            probe.classify("ping: UNKNOWN HOST foo\n"),
            Reachability::Unreachable
        );
    }

    #[test]
    fn test_custom_markers() {
        let probe = ReachabilityProbe::new()
            .with_unreachable_markers(vec!["Zielhost nicht erreichbar".to_string()]);
        assert_eq!(
            probe.classify("Antwort von 10.0.0.1: Zielhost nicht erreichbar."),
            Reachability::Unreachable
        );
        assert_eq!(
            probe.classify("ping: unknown host foo"),
            Reachability::Reachable
        );
    }

    #[test]
    fn test_invocation_args() {
        let invocation = ReachabilityProbe::new().invocation("8.8.8.8");
        assert_eq!(invocation.program(), "ping");
        assert_eq!(invocation.args()[1..], ["1", "8.8.8.8"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_check_with_stand_in_commands() {
        // `echo` prints its arguments, so the output is non-empty and marker free
        let probe = ReachabilityProbe::new().with_program("echo");
        assert_eq!(probe.check("device.local").unwrap(), Reachability::Reachable);
        assert_eq!(
            probe.check("unknown host").unwrap(),
            Reachability::Unreachable
        );

        let probe = ReachabilityProbe::new().with_program("true");
        assert_eq!(probe.check("device.local").unwrap(), Reachability::Unreachable);

        let err = ReachabilityProbe::new()
            .with_program("false")
            .check("device.local")
            .unwrap_err();
        assert!(!err.is_timeout());
        assert_eq!(
            err.outcome().error().map(|err| err.kind()),
            Some(ErrorKind::NonZeroExit)
        );
        assert!(err.to_string().starts_with("command failed:"));
    }

    #[test]
    #[ignore = "needs network access and a ping binary"]
    fn test_ping_reachable_host() {
        let outcome = run_ping("8.8.8.8");
        assert!(outcome.is_success(), "{outcome}");
        assert!(outcome.output().contains("time="));
    }

    #[test]
    #[ignore = "needs a ping binary and a resolver"]
    fn test_ping_invalid_host() {
        let outcome = run_ping("no-such-host.invalid");
        assert!(!outcome.is_success());
        let output = outcome.output().to_lowercase();
        assert!(
            [
                "unknown host",
                "name or service not known",
                "could not find host",
                "cannot resolve",
            ]
            .iter()
            .any(|marker| output.contains(marker)),
            "{output}"
        );
    }

    fn run_ping(host: &str) -> Outcome {
        ap_exec::run_bounded("ping", &["-c", "1", host], DEFAULT_DEADLINE)
    }
}
