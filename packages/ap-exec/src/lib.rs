//! Bounded execution of external command-line tools
//!
//! Every call spawns exactly one process, never retries, and hands back a
//! classified result:
//!
//! - [`run_bounded`]: wait up to a deadline, capture combined stdout/stderr,
//!   classify as [`Outcome::Success`], [`Outcome::Failure`] or [`Outcome::Timeout`]
//! - [`run_silent`]: wait without a deadline, discard output
//! - [`run_detached`]: fire and forget
//!
//! # Limitations
//!
//! On timeout the child's process group is killed, which takes grandchildren
//! spawned through a shell wrapper down with it. That isolation only exists
//! on Unix; elsewhere only the direct child is terminated and its descendants
//! may outlive the deadline.
//!
//! Because bounded and detached children lead their own process group, they
//! do not receive the terminal's Ctrl-C. If the calling process is interrupted
//! while [`run_bounded`] is waiting, the child keeps running with no deadline
//! enforcing it.
pub mod error;
pub mod group;
pub mod outcome;
pub mod runner;

pub use error::{ErrorKind, ExecError, ExecResult};
pub use outcome::Outcome;
pub use runner::{DEFAULT_DEADLINE, Invocation, run_bounded, run_detached, run_silent};
