use std::{
    fmt, io,
    io::Read,
    process::{Command, Stdio},
    sync::{Arc, Mutex, mpsc},
    thread,
    time::Duration,
};

use tracing::{debug, trace, warn};
use wait_timeout::ChildExt;

use crate::{
    error::{ExecError, ExecResult},
    group,
    outcome::Outcome,
};

/// Deadline used for liveness-style checks when the caller has no better bound
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(5);

/// How long to keep collecting output once the child is gone
///
/// A descendant that escaped the kill may still hold the pipe open, so the
/// reader is never waited on for longer than this.
pub const OUTPUT_DRAIN_SLACK: Duration = Duration::from_millis(500);

/// Maximum combined output kept per invocation (10MB)
pub const MAX_OUTPUT_SIZE: usize = 10 * 1024 * 1024;

const TRUNCATION_MARKER: &[u8] = b"\n[output truncated at 10MB]";

/// An executable and its ordered arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
}

impl Invocation {
    pub fn new<P, I, A>(program: P, args: I) -> Self
    where
        P: Into<String>,
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    fn validate(&self, deadline: Option<Duration>) -> ExecResult<()> {
        if self.program.trim().is_empty() {
            return Err(ExecError::InvalidInvocation(
                "executable name is empty".to_string(),
            ));
        }
        if deadline.is_some_and(|deadline| deadline.is_zero()) {
            return Err(ExecError::InvalidInvocation(format!(
                "deadline for `{}` must be positive",
                self.program
            )));
        }
        Ok(())
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args).stdin(Stdio::null());
        command
    }

    fn launch_error(&self, source: io::Error) -> ExecError {
        ExecError::Launch {
            program: self.program.clone(),
            source,
        }
    }

    fn io_error(&self, source: io::Error) -> ExecError {
        ExecError::Io {
            program: self.program.clone(),
            source,
        }
    }

    /// Run the command, killing it if it is still running after `deadline`
    ///
    /// Standard output and standard error share one pipe, so the captured text
    /// is the interleaved combined output. The child leads its own process
    /// group and on timeout the whole group is killed (Unix only, see
    /// [`crate::group`]).
    ///
    /// Never panics and never retries: every problem ends up in the returned
    /// [`Outcome`].
    pub fn run_bounded(&self, deadline: Duration) -> Outcome {
        if let Err(error) = self.validate(Some(deadline)) {
            return Outcome::Failure {
                error,
                output: String::new(),
            };
        }

        let (reader, writer) = match io::pipe() {
            Ok(pipe) => pipe,
            Err(err) => {
                return Outcome::Failure {
                    error: self.io_error(err),
                    output: String::new(),
                };
            }
        };
        let stderr_writer = match writer.try_clone() {
            Ok(writer) => writer,
            Err(err) => {
                return Outcome::Failure {
                    error: self.io_error(err),
                    output: String::new(),
                };
            }
        };

        let mut command = self.command();
        command.stdout(writer).stderr(stderr_writer);
        group::isolate(&mut command);

        trace!("[{}]: NotStarted -> Running", self);
        let spawned = command.spawn();
        // The command holds our copies of the write end; the reader only sees
        // EOF once they are closed.
        drop(command);

        let mut child = match spawned {
            Ok(child) => child,
            Err(err) => {
                debug!("[{}]: failed to launch: {}", self, err);
                return Outcome::Failure {
                    error: self.launch_error(err),
                    output: String::new(),
                };
            }
        };
        debug!("[{}]: spawned pid {}", self, child.id());

        let capture = match OutputCapture::start(reader) {
            Ok(capture) => capture,
            Err(err) => {
                warn!("[{}]: could not start output reader: {}", self, err);
                group::kill_tree(&mut child);
                return Outcome::Failure {
                    error: self.io_error(err),
                    output: String::new(),
                };
            }
        };

        match child.wait_timeout(deadline) {
            Ok(Some(status)) => {
                let output = capture.finish(OUTPUT_DRAIN_SLACK);
                if status.success() {
                    trace!("[{}]: Running -> Succeeded", self);
                    Outcome::Success { output }
                } else {
                    trace!("[{}]: Running -> Failed ({})", self, status);
                    Outcome::Failure {
                        error: ExecError::NonZeroExit {
                            program: self.program.clone(),
                            code: status.code(),
                        },
                        output,
                    }
                }
            }
            Ok(None) => {
                debug!("[{}]: deadline of {:?} elapsed, killing", self, deadline);
                group::kill_tree(&mut child);
                let partial_output = capture.finish(OUTPUT_DRAIN_SLACK);
                trace!("[{}]: Running -> TimedOut", self);
                Outcome::Timeout {
                    error: ExecError::Timeout {
                        program: self.program.clone(),
                        deadline,
                    },
                    partial_output,
                }
            }
            Err(err) => {
                warn!("[{}]: failed to wait: {}", self, err);
                group::kill_tree(&mut child);
                let output = capture.finish(OUTPUT_DRAIN_SLACK);
                trace!("[{}]: Running -> Failed", self);
                Outcome::Failure {
                    error: self.io_error(err),
                    output,
                }
            }
        }
    }

    /// Run the command to completion, discarding its output
    ///
    /// There is no deadline: this blocks for as long as the command runs.
    pub fn run_silent(&self) -> ExecResult<()> {
        self.validate(None)?;

        trace!("[{}]: NotStarted -> Running (silent)", self);
        let status = self
            .command()
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|err| self.launch_error(err))?;

        if status.success() {
            trace!("[{}]: Running -> Succeeded", self);
            Ok(())
        } else {
            trace!("[{}]: Running -> Failed ({})", self, status);
            Err(ExecError::NonZeroExit {
                program: self.program.clone(),
                code: status.code(),
            })
        }
    }

    /// Start the command and return without waiting for it
    ///
    /// Only a launch failure is reported. The child gets its own process group
    /// and is reaped by a background thread once it exits.
    pub fn run_detached(&self) -> ExecResult<()> {
        self.validate(None)?;

        let mut command = self.command();
        command.stdout(Stdio::null()).stderr(Stdio::null());
        group::isolate(&mut command);

        let mut child = command.spawn().map_err(|err| self.launch_error(err))?;
        let pid = child.id();
        debug!("[{}]: detached pid {}", self, pid);

        let reaper = thread::Builder::new()
            .name(format!("reap-{pid}"))
            .spawn(move || match child.wait() {
                Ok(status) => trace!("detached pid {pid} exited: {status}"),
                Err(err) => warn!("failed to reap detached pid {pid}: {err}"),
            });
        if let Err(err) = reaper {
            warn!("[{}]: could not start reaper thread: {}", self, err);
        }
        Ok(())
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// `RunBounded`: see [`Invocation::run_bounded`]
pub fn run_bounded<S: AsRef<str>>(program: &str, args: &[S], deadline: Duration) -> Outcome {
    invocation(program, args).run_bounded(deadline)
}

/// `RunSilent`: see [`Invocation::run_silent`]
pub fn run_silent<S: AsRef<str>>(program: &str, args: &[S]) -> ExecResult<()> {
    invocation(program, args).run_silent()
}

/// `RunDetached`: see [`Invocation::run_detached`]
pub fn run_detached<S: AsRef<str>>(program: &str, args: &[S]) -> ExecResult<()> {
    invocation(program, args).run_detached()
}

fn invocation<S: AsRef<str>>(program: &str, args: &[S]) -> Invocation {
    Invocation::new(program, args.iter().map(|arg| arg.as_ref().to_string()))
}

/// Drains a pipe on its own thread into a buffer that can be read at any time
struct OutputCapture {
    buf: Arc<Mutex<Vec<u8>>>,
    done: mpsc::Receiver<()>,
}

impl OutputCapture {
    fn start<R: Read + Send + 'static>(source: R) -> io::Result<Self> {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let (done_tx, done) = mpsc::channel();

        let shared = buf.clone();
        thread::Builder::new()
            .name("output-capture".to_string())
            .spawn(move || {
                drain(source, &shared);
                let _ = done_tx.send(());
            })?;

        Ok(Self { buf, done })
    }

    /// Wait up to `slack` for EOF, then return whatever was captured
    fn finish(self, slack: Duration) -> String {
        if self.done.recv_timeout(slack).is_err() {
            debug!("output pipe still open after {:?}, returning partial output", slack);
        }
        let bytes = match self.buf.lock() {
            Ok(buf) => buf.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

/// Read `source` to EOF, keeping at most [`MAX_OUTPUT_SIZE`] bytes
///
/// Past the limit data is still read (so the writer never blocks on a full
/// pipe) but thrown away, and a truncation marker is appended once.
fn drain<R: Read>(mut source: R, buf: &Mutex<Vec<u8>>) {
    let mut chunk = [0u8; 8192];
    let mut truncated = false;

    loop {
        let n = match source.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                trace!("output pipe read error: {}", err);
                break;
            }
        };
        if truncated {
            continue;
        }

        let mut captured = match buf.lock() {
            Ok(captured) => captured,
            Err(poisoned) => poisoned.into_inner(),
        };
        let remaining = MAX_OUTPUT_SIZE.saturating_sub(captured.len());
        let to_copy = n.min(remaining);
        captured.extend_from_slice(&chunk[..to_copy]);
        if to_copy < n {
            captured.extend_from_slice(TRUNCATION_MARKER);
            truncated = true;
        }
    }
}
