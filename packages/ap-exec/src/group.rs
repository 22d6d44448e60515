//! Process group isolation for spawned children.
//!
//! On Unix every child is made the leader of a fresh process group, so the whole
//! subtree (including grandchildren started by a shell wrapper) can be killed
//! with one signal.
//!
//! On other platforms only the direct child is terminated. Grandchildren it
//! spawned may survive a timeout.
//!
//! A child in its own group is out of reach of terminal signals such as
//! Ctrl-C, so it outlives a parent that is interrupted while waiting on it.

use std::process::{Child, Command};

/// Make the command start as the leader of its own process group
pub fn isolate(command: &mut Command) {
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    #[cfg(not(unix))]
    {
        let _ = command;
    }
}

/// Kill the child and everything in its process group, then reap it
pub fn kill_tree(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::{
            sys::signal::{Signal, killpg},
            unistd::Pid,
        };
        use tracing::{trace, warn};

        let pgid = Pid::from_raw(child.id() as i32);
        trace!("sending SIGKILL to process group {pgid}");
        if let Err(err) = killpg(pgid, Signal::SIGKILL) {
            // ESRCH: the group is already gone
            warn!("killpg({pgid}) failed: {err}");
        }
    }

    // Also covers the non-unix case, and is harmless if the child already exited
    let _ = child.kill();
    let _ = child.wait();
}
