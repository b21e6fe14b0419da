//! Companion process supervision.
//!
//! The session never touches OS process APIs directly. It launches or
//! attaches to the companion through a [`ProcessSupervisor`] and keeps the
//! resulting [`CompanionProcess`] only for liveness polling and best-effort
//! termination.

pub mod os;

use std::fmt::Debug;
use std::path::Path;

use crate::Result;

/// Flag that starts the companion in automatic update (wait) mode.
pub const AUTOUPDATE_FLAG: &str = "/autoupdate";

/// Handle to a spawned or attached companion process.
pub trait CompanionProcess: Send + Debug {
    /// OS process id, when known.
    fn pid(&self) -> Option<u32>;

    /// Whether the process is still running.
    fn is_alive(&mut self) -> bool;

    /// Best-effort termination. Never fails, including when the process has
    /// already exited.
    fn kill(&mut self);
}

/// Launches, finds, and terminates companion processes.
pub trait ProcessSupervisor: Send + Sync {
    /// Launch the executable at `path` with `args`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Launch` if the executable is missing, unreadable,
    /// or cannot be started.
    fn spawn(&self, path: &Path, args: &[String]) -> Result<Box<dyn CompanionProcess>>;

    /// Track an already running process.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Attach` if no process with `pid` exists.
    fn attach(&self, pid: u32) -> Result<Box<dyn CompanionProcess>>;
}

/// Launch arguments: the autoupdate flag followed by `extra`, verbatim.
#[must_use]
pub fn launch_arguments(extra: &[String]) -> Vec<String> {
    let mut args = Vec::with_capacity(extra.len() + 1);
    args.push(AUTOUPDATE_FLAG.to_owned());
    args.extend(extra.iter().cloned());
    args
}
