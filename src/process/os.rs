//! Operating-system process supervisor.
//!
//! Spawns the companion with `tokio::process` and, on unix, attaches to
//! discovered companions by pid using `nix` signals. The companion is meant
//! to outlive a disposed session, so spawned children are not killed on
//! drop.

use std::path::Path;
use std::process::Stdio;

use tokio::process::{Child, Command};
use tracing::{debug, info};

use crate::process::{CompanionProcess, ProcessSupervisor};
use crate::{AppError, Result};

/// [`ProcessSupervisor`] backed by the host OS.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsSupervisor;

impl ProcessSupervisor for OsSupervisor {
    fn spawn(&self, path: &Path, args: &[String]) -> Result<Box<dyn CompanionProcess>> {
        let metadata = std::fs::metadata(path).map_err(|err| {
            AppError::Launch(format!("cannot read updater '{}': {err}", path.display()))
        })?;
        if !metadata.is_file() {
            return Err(AppError::Launch(format!(
                "updater '{}' is not a file",
                path.display()
            )));
        }

        let child = Command::new(path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| {
                AppError::Launch(format!("failed to spawn '{}': {err}", path.display()))
            })?;

        info!(
            pid = child.id().unwrap_or(0),
            updater = %path.display(),
            "companion process spawned"
        );

        Ok(Box::new(SpawnedProcess { child }))
    }

    #[cfg(unix)]
    fn attach(&self, pid: u32) -> Result<Box<dyn CompanionProcess>> {
        let raw = i32::try_from(pid)
            .map_err(|_| AppError::Attach(format!("process id {pid} is out of range")))?;
        let target = nix::unistd::Pid::from_raw(raw);

        nix::sys::signal::kill(target, None)
            .map_err(|err| AppError::Attach(format!("no process with id {pid}: {err}")))?;

        debug!(pid, "attached to companion process");
        Ok(Box::new(AttachedProcess { pid, target }))
    }

    #[cfg(not(unix))]
    fn attach(&self, pid: u32) -> Result<Box<dyn CompanionProcess>> {
        Err(AppError::Attach(format!(
            "attaching to process {pid} is not supported on this platform"
        )))
    }
}

/// Child launched by this session.
#[derive(Debug)]
struct SpawnedProcess {
    child: Child,
}

impl CompanionProcess for SpawnedProcess {
    fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    fn kill(&mut self) {
        if let Err(err) = self.child.start_kill() {
            debug!(%err, "companion kill ignored");
        }
    }
}

/// Process discovered through its channel and attached by pid.
#[cfg(unix)]
#[derive(Debug)]
struct AttachedProcess {
    pid: u32,
    target: nix::unistd::Pid,
}

#[cfg(unix)]
impl CompanionProcess for AttachedProcess {
    fn pid(&self) -> Option<u32> {
        Some(self.pid)
    }

    fn is_alive(&mut self) -> bool {
        nix::sys::signal::kill(self.target, None).is_ok()
    }

    fn kill(&mut self) {
        if let Err(err) = nix::sys::signal::kill(self.target, nix::sys::signal::Signal::SIGKILL) {
            debug!(pid = self.pid, %err, "companion kill ignored");
        }
    }
}
