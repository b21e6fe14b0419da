//! Workflow vocabulary shared by commands and envelopes.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Position in the update workflow.
///
/// Held by the session as its believed step and reported by the companion
/// on every ordinary response.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UpdateStep {
    /// Ask the companion whether an update is available.
    #[default]
    CheckForUpdate,
    /// Check again, ignoring any cached result.
    ForceRecheckForUpdate,
    /// Download the available update.
    DownloadUpdate,
    /// Extract the downloaded update.
    BeginExtraction,
    /// Hand over the information needed to restart the caller after install.
    RestartInfo,
    /// Install the extracted update.
    Install,
}

impl UpdateStep {
    /// The step identity the session tracks for this step.
    ///
    /// A forced re-check is still a check as far as the workflow is concerned.
    #[must_use]
    pub fn normalized(self) -> Self {
        match self {
            Self::ForceRecheckForUpdate => Self::CheckForUpdate,
            other => other,
        }
    }
}

impl Display for UpdateStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::CheckForUpdate => "check_for_update",
            Self::ForceRecheckForUpdate => "force_recheck_for_update",
            Self::DownloadUpdate => "download_update",
            Self::BeginExtraction => "begin_extraction",
            Self::RestartInfo => "restart_info",
            Self::Install => "install",
        };
        f.write_str(name)
    }
}

/// What an envelope asks for or reports.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UpdateAction {
    /// Ordinary workflow traffic; the envelope's step says which one.
    #[default]
    UpdateStep,
    /// Abort whatever the companion is doing.
    Cancel,
    /// Ask for (or reply with) the companion's process id.
    GetProcessId,
    /// The companion replaced itself with a new process on a new channel.
    NewCompanionProcess,
}

impl UpdateAction {
    /// Whether the action is handled by process supervision rather than
    /// delivered to the caller.
    #[must_use]
    pub fn is_control(self) -> bool {
        matches!(self, Self::GetProcessId | Self::NewCompanionProcess)
    }
}

/// Kind of response carried by an inbound envelope.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    /// No response; outbound commands always carry this.
    #[default]
    Nothing,
    /// The step completed.
    Succeeded,
    /// The step failed.
    Failed,
    /// Intermediate progress report.
    Progress,
}
