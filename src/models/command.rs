//! Outbound commands queued by the session.

use serde::{Deserialize, Serialize};

use crate::models::workflow::{UpdateAction, UpdateStep};

/// One entry of an envelope's extra data.
///
/// The rich-text bit travels in parallel with the text on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtraDatum {
    /// Payload text.
    pub text: String,
    /// Whether the text is rich text.
    #[serde(default)]
    pub is_rich_text: bool,
}

impl ExtraDatum {
    /// Plain-text entry.
    #[must_use]
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_rich_text: false,
        }
    }

    /// Entry with an explicit rich-text bit.
    #[must_use]
    pub fn flagged(text: impl Into<String>, is_rich_text: bool) -> Self {
        Self {
            text: text.into(),
            is_rich_text,
        }
    }
}

/// Information the companion needs to restart the caller after installing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestartInfo {
    /// Executable to run once the update is installed.
    pub file_to_execute: String,
    /// Identifier of the automatic update, if any.
    pub auto_update_id: Option<String>,
    /// Arguments for the restarted executable. Only sent alongside an
    /// update identifier.
    pub arguments_for_files: Option<String>,
    /// Whether the restarted executable is a service.
    pub is_service: bool,
}

/// A typed request for the companion. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    action: UpdateAction,
    step: UpdateStep,
    extra: Vec<ExtraDatum>,
}

impl Command {
    /// Ordinary workflow command for `step`.
    #[must_use]
    pub fn for_step(step: UpdateStep) -> Self {
        Self {
            action: UpdateAction::UpdateStep,
            step,
            extra: Vec::new(),
        }
    }

    /// Cancel whatever the companion is doing.
    ///
    /// Targets the start of the workflow, so dispatching it resets the
    /// believed step.
    #[must_use]
    pub fn cancel() -> Self {
        Self {
            action: UpdateAction::Cancel,
            step: UpdateStep::CheckForUpdate,
            extra: Vec::new(),
        }
    }

    /// Ask a discovered companion for its process id.
    #[must_use]
    pub fn process_id_query() -> Self {
        Self {
            action: UpdateAction::GetProcessId,
            step: UpdateStep::CheckForUpdate,
            extra: Vec::new(),
        }
    }

    /// Restart information for the companion.
    ///
    /// The first entry's rich-text bit carries the service flag. The update
    /// identifier is only sent when present, and the per-file arguments only
    /// when the identifier is.
    #[must_use]
    pub fn restart_info(info: &RestartInfo) -> Self {
        let mut extra = vec![ExtraDatum::flagged(
            info.file_to_execute.clone(),
            info.is_service,
        )];

        if let Some(id) = info.auto_update_id.as_deref().filter(|id| !id.is_empty()) {
            extra.push(ExtraDatum::plain(id));

            if let Some(args) = info
                .arguments_for_files
                .as_deref()
                .filter(|args| !args.is_empty())
            {
                extra.push(ExtraDatum::plain(args));
            }
        }

        Self {
            action: UpdateAction::UpdateStep,
            step: UpdateStep::RestartInfo,
            extra,
        }
    }

    /// Action requested by this command.
    #[must_use]
    pub fn action(&self) -> UpdateAction {
        self.action
    }

    /// Workflow step this command represents.
    #[must_use]
    pub fn step(&self) -> UpdateStep {
        self.step
    }

    /// Extra data entries in order.
    #[must_use]
    pub fn extra(&self) -> &[ExtraDatum] {
        &self.extra
    }
}
