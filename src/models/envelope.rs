//! Wire-level unit exchanged with the companion.

use serde::{Deserialize, Serialize};

use crate::models::command::{Command, ExtraDatum};
use crate::models::workflow::{ResponseKind, UpdateAction, UpdateStep};

/// One decoded unit of wire communication.
///
/// The process id and the companion's window handle are separate optional
/// fields; only control replies and `RestartInfo` responses fill them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Envelope {
    /// Requested or reported action.
    pub action: UpdateAction,
    /// Response kind; [`ResponseKind::Nothing`] on outbound commands.
    #[serde(default)]
    pub response: ResponseKind,
    /// Workflow step the envelope refers to.
    pub step: UpdateStep,
    /// Companion process id (`GetProcessId` replies, process replacement).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_id: Option<u32>,
    /// Companion top-level window handle (`RestartInfo` responses).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_handle: Option<i64>,
    /// Ordered extra data.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<ExtraDatum>,
}

impl Envelope {
    /// Response envelope for `step`, mostly useful for building companion
    /// replies.
    #[must_use]
    pub fn response(step: UpdateStep, response: ResponseKind) -> Self {
        Self {
            action: UpdateAction::UpdateStep,
            response,
            step,
            ..Self::default()
        }
    }

    /// Text of the first extra-data entry, if any.
    #[must_use]
    pub fn first_text(&self) -> Option<&str> {
        self.extra.first().map(|datum| datum.text.as_str())
    }
}

impl From<&Command> for Envelope {
    fn from(command: &Command) -> Self {
        Self {
            action: command.action(),
            response: ResponseKind::Nothing,
            step: command.step(),
            process_id: None,
            window_handle: None,
            extra: command.extra().to_vec(),
        }
    }
}
