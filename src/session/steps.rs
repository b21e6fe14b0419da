//! Believed-step tracking.
//!
//! The session keeps its own idea of where the workflow is. Outbound commands
//! move it forward; inbound ordinary responses are authoritative and override
//! it when they disagree. A disagreement is reported to the caller as a
//! mismatch carrying the step the session believed in before.

use crate::models::{Command, UpdateStep};

/// What to do after the companion has been replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resume {
    /// Ask the caller to rebuild and resend its restart information.
    ResendRestartInfo,
    /// Re-enqueue this command to resynchronize the new companion.
    Reenqueue(Command),
}

/// Tracks the believed workflow step.
#[derive(Debug, Clone, Default)]
pub struct StepTracker {
    believed: UpdateStep,
}

impl StepTracker {
    /// Tracker starting at [`UpdateStep::CheckForUpdate`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current believed step.
    #[must_use]
    pub fn believed(&self) -> UpdateStep {
        self.believed
    }

    /// Record an outbound command for `step`.
    pub fn advance(&mut self, step: UpdateStep) {
        self.believed = step.normalized();
    }

    /// Record the step reported by an inbound ordinary envelope.
    ///
    /// Returns the previous believed step when the report differs from it.
    pub fn observe(&mut self, reported: UpdateStep) -> Option<UpdateStep> {
        if reported == self.believed {
            return None;
        }

        let previous = self.believed;
        self.believed = reported;
        Some(previous)
    }

    /// How to pick the workflow back up with a replacement companion.
    ///
    /// Restart information is not cached, so the caller has to resend it.
    #[must_use]
    pub fn resume(&self) -> Resume {
        match self.believed {
            UpdateStep::RestartInfo => Resume::ResendRestartInfo,
            step => Resume::Reenqueue(Command::for_step(step)),
        }
    }
}
