//! Caller-facing session events.

use crate::models::{Envelope, ResponseKind, UpdateStep};

/// Reason attached to [`SessionEvent::Disconnected`] when the companion's
/// channel closes on its own.
pub const PREMATURE_EXIT: &str = "the updater exited prematurely";

/// Notification emitted by an [`UpdateSession`](super::UpdateSession).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The companion reported progress or a result.
    Progress(Envelope),
    /// The companion reported a different step than the session believed in.
    StepMismatch {
        /// Response kind of the envelope that diverged.
        response: ResponseKind,
        /// Step the session believed in before the envelope arrived.
        previous: UpdateStep,
    },
    /// The companion is gone: it exited, could not be started, or stopped
    /// accepting commands. Pending commands have been dropped when this comes
    /// from a failed dispatch.
    Disconnected {
        /// Believed step at the time.
        step: UpdateStep,
        /// Human-readable reason.
        reason: String,
    },
    /// The companion's process could not be identified or reattached. The
    /// session keeps going.
    ProcessUnreachable {
        /// Believed step at the time.
        step: UpdateStep,
        /// Human-readable reason.
        reason: String,
    },
    /// A replacement companion needs the restart information again.
    ResendRestartInfo,
}

/// Point-in-time view of the session, for diagnostics and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Believed workflow step.
    pub step: UpdateStep,
    /// Whether a command is being dispatched.
    pub in_flight: bool,
    /// Commands waiting behind the in-flight one.
    pub backlog: usize,
    /// Whether responses are being buffered.
    pub buffering: bool,
    /// Responses waiting for a flush.
    pub buffered: usize,
    /// Whether the current channel adapter is connected.
    pub connected: bool,
    /// Generation of the current channel adapter.
    pub generation: u64,
    /// Cached companion window handle.
    pub window_handle: Option<i64>,
}
