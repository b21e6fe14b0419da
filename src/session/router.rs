//! Inbound envelope classification and response buffering.
//!
//! | Envelope                         | Buffering off          | Buffering on            |
//! |----------------------------------|------------------------|-------------------------|
//! | `GetProcessId` reply             | [`Route::ProcessId`]   | [`Route::ProcessId`]    |
//! | `NewCompanionProcess`            | [`Route::NewCompanion`]| [`Route::NewCompanion`] |
//! | `Progress` response              | [`Route::Deliver`]     | [`Route::Dropped`]      |
//! | any other response               | [`Route::Deliver`]     | [`Route::Buffered`]     |

use crate::models::{Envelope, ResponseKind, UpdateAction};

/// Where an inbound envelope goes next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Reply to a process id query.
    ProcessId(Option<u32>),
    /// The companion replaced itself.
    NewCompanion(Envelope),
    /// Held for the next flush.
    Buffered,
    /// Progress received while buffering; discarded.
    Dropped,
    /// Deliver to the step tracker and the caller now.
    Deliver(Envelope),
}

/// Classifies envelopes and holds buffered responses.
#[derive(Debug, Default)]
pub struct ResponseRouter {
    buffering: bool,
    buffer: Vec<Envelope>,
}

impl ResponseRouter {
    /// Router with buffering disabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether responses are currently being buffered.
    #[must_use]
    pub fn is_buffering(&self) -> bool {
        self.buffering
    }

    /// Number of envelopes waiting for a flush.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Start or stop buffering. Stopping does not deliver anything; use
    /// [`flush`](Self::flush) for that.
    pub fn set_buffering(&mut self, enabled: bool) {
        self.buffering = enabled;
    }

    /// Classify `envelope`, buffering it when appropriate.
    pub fn route(&mut self, envelope: Envelope) -> Route {
        if envelope.action.is_control() {
            return if envelope.action == UpdateAction::GetProcessId {
                Route::ProcessId(envelope.process_id)
            } else {
                Route::NewCompanion(envelope)
            };
        }

        if !self.buffering {
            return Route::Deliver(envelope);
        }

        if envelope.response == ResponseKind::Progress {
            Route::Dropped
        } else {
            self.buffer.push(envelope);
            Route::Buffered
        }
    }

    /// Stop buffering and hand back everything held, in arrival order.
    pub fn flush(&mut self) -> Vec<Envelope> {
        self.buffering = false;
        std::mem::take(&mut self.buffer)
    }
}
