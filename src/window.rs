//! Companion window activation.
//!
//! The companion reports its top-level window handle with its `RestartInfo`
//! response. Before installing, the session hands that handle to a
//! [`WindowActivator`] so the host can bring the companion's UI forward.

use std::fmt::Debug;

use tracing::debug;

/// Brings the companion's window to the foreground.
pub trait WindowActivator: Send + Sync + Debug {
    /// Restore and focus the window identified by `handle`.
    fn bring_to_front(&self, handle: i64);
}

/// Activator for hosts without a windowing system. Only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopActivator;

impl WindowActivator for NoopActivator {
    fn bring_to_front(&self, handle: i64) {
        debug!(handle, "window activation requested; no activator installed");
    }
}
