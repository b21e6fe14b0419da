//! Update session: the caller-facing handle over the session actor.
//!
//! [`UpdateSession`] is a cheap front for an actor task that owns the channel,
//! the companion process, the command backlog, and the step tracker. Every
//! public operation is a message post; nothing here blocks or fails. Results
//! come back as [`SessionEvent`]s on the receiver returned by
//! [`SessionBuilder::spawn`].

mod actor;
pub mod dispatcher;
pub mod events;
pub mod router;
pub mod steps;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, Instrument};

use crate::config::SessionConfig;
use crate::ipc::channel::ChannelFactory;
use crate::ipc::codec::{Codec, JsonCodec};
use crate::ipc::socket::LocalSocketFactory;
use crate::models::{Command, RestartInfo, UpdateStep};
use crate::process::os::OsSupervisor;
use crate::process::ProcessSupervisor;
use crate::window::{NoopActivator, WindowActivator};

use self::actor::{Actor, Collaborators, Request};

pub use dispatcher::RetryPolicy;
pub use events::{SessionEvent, SessionSnapshot, PREMATURE_EXIT};
pub use router::{ResponseRouter, Route};
pub use steps::{Resume, StepTracker};

/// Configures and starts an [`UpdateSession`].
///
/// Collaborators default to the local socket transport, the OS process
/// supervisor, the JSON codec, and a logging-only window activator.
pub struct SessionBuilder {
    config: SessionConfig,
    factory: Arc<dyn ChannelFactory>,
    codec: Arc<dyn Codec>,
    supervisor: Arc<dyn ProcessSupervisor>,
    activator: Arc<dyn WindowActivator>,
}

impl SessionBuilder {
    /// Use a different channel transport.
    #[must_use]
    pub fn channel_factory(mut self, factory: Arc<dyn ChannelFactory>) -> Self {
        self.factory = factory;
        self
    }

    /// Use a different envelope codec.
    #[must_use]
    pub fn codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = codec;
        self
    }

    /// Use a different process supervisor.
    #[must_use]
    pub fn supervisor(mut self, supervisor: Arc<dyn ProcessSupervisor>) -> Self {
        self.supervisor = supervisor;
        self
    }

    /// Use a different window activator.
    #[must_use]
    pub fn window_activator(mut self, activator: Arc<dyn WindowActivator>) -> Self {
        self.activator = activator;
        self
    }

    /// Start the session actor on the current tokio runtime.
    ///
    /// Returns the handle and the receiver for session events.
    #[must_use]
    pub fn spawn(self) -> (UpdateSession, mpsc::UnboundedReceiver<SessionEvent>) {
        let session_id = uuid::Uuid::new_v4().to_string();
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let span = info_span!("update_session", session_id = %session_id);
        let (actor, mailboxes) = span.in_scope(|| {
            Actor::new(
                self.config,
                Collaborators {
                    factory: self.factory,
                    codec: self.codec,
                    supervisor: self.supervisor,
                    activator: self.activator,
                },
                event_tx,
                request_rx,
                cancel.clone(),
            )
        });

        tokio::spawn(actor.run(mailboxes).instrument(span));
        info!(session_id = %session_id, "update session started");

        let session = UpdateSession {
            session_id,
            requests: request_tx,
            disposed: AtomicBool::new(false),
            cancel,
        };
        (session, event_rx)
    }
}

/// Handle to a running update session.
///
/// Dropping the handle disposes the session.
#[derive(Debug)]
pub struct UpdateSession {
    session_id: String,
    requests: mpsc::UnboundedSender<Request>,
    disposed: AtomicBool,
    cancel: CancellationToken,
}

impl UpdateSession {
    /// Start configuring a session.
    #[must_use]
    pub fn builder(config: SessionConfig) -> SessionBuilder {
        SessionBuilder {
            config,
            factory: Arc::new(LocalSocketFactory),
            codec: Arc::new(JsonCodec),
            supervisor: Arc::new(OsSupervisor),
            activator: Arc::new(NoopActivator),
        }
    }

    /// Start a session with the default collaborators.
    #[must_use]
    pub fn spawn(config: SessionConfig) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        Self::builder(config).spawn()
    }

    /// Unique id of this session, as logged in its span.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Whether [`dispose`](Self::dispose) has run.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Ask the companion to check for an update.
    pub fn check_for_update(&self) {
        self.enqueue(Command::for_step(UpdateStep::CheckForUpdate));
    }

    /// Ask the companion to check again, ignoring any cached result.
    pub fn force_recheck_for_update(&self) {
        self.enqueue(Command::for_step(UpdateStep::ForceRecheckForUpdate));
    }

    /// Ask the companion to download the update it found.
    pub fn download_update(&self) {
        self.enqueue(Command::for_step(UpdateStep::DownloadUpdate));
    }

    /// Ask the companion to extract the downloaded update.
    pub fn begin_extraction(&self) {
        self.enqueue(Command::for_step(UpdateStep::BeginExtraction));
    }

    /// Tell the companion how to restart the caller after installing.
    pub fn restart_info(&self, info: &RestartInfo) {
        self.enqueue(Command::restart_info(info));
    }

    /// Bring the companion's window forward and ask it to install.
    pub fn install_now(&self) {
        self.post(Request::InstallNow);
    }

    /// Ask the companion to cancel whatever it is doing.
    pub fn cancel(&self) {
        self.enqueue(Command::cancel());
    }

    /// Queue an arbitrary command.
    pub fn enqueue(&self, command: Command) {
        self.post(Request::Enqueue(command));
    }

    /// Start or stop holding back responses. Progress received while
    /// buffering is discarded.
    pub fn set_buffering(&self, enabled: bool) {
        self.post(Request::SetBuffering(enabled));
    }

    /// Stop buffering and deliver held responses in arrival order.
    pub fn flush_responses(&self) {
        self.post(Request::Flush);
    }

    /// Change where the companion executable lives. Takes effect the next
    /// time the companion has to be started.
    pub fn set_updater_location(&self, location: impl Into<String>) {
        self.post(Request::SetUpdaterLocation(location.into()));
    }

    /// Replace the arguments passed after the autoupdate flag.
    pub fn set_extra_arguments(&self, arguments: Vec<String>) {
        self.post(Request::SetExtraArguments(arguments));
    }

    /// Current session state, or `None` once disposed.
    pub async fn snapshot(&self) -> Option<SessionSnapshot> {
        if self.is_disposed() {
            return None;
        }
        let (reply, response) = oneshot::channel();
        self.post(Request::Snapshot(reply));
        response.await.ok()
    }

    /// Stop the session. Disconnects the channel, interrupts any retry or
    /// poll loop, and silences further events. Idempotent.
    ///
    /// The companion process is left running.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.cancel.cancel();
        let _ = self.requests.send(Request::Dispose);
        debug!(session_id = %self.session_id, "update session disposing");
    }

    fn post(&self, request: Request) {
        if self.is_disposed() {
            return;
        }
        if self.requests.send(request).is_err() {
            debug!(session_id = %self.session_id, "session actor already stopped");
        }
    }
}

impl Drop for UpdateSession {
    fn drop(&mut self) {
        self.dispose();
    }
}
