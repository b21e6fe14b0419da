//! Session actor: the single owner of all mutable session state.
//!
//! Three mailboxes feed the actor, polled in this priority order:
//!
//! | Mailbox   | Sender                          | Payload            |
//! |-----------|---------------------------------|--------------------|
//! | requests  | [`UpdateSession`] handle        | [`Request`]        |
//! | channel   | current channel adapter         | [`ChannelEvent`]   |
//! | workers   | dispatcher worker tasks         | [`DispatchReport`] |
//!
//! Requests come first so that commands enqueued while a worker is busy are
//! in the backlog before that worker's report is looked at.
//!
//! [`UpdateSession`]: super::UpdateSession

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::{resolve_updater_path, BacklogOrder, SessionConfig};
use crate::ipc::channel::{Channel, ChannelEvent, ChannelEventKind, ChannelEventSender, ChannelFactory};
use crate::ipc::codec::Codec;
use crate::models::{Command, Envelope, ResponseKind, UpdateAction, UpdateStep};
use crate::process::{launch_arguments, CompanionProcess, ProcessSupervisor};
use crate::session::dispatcher::{self, DispatchJob, DispatchReport, RetryPolicy, Startup};
use crate::session::events::{SessionEvent, SessionSnapshot, PREMATURE_EXIT};
use crate::session::router::{ResponseRouter, Route};
use crate::session::steps::{Resume, StepTracker};
use crate::window::WindowActivator;
use crate::AppError;

/// Message from the session handle.
#[derive(Debug)]
pub(crate) enum Request {
    Enqueue(Command),
    InstallNow,
    SetBuffering(bool),
    Flush,
    SetUpdaterLocation(String),
    SetExtraArguments(Vec<String>),
    Snapshot(oneshot::Sender<SessionSnapshot>),
    Dispose,
}

/// Collaborators injected by the session builder.
pub(crate) struct Collaborators {
    pub factory: Arc<dyn ChannelFactory>,
    pub codec: Arc<dyn Codec>,
    pub supervisor: Arc<dyn ProcessSupervisor>,
    pub activator: Arc<dyn WindowActivator>,
}

/// Receiving ends of the actor's mailboxes.
pub(crate) struct Mailboxes {
    pub requests: mpsc::UnboundedReceiver<Request>,
    pub channel: mpsc::UnboundedReceiver<ChannelEvent>,
    pub workers: mpsc::UnboundedReceiver<DispatchReport>,
}

pub(crate) struct Actor {
    config: SessionConfig,
    policy: RetryPolicy,
    updater_path: Option<PathBuf>,
    collaborators: Collaborators,
    channel: Arc<dyn Channel>,
    channel_tx: ChannelEventSender,
    worker_tx: mpsc::UnboundedSender<DispatchReport>,
    events: mpsc::UnboundedSender<SessionEvent>,
    process: Option<Box<dyn CompanionProcess>>,
    awaiting_pid: bool,
    in_flight: bool,
    backlog: VecDeque<Command>,
    steps: StepTracker,
    router: ResponseRouter,
    window_handle: Option<i64>,
    cancel: CancellationToken,
}

impl Actor {
    /// Build the actor and the mailboxes it will drain.
    pub(crate) fn new(
        config: SessionConfig,
        collaborators: Collaborators,
        events: mpsc::UnboundedSender<SessionEvent>,
        requests: mpsc::UnboundedReceiver<Request>,
        cancel: CancellationToken,
    ) -> (Self, Mailboxes) {
        let (channel_tx, channel_rx) = mpsc::unbounded_channel();
        let (worker_tx, worker_rx) = mpsc::unbounded_channel();

        let updater_path = resolve_location(&config.updater_location);
        let channel = collaborators.factory.create(0, channel_tx.clone());

        let actor = Self {
            policy: RetryPolicy::from(&config.retry),
            config,
            updater_path,
            collaborators,
            channel,
            channel_tx,
            worker_tx,
            events,
            process: None,
            awaiting_pid: false,
            in_flight: false,
            backlog: VecDeque::new(),
            steps: StepTracker::new(),
            router: ResponseRouter::new(),
            window_handle: None,
            cancel,
        };

        let mailboxes = Mailboxes {
            requests,
            channel: channel_rx,
            workers: worker_rx,
        };

        (actor, mailboxes)
    }

    /// Drain the mailboxes until disposal.
    pub(crate) async fn run(mut self, mut mailboxes: Mailboxes) {
        loop {
            tokio::select! {
                biased;

                () = self.cancel.cancelled() => break,

                request = mailboxes.requests.recv() => match request {
                    Some(Request::Dispose) | None => break,
                    Some(request) => self.handle_request(request),
                },

                Some(event) = mailboxes.channel.recv() => self.handle_channel_event(event).await,

                Some(report) = mailboxes.workers.recv() => self.handle_report(report).await,
            }
        }

        self.cancel.cancel();
        self.channel.disconnect().await;
        info!("update session disposed");
    }

    fn handle_request(&mut self, request: Request) {
        match request {
            Request::Enqueue(command) => self.enqueue(command),
            Request::InstallNow => {
                if let Some(handle) = self.window_handle {
                    self.collaborators.activator.bring_to_front(handle);
                }
                self.enqueue(Command::for_step(UpdateStep::Install));
            }
            Request::SetBuffering(enabled) => {
                debug!(enabled, "response buffering toggled");
                self.router.set_buffering(enabled);
            }
            Request::Flush => {
                let held = self.router.flush();
                debug!(count = held.len(), "flushing buffered responses");
                for envelope in held {
                    self.deliver(envelope);
                }
            }
            Request::SetUpdaterLocation(location) => {
                self.updater_path = resolve_location(&location);
                self.config.updater_location = location;
            }
            Request::SetExtraArguments(arguments) => self.config.extra_arguments = arguments,
            Request::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            Request::Dispose => {}
        }
    }

    // ── Dispatch ──────────────────────────────────────────────────────────────

    fn enqueue(&mut self, command: Command) {
        if self.in_flight {
            self.backlog.push_back(command);
            debug!(backlog = self.backlog.len(), "command queued behind in-flight dispatch");
        } else {
            self.dispatch(command);
        }
    }

    fn next_from_backlog(&mut self) -> Option<Command> {
        match self.config.backlog_order {
            BacklogOrder::Lifo => self.backlog.pop_back(),
            BacklogOrder::Fifo => self.backlog.pop_front(),
        }
    }

    /// Make `command` the in-flight one and start its worker.
    fn dispatch(&mut self, command: Command) {
        // The believed step moves when the command goes out, before the
        // companion can possibly answer it.
        self.steps.advance(command.step());
        self.in_flight = true;

        let startup = self.needs_startup().then(|| Startup {
            updater_path: self.updater_path.clone(),
            arguments: launch_arguments(&self.config.extra_arguments),
        });
        // A startup may find a running companion and ask for its pid. The
        // reply can land before this worker reports, so only the reply or a
        // failed query clears the flag.
        if startup.is_some() {
            self.awaiting_pid = true;
        }

        let span = info_span!(
            "dispatch",
            step = %command.step(),
            action = ?command.action(),
            startup = startup.is_some()
        );

        let job = DispatchJob {
            command,
            channel: Arc::clone(&self.channel),
            codec: Arc::clone(&self.collaborators.codec),
            supervisor: Arc::clone(&self.collaborators.supervisor),
            startup,
            policy: self.policy,
            cancel: self.cancel.clone(),
        };

        let worker_tx = self.worker_tx.clone();
        tokio::spawn(
            async move {
                let report = dispatcher::run(job).await;
                let _ = worker_tx.send(report);
            }
            .instrument(span),
        );
    }

    /// A companion is usable when the channel is up and its process is either
    /// alive or about to be identified.
    fn needs_startup(&mut self) -> bool {
        if !self.channel.is_connected() {
            return true;
        }
        if self.awaiting_pid {
            return false;
        }
        !self.process.as_mut().is_some_and(|process| process.is_alive())
    }

    async fn handle_report(&mut self, report: DispatchReport) {
        self.in_flight = false;

        if let Some(process) = report.spawned {
            self.process = Some(process);
            self.awaiting_pid = false;
        }
        if report.discovered {
            debug!(awaiting_pid = self.awaiting_pid, "reattached to a running companion");
        }
        if let Some(err) = report.process_id_error {
            self.awaiting_pid = false;
            warn!(%err, "companion process id unavailable");
            self.emit_unreachable(&err);
        }

        match report.outcome {
            Ok(()) => {
                if let Some(next) = self.next_from_backlog() {
                    self.dispatch(next);
                }
            }
            Err(err) => {
                warn!(
                    %err,
                    step = %report.command.step(),
                    dropped = self.backlog.len(),
                    "dispatch failed; abandoning backlog"
                );
                // Retire the channel first: the killed companion closing its
                // end must not read as a second, premature exit.
                if self.channel.is_connected() {
                    self.channel.disconnect().await;
                    self.renew_channel();
                }
                self.drop_process();
                self.backlog.clear();
                self.emit(SessionEvent::Disconnected {
                    step: self.steps.believed(),
                    reason: err.to_string(),
                });
            }
        }
    }

    // ── Inbound ───────────────────────────────────────────────────────────────

    async fn handle_channel_event(&mut self, event: ChannelEvent) {
        if event.generation != self.channel.generation() {
            debug!(generation = event.generation, "ignoring event from a retired channel");
            return;
        }

        match event.kind {
            ChannelEventKind::Message(bytes) => match self.collaborators.codec.decode(&bytes) {
                Ok(envelope) => self.route(envelope).await,
                Err(err) => warn!(%err, "undecodable envelope skipped"),
            },
            ChannelEventKind::Disconnected => {
                warn!(generation = event.generation, "companion channel closed");
                self.process = None;
                self.awaiting_pid = false;
                self.renew_channel();
                self.emit(SessionEvent::Disconnected {
                    step: self.steps.believed(),
                    reason: PREMATURE_EXIT.into(),
                });
            }
        }
    }

    async fn route(&mut self, envelope: Envelope) {
        match self.router.route(envelope) {
            Route::ProcessId(pid) => self.adopt_process(pid),
            Route::NewCompanion(envelope) => self.replace_companion(envelope).await,
            Route::Buffered => debug!(held = self.router.buffered_len(), "response buffered"),
            Route::Dropped => debug!("progress dropped while buffering"),
            Route::Deliver(envelope) => self.deliver(envelope),
        }
    }

    /// Ordinary delivery: step reconciliation, window handle caching, and
    /// the caller's progress event.
    fn deliver(&mut self, envelope: Envelope) {
        if let Some(previous) = self.steps.observe(envelope.step) {
            info!(
                previous = %previous,
                reported = %envelope.step,
                "companion diverged from the requested step"
            );
            self.emit(SessionEvent::StepMismatch {
                response: envelope.response,
                previous,
            });
        }

        if envelope.action == UpdateAction::UpdateStep && envelope.step == UpdateStep::RestartInfo {
            if let Some(handle) = envelope.window_handle {
                self.window_handle = Some(handle);
            }
        }

        if envelope.response != ResponseKind::Nothing {
            self.emit(SessionEvent::Progress(envelope));
        }
    }

    fn adopt_process(&mut self, pid: Option<u32>) {
        self.awaiting_pid = false;
        match self.attach(pid) {
            Ok(process) => {
                debug!(pid = ?process.pid(), "companion process identified");
                self.process = Some(process);
            }
            Err(err) => {
                warn!(%err, "cannot attach to companion process");
                self.emit_unreachable(&err);
            }
        }
    }

    fn attach(&self, pid: Option<u32>) -> crate::Result<Box<dyn CompanionProcess>> {
        let pid = pid.ok_or_else(|| {
            AppError::ProcessUnreachable("the updater did not report a process id".into())
        })?;
        self.collaborators.supervisor.attach(pid)
    }

    /// The companion handed over to a new process listening on a new channel.
    async fn replace_companion(&mut self, envelope: Envelope) {
        info!(pid = ?envelope.process_id, "companion replaced itself; reconnecting");

        self.channel.disconnect().await;
        self.renew_channel();
        self.process = None;
        self.awaiting_pid = false;

        match self.attach(envelope.process_id) {
            Ok(process) => self.process = Some(process),
            Err(err) => {
                warn!(%err, "cannot attach to replacement companion");
                self.emit_unreachable(&err);
            }
        }

        match envelope.first_text() {
            Some(name) => {
                let connected = dispatcher::poll_connect(
                    self.channel.as_ref(),
                    name,
                    self.process.as_mut(),
                    &self.policy,
                    &self.cancel,
                )
                .await;

                if self.cancel.is_cancelled() {
                    return;
                }
                if !connected {
                    self.drop_process();
                    let err = AppError::Attach(format!(
                        "failed to connect to the new updater process on '{name}'"
                    ));
                    warn!(%err, "replacement companion unreachable");
                    self.emit_unreachable(&err);
                }
            }
            None => {
                let err = AppError::Attach("the new updater process sent no channel name".into());
                warn!(%err, "replacement companion unreachable");
                self.emit_unreachable(&err);
            }
        }

        if self.cancel.is_cancelled() {
            return;
        }

        match self.steps.resume() {
            Resume::ResendRestartInfo => self.emit(SessionEvent::ResendRestartInfo),
            Resume::Reenqueue(command) => self.enqueue(command),
        }
    }

    // ── Helpers ───────────────────────────────────────────────────────────────

    /// Swap in a fresh adapter; events from the old one are ignored from now on.
    fn renew_channel(&mut self) {
        let generation = self.channel.generation() + 1;
        self.channel = self
            .collaborators
            .factory
            .create(generation, self.channel_tx.clone());
        debug!(generation, "channel adapter renewed");
    }

    /// Best-effort kill and forget the tracked process.
    fn drop_process(&mut self) {
        if let Some(mut process) = self.process.take() {
            process.kill();
        }
        self.awaiting_pid = false;
    }

    fn emit(&self, event: SessionEvent) {
        if self.cancel.is_cancelled() {
            return;
        }
        if self.events.send(event).is_err() {
            debug!("session event receiver dropped");
        }
    }

    fn emit_unreachable(&self, err: &AppError) {
        self.emit(SessionEvent::ProcessUnreachable {
            step: self.steps.believed(),
            reason: err.to_string(),
        });
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            step: self.steps.believed(),
            in_flight: self.in_flight,
            backlog: self.backlog.len(),
            buffering: self.router.is_buffering(),
            buffered: self.router.buffered_len(),
            connected: self.channel.is_connected(),
            generation: self.channel.generation(),
            window_handle: self.window_handle,
        }
    }
}

/// Resolve the companion location, logging rather than failing: an invalid
/// location only matters once the companion has to be started.
fn resolve_location(location: &str) -> Option<PathBuf> {
    match resolve_updater_path(location) {
        Ok(path) => Some(path),
        Err(err) => {
            warn!(%err, location, "updater location rejected");
            None
        }
    }
}
