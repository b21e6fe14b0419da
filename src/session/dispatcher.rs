//! Single-flight command dispatch.
//!
//! Each dispatched [`Command`] runs in its own worker task that:
//! 1. makes sure a companion is listening, by connecting to an existing
//!    channel or spawning the companion and poll-connecting to it;
//! 2. encodes and sends the command with bounded retry;
//! 3. reports back to the session actor with a [`DispatchReport`].
//!
//! The actor guarantees that only one worker exists at a time. Workers never
//! touch session state; anything they learn (a spawned process, a discovered
//! channel) travels back in the report.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::RetryConfig;
use crate::ipc::channel::Channel;
use crate::ipc::codec::Codec;
use crate::ipc::name::channel_name;
use crate::models::{Command, Envelope};
use crate::process::{CompanionProcess, ProcessSupervisor};
use crate::{AppError, Result};

/// Retry and poll timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Send attempts before a still-connected channel counts as failed.
    pub max_send_attempts: u32,
    /// Connect attempts after spawning the companion.
    pub connect_attempts: u32,
    /// Pause after each failed attempt.
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_send_attempts: config.max_send_attempts,
            connect_attempts: config.connect_attempts,
            interval: config.retry_interval(),
        }
    }
}

/// How to find or start the companion before sending.
#[derive(Debug, Clone)]
pub(crate) struct Startup {
    /// Resolved companion path; `None` when the configured location was invalid.
    pub updater_path: Option<PathBuf>,
    /// Full launch arguments.
    pub arguments: Vec<String>,
}

/// Everything a worker needs for one command.
pub(crate) struct DispatchJob {
    pub command: Command,
    pub channel: Arc<dyn Channel>,
    pub codec: Arc<dyn Codec>,
    pub supervisor: Arc<dyn ProcessSupervisor>,
    /// Present when the session has no live companion.
    pub startup: Option<Startup>,
    pub policy: RetryPolicy,
    pub cancel: CancellationToken,
}

/// Result of one worker run.
#[derive(Debug)]
pub(crate) struct DispatchReport {
    /// Command that was dispatched.
    pub command: Command,
    /// Success, or the startup/send failure that ends the backlog.
    pub outcome: Result<()>,
    /// Companion spawned by this worker.
    pub spawned: Option<Box<dyn CompanionProcess>>,
    /// Connected to an already running companion and asked for its pid.
    pub discovered: bool,
    /// The pid request for a discovered companion could not be sent.
    pub process_id_error: Option<AppError>,
}

/// How the worker obtained a companion.
enum Companion {
    Spawned(Box<dyn CompanionProcess>),
    Discovered { query_error: Option<AppError> },
}

/// Run one command to completion.
pub(crate) async fn run(job: DispatchJob) -> DispatchReport {
    let DispatchJob {
        command,
        channel,
        codec,
        supervisor,
        startup,
        policy,
        cancel,
    } = job;

    let mut report = DispatchReport {
        command,
        outcome: Ok(()),
        spawned: None,
        discovered: false,
        process_id_error: None,
    };

    if let Some(startup) = startup {
        match ensure_companion(
            channel.as_ref(),
            codec.as_ref(),
            supervisor.as_ref(),
            &startup,
            &policy,
            &cancel,
        )
        .await
        {
            Ok(Companion::Spawned(process)) => report.spawned = Some(process),
            Ok(Companion::Discovered { query_error }) => {
                report.discovered = true;
                report.process_id_error = query_error;
            }
            Err(err) => {
                report.outcome = Err(err);
                return report;
            }
        }
    }

    report.outcome = send_command(
        channel.as_ref(),
        codec.as_ref(),
        &report.command,
        &policy,
        &cancel,
    )
    .await;
    report
}

/// Connect to the companion's channel, spawning the companion if nobody is
/// listening.
async fn ensure_companion(
    channel: &dyn Channel,
    codec: &dyn Codec,
    supervisor: &dyn ProcessSupervisor,
    startup: &Startup,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> Result<Companion> {
    let Some(path) = startup.updater_path.as_deref() else {
        return Err(AppError::Startup(
            "the updater path supplied is not valid; make sure the updater exists on disk".into(),
        ));
    };

    let name = channel_name(path);

    if channel.connect(&name).await {
        info!(channel = %name, "found running companion; requesting its process id");
        let query_error = match codec.encode(&Envelope::from(&Command::process_id_query())) {
            Ok(bytes) if retry_send(channel, &bytes, policy, cancel).await => None,
            Ok(_) => Some(AppError::ProcessUnreachable(
                "failed to request the updater process id".into(),
            )),
            Err(err) => Some(AppError::ProcessUnreachable(format!(
                "failed to encode the process id request: {err}"
            ))),
        };
        return Ok(Companion::Discovered { query_error });
    }

    if !path.exists() {
        return Err(AppError::Startup(format!(
            "the updater executable was not found: {}",
            path.display()
        )));
    }

    let mut process = supervisor
        .spawn(path, &startup.arguments)
        .map_err(|err| AppError::Startup(format!("the updater failed to start: {err}")))?;

    if poll_connect(channel, &name, Some(&mut process), policy, cancel).await {
        Ok(Companion::Spawned(process))
    } else {
        process.kill();
        Err(AppError::Startup(format!(
            "the updater did not open its channel '{name}'"
        )))
    }
}

async fn send_command(
    channel: &dyn Channel,
    codec: &dyn Codec,
    command: &Command,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> Result<()> {
    let bytes = codec.encode(&Envelope::from(command))?;

    if retry_send(channel, &bytes, policy, cancel).await {
        debug!(step = %command.step(), action = ?command.action(), "command sent");
        Ok(())
    } else {
        Err(AppError::Send(format!(
            "failed to send {} to the updater after {} attempts",
            command.step(),
            policy.max_send_attempts
        )))
    }
}

/// Send `bytes`, retrying while the channel stays connected.
///
/// Returns `true` when the channel accepted the frame within
/// `max_send_attempts`, and also when the channel is disconnected once the
/// loop ends: with nobody listening there is nothing left to retry.
/// Cancellation returns `false`.
pub async fn retry_send(
    channel: &dyn Channel,
    bytes: &[u8],
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> bool {
    let mut attempt = 1;
    let mut sent = channel.send(bytes).await;

    while !sent && attempt < policy.max_send_attempts && channel.is_connected() {
        if !pause(policy.interval, cancel).await {
            return false;
        }
        attempt += 1;
        sent = channel.send(bytes).await;
    }

    if sent {
        return true;
    }

    if channel.is_connected() {
        warn!(attempt, "send retries exhausted");
        false
    } else {
        debug!(attempt, "channel closed during send; treating as delivered");
        true
    }
}

/// Connect to `name`, retrying up to `connect_attempts` times.
///
/// Gives up early when `process` is absent or has exited, since nobody will
/// ever open the channel then. Cancellation returns `false`.
pub async fn poll_connect(
    channel: &dyn Channel,
    name: &str,
    mut process: Option<&mut Box<dyn CompanionProcess>>,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> bool {
    for attempt in 1..=policy.connect_attempts {
        if channel.connect(name).await {
            debug!(attempt, channel = name, "connected to companion channel");
            return true;
        }

        let alive = match process.as_mut() {
            Some(process) => process.is_alive(),
            None => false,
        };
        if !alive {
            debug!(attempt, "companion not running; giving up on connect");
            return false;
        }

        if !pause(policy.interval, cancel).await {
            return false;
        }
    }

    warn!(
        attempts = policy.connect_attempts,
        channel = name,
        "companion channel never opened"
    );
    false
}

/// Sleep for `interval`; `false` if the session was disposed meanwhile.
async fn pause(interval: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        () = cancel.cancelled() => false,
        () = tokio::time::sleep(interval) => true,
    }
}
