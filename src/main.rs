#![forbid(unsafe_code)]

//! `update-session`: drive a companion updater through one workflow step.
//!
//! Starts an update session, issues the requested step, and prints session
//! events as JSON lines until the companion reports a result or goes away.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use update_session::models::ResponseKind;
use update_session::{AppError, Result, SessionConfig, SessionEvent, UpdateSession};

/// How often buffered responses are checked for while `--buffer` is set.
const FLUSH_POLL: Duration = Duration::from_millis(200);

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "update-session", about = "Drive a companion updater", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the updater location from the configuration.
    #[arg(long)]
    updater: Option<String>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Hold responses back and print them in one batch once they arrive.
    #[arg(long)]
    buffer: bool,

    #[command(subcommand)]
    command: Step,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Step {
    /// Check for an available update.
    Check {
        /// Ignore any cached check result.
        #[arg(long)]
        force: bool,
    },
    /// Download the available update.
    Download,
    /// Extract the downloaded update.
    Extract,
    /// Bring the updater forward and install.
    Install,
    /// Cancel the updater's current operation.
    Cancel,
}

fn main() -> Result<ExitCode> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<ExitCode> {
    // ── Load configuration ──────────────────────────────
    let mut config = match &args.config {
        Some(path) => SessionConfig::load_from_path(path)?,
        None => SessionConfig::default(),
    };
    if let Some(updater) = args.updater {
        config.updater_location = updater;
    }
    info!(updater = %config.updater_location, "configuration loaded");

    // ── Start session ───────────────────────────────────
    let (session, mut events) = UpdateSession::spawn(config);
    if args.buffer {
        session.set_buffering(true);
    }

    match args.command {
        Step::Check { force: false } => session.check_for_update(),
        Step::Check { force: true } => session.force_recheck_for_update(),
        Step::Download => session.download_update(),
        Step::Extract => session.begin_extraction(),
        Step::Install => session.install_now(),
        Step::Cancel => session.cancel(),
    }

    let succeeded = tokio::select! {
        outcome = watch(&session, &mut events, args.buffer) => outcome,
        () = shutdown_signal() => {
            info!("interrupted");
            false
        }
    };

    session.dispose();
    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Print events until a terminal one arrives. Returns whether the step
/// succeeded.
async fn watch(
    session: &UpdateSession,
    events: &mut mpsc::UnboundedReceiver<SessionEvent>,
    buffering: bool,
) -> bool {
    let mut ticker = tokio::time::interval(FLUSH_POLL);

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    warn!("session ended without a result");
                    return false;
                };
                print_event(&event);
                if let Some(succeeded) = outcome(&event) {
                    return succeeded;
                }
            }
            _ = ticker.tick(), if buffering => {
                if session.snapshot().await.is_some_and(|snapshot| snapshot.buffered > 0) {
                    session.flush_responses();
                }
            }
        }
    }
}

/// `Some(succeeded)` for events that end the run.
fn outcome(event: &SessionEvent) -> Option<bool> {
    match event {
        SessionEvent::Progress(envelope) => match envelope.response {
            ResponseKind::Succeeded => Some(true),
            ResponseKind::Failed => Some(false),
            ResponseKind::Progress | ResponseKind::Nothing => None,
        },
        SessionEvent::Disconnected { .. } | SessionEvent::ResendRestartInfo => Some(false),
        SessionEvent::StepMismatch { .. } | SessionEvent::ProcessUnreachable { .. } => None,
    }
}

fn print_event(event: &SessionEvent) {
    let line = match event {
        SessionEvent::Progress(envelope) => serde_json::json!({
            "event": "progress",
            "envelope": envelope,
        }),
        SessionEvent::StepMismatch { response, previous } => serde_json::json!({
            "event": "step_mismatch",
            "response": response,
            "previous": previous,
        }),
        SessionEvent::Disconnected { step, reason } => serde_json::json!({
            "event": "disconnected",
            "step": step,
            "reason": reason,
        }),
        SessionEvent::ProcessUnreachable { step, reason } => serde_json::json!({
            "event": "process_unreachable",
            "step": step,
            "reason": reason,
        }),
        SessionEvent::ResendRestartInfo => serde_json::json!({ "event": "resend_restart_info" }),
    };
    println!("{line}");
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "ctrl-c signal handler failed");
        std::future::pending::<()>().await;
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter).with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
