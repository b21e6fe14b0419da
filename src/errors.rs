//! Error types shared across the session manager.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all session failure modes.
///
/// None of these cross the [`UpdateSession`](crate::session::UpdateSession)
/// boundary directly: the session converts them into
/// [`SessionEvent`](crate::session::SessionEvent)s.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or companion path resolution failure.
    Config(String),
    /// The process supervisor could not launch the companion executable.
    Launch(String),
    /// The companion could not be started or connected to.
    Startup(String),
    /// The send retry budget was exhausted while the channel stayed connected.
    Send(String),
    /// The companion's process id could not be learned or looked up.
    ProcessUnreachable(String),
    /// No process with the requested id exists, or a replacement companion
    /// could not be reconnected.
    Attach(String),
    /// Envelope encoding or decoding failure.
    Codec(String),
    /// Local socket naming or transport failure.
    Ipc(String),
    /// File-system or I/O operation failure.
    Io(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Launch(msg) => write!(f, "launch: {msg}"),
            Self::Startup(msg) => write!(f, "startup: {msg}"),
            Self::Send(msg) => write!(f, "send: {msg}"),
            Self::ProcessUnreachable(msg) => write!(f, "process unreachable: {msg}"),
            Self::Attach(msg) => write!(f, "attach: {msg}"),
            Self::Codec(msg) => write!(f, "codec: {msg}"),
            Self::Ipc(msg) => write!(f, "ipc: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Codec(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
