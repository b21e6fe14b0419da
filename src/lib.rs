#![forbid(unsafe_code)]

//! Session manager for an out-of-process software updater.
//!
//! An [`UpdateSession`] drives a companion updater executable through its
//! workflow (check, download, extract, restart info, install) over a local
//! socket, starting or reattaching to the companion as needed and reporting
//! progress as [`SessionEvent`]s.

pub mod config;
pub mod errors;
pub mod ipc;
pub mod models;
pub mod process;
pub mod session;
pub mod window;

pub use config::SessionConfig;
pub use errors::{AppError, Result};
pub use session::{SessionEvent, UpdateSession};
