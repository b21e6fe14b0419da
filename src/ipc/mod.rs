//! Local IPC layer between the session and the companion updater.
//!
//! Provides the [`Channel`](channel::Channel) adapter seam, the envelope
//! [`Codec`](codec::Codec), channel name derivation, and a named pipe
//! (Windows) or Unix domain socket (Linux/macOS) adapter.

pub mod channel;
pub mod codec;
pub mod frame;
pub mod name;
pub mod socket;
