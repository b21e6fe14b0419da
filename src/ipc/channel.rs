//! Channel adapter seam between the session and the byte transport.
//!
//! A [`Channel`] is one connection attempt's worth of transport state. The
//! session asks a [`ChannelFactory`] for a fresh adapter, tagged with a new
//! generation, whenever the previous one broke or the companion replaced
//! itself. Inbound traffic arrives as [`ChannelEvent`]s on the sender handed
//! to the factory; events from older generations are ignored by the session.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;

/// Boxed future returned by [`Channel`] methods.
pub type ChannelFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Sender half used by adapters to deliver inbound events.
pub type ChannelEventSender = mpsc::UnboundedSender<ChannelEvent>;

/// What an adapter observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEventKind {
    /// One complete inbound frame.
    Message(Vec<u8>),
    /// The connection broke. Never raised after an explicit disconnect.
    Disconnected,
}

/// Inbound notification from a channel adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelEvent {
    /// Generation of the adapter that raised the event.
    pub generation: u64,
    /// Event payload.
    pub kind: ChannelEventKind,
}

impl ChannelEvent {
    /// Inbound frame event.
    #[must_use]
    pub fn message(generation: u64, bytes: Vec<u8>) -> Self {
        Self {
            generation,
            kind: ChannelEventKind::Message(bytes),
        }
    }

    /// Broken-connection event.
    #[must_use]
    pub fn disconnected(generation: u64) -> Self {
        Self {
            generation,
            kind: ChannelEventKind::Disconnected,
        }
    }
}

/// Connection to the companion's channel.
///
/// Implementations must raise [`ChannelEventKind::Disconnected`] exactly once
/// per broken connection and never after [`disconnect`](Self::disconnect).
pub trait Channel: Send + Sync {
    /// Generation this adapter was created with.
    fn generation(&self) -> u64;

    /// Try once to connect to `name`. Returns whether the adapter is now
    /// connected; connecting an already connected adapter is a no-op.
    fn connect<'a>(&'a self, name: &'a str) -> ChannelFuture<'a, bool>;

    /// Try once to send one frame. Returns whether the transport accepted it.
    fn send<'a>(&'a self, bytes: &'a [u8]) -> ChannelFuture<'a, bool>;

    /// Whether the adapter currently holds a live connection.
    fn is_connected(&self) -> bool;

    /// Close the connection without raising a disconnect event.
    fn disconnect(&self) -> ChannelFuture<'_, ()>;
}

/// Builds channel adapters for the session.
pub trait ChannelFactory: Send + Sync {
    /// Create a disconnected adapter that reports through `events`.
    fn create(&self, generation: u64, events: ChannelEventSender) -> Arc<dyn Channel>;
}
