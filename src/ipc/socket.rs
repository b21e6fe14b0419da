//! Local socket channel adapter.
//!
//! Connects to the companion's named pipe (Windows) or Unix domain socket
//! (Linux/macOS) using the `interprocess` crate. Outbound envelopes are
//! written as `\n`-terminated frames; inbound frames are read by a
//! background task driven by [`FramedRead`] over [`FrameCodec`] and delivered
//! as [`ChannelEvent`]s.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::StreamExt;
use interprocess::local_socket::tokio::{prelude::*, RecvHalf, SendHalf, Stream};
use interprocess::local_socket::{GenericNamespaced, ToNsName};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::ipc::channel::{Channel, ChannelEvent, ChannelEventSender, ChannelFactory, ChannelFuture};
use crate::ipc::frame::FrameCodec;
use crate::AppError;

/// Creates [`LocalSocketChannel`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalSocketFactory;

impl ChannelFactory for LocalSocketFactory {
    fn create(&self, generation: u64, events: ChannelEventSender) -> Arc<dyn Channel> {
        Arc::new(LocalSocketChannel::new(generation, events))
    }
}

/// Write half and reader cancellation of a live connection.
struct Link {
    writer: SendHalf,
    reader_cancel: CancellationToken,
}

/// [`Channel`] over an `interprocess` local socket.
pub struct LocalSocketChannel {
    generation: u64,
    events: ChannelEventSender,
    link: Mutex<Option<Link>>,
    connected: Arc<AtomicBool>,
    shutdown: CancellationToken,
}

impl LocalSocketChannel {
    /// Create a disconnected adapter.
    #[must_use]
    pub fn new(generation: u64, events: ChannelEventSender) -> Self {
        Self {
            generation,
            events,
            link: Mutex::new(None),
            connected: Arc::new(AtomicBool::new(false)),
            shutdown: CancellationToken::new(),
        }
    }

    async fn try_connect(&self, name: &str) -> bool {
        if self.is_connected() {
            return true;
        }

        let ns_name = match socket_name(name) {
            Ok(ns_name) => ns_name,
            Err(err) => {
                warn!(generation = self.generation, %err, "channel connect skipped");
                return false;
            }
        };

        let stream = match Stream::connect(ns_name).await {
            Ok(stream) => stream,
            Err(err) => {
                debug!(generation = self.generation, %err, "channel connect attempt failed");
                return false;
            }
        };

        let (reader, writer) = stream.split();
        let reader_cancel = self.shutdown.child_token();

        // Hold the link lock until the reader exists so a concurrent send
        // never sees `connected` without a writer.
        let mut link = self.link.lock().await;
        self.connected.store(true, Ordering::SeqCst);
        tokio::spawn(run_reader(
            self.generation,
            reader,
            self.events.clone(),
            Arc::clone(&self.connected),
            reader_cancel.clone(),
        ));
        *link = Some(Link {
            writer,
            reader_cancel,
        });

        info!(generation = self.generation, channel = name, "channel connected");
        true
    }

    async fn try_send(&self, bytes: &[u8]) -> bool {
        if !self.is_connected() {
            return false;
        }

        let mut guard = self.link.lock().await;
        let Some(link) = guard.as_mut() else {
            return false;
        };

        let mut frame = Vec::with_capacity(bytes.len() + 1);
        frame.extend_from_slice(bytes);
        frame.push(b'\n');

        match link.writer.write_all(&frame).await {
            Ok(()) => true,
            Err(err) => {
                warn!(generation = self.generation, %err, "channel write failed");
                false
            }
        }
    }

    async fn close(&self) {
        // Clearing the flag first keeps the reader from reporting this as a
        // broken connection.
        self.connected.store(false, Ordering::SeqCst);
        if let Some(link) = self.link.lock().await.take() {
            link.reader_cancel.cancel();
            debug!(generation = self.generation, "channel disconnected");
        }
    }
}

impl Channel for LocalSocketChannel {
    fn generation(&self) -> u64 {
        self.generation
    }

    fn connect<'a>(&'a self, name: &'a str) -> ChannelFuture<'a, bool> {
        Box::pin(self.try_connect(name))
    }

    fn send<'a>(&'a self, bytes: &'a [u8]) -> ChannelFuture<'a, bool> {
        Box::pin(self.try_send(bytes))
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn disconnect(&self) -> ChannelFuture<'_, ()> {
        Box::pin(self.close())
    }
}

impl Drop for LocalSocketChannel {
    fn drop(&mut self) {
        self.connected.store(false, Ordering::SeqCst);
        self.shutdown.cancel();
    }
}

/// Convert a channel name into the platform's namespaced socket name.
///
/// # Errors
///
/// Returns [`AppError::Ipc`] when the platform rejects the name.
pub fn socket_name(name: &str) -> crate::Result<interprocess::local_socket::Name<'_>> {
    name.to_ns_name::<GenericNamespaced>()
        .map_err(|err| AppError::Ipc(format!("invalid channel name '{name}': {err}")))
}

/// Reader task: forwards inbound frames until EOF, error, or cancellation.
///
/// Raises one `Disconnected` event when the connection breaks, unless the
/// adapter already cleared `connected` for an explicit disconnect.
async fn run_reader(
    generation: u64,
    reader: RecvHalf,
    events: ChannelEventSender,
    connected: Arc<AtomicBool>,
    cancel: CancellationToken,
) {
    let mut framed = FramedRead::new(reader, FrameCodec::new());

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                debug!(generation, "channel reader: cancelled");
                return;
            }

            item = framed.next() => {
                match item {
                    None => {
                        debug!(generation, "channel reader: EOF");
                        break;
                    }
                    Some(Err(AppError::Codec(ref msg))) => {
                        warn!(generation, error = msg.as_str(), "channel reader: oversized frame skipped");
                    }
                    Some(Err(err)) => {
                        warn!(generation, %err, "channel reader: read failed");
                        break;
                    }
                    Some(Ok(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        if events.send(ChannelEvent::message(generation, line.into_bytes())).is_err() {
                            debug!(generation, "channel reader: session gone, stopping");
                            return;
                        }
                    }
                }
            }
        }
    }

    if connected.swap(false, Ordering::SeqCst) {
        let _ = events.send(ChannelEvent::disconnected(generation));
    }
}
