//! The local socket adapter against a real listener playing the companion.

use std::path::Path;
use std::time::Duration;

use interprocess::local_socket::tokio::{Listener as LocalSocketListener, Stream};
use interprocess::local_socket::{tokio::prelude::*, GenericNamespaced, ListenerOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use update_session::ipc::channel::{ChannelEvent, ChannelEventKind, ChannelFactory};
use update_session::ipc::codec::{Codec, JsonCodec};
use update_session::ipc::name::channel_name;
use update_session::ipc::socket::{socket_name, LocalSocketFactory};
use update_session::models::{Command, Envelope, ResponseKind, UpdateStep};

fn unique_name() -> String {
    format!("update-session-test-{}", uuid::Uuid::new_v4().simple())
}

fn listen(name: &str) -> LocalSocketListener {
    let ns_name = name
        .to_owned()
        .to_ns_name::<GenericNamespaced>()
        .expect("valid socket name");
    ListenerOptions::new()
        .name(ns_name)
        .create_tokio()
        .expect("create companion listener")
}

async fn next_event(events: &mut mpsc::UnboundedReceiver<ChannelEvent>) -> ChannelEvent {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for channel event")
        .expect("channel event stream open")
}

async fn accept(listener: &LocalSocketListener) -> Stream {
    tokio::time::timeout(Duration::from_secs(5), listener.accept())
        .await
        .expect("timed out waiting for the session to connect")
        .expect("accept connection")
}

#[test]
fn updater_channel_names_are_valid_socket_names() {
    let name = channel_name(Path::new("/opt/My App/Update.exe"));
    assert!(socket_name(&name).is_ok());
}

#[tokio::test]
async fn connect_fails_when_nobody_listens() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let channel = LocalSocketFactory.create(0, tx);

    assert!(!channel.connect(&unique_name()).await);
    assert!(!channel.is_connected());
    assert!(!channel.send(b"{}").await);
}

#[tokio::test]
async fn frames_flow_both_ways() {
    let name = unique_name();
    let listener = listen(&name);
    let (tx, mut events) = mpsc::unbounded_channel();
    let channel = LocalSocketFactory.create(3, tx);

    assert!(channel.connect(&name).await);
    assert!(channel.is_connected());
    assert_eq!(channel.generation(), 3);
    let companion = accept(&listener).await;
    let (reader, mut writer) = companion.split();
    let mut reader = BufReader::new(reader);

    // Session to companion.
    let outbound = JsonCodec
        .encode(&Envelope::from(&Command::for_step(UpdateStep::DownloadUpdate)))
        .unwrap();
    assert!(channel.send(&outbound).await);

    let mut line = String::new();
    reader.read_line(&mut line).await.unwrap();
    let received = JsonCodec.decode(line.trim().as_bytes()).unwrap();
    assert_eq!(received.step, UpdateStep::DownloadUpdate);

    // Companion to session.
    let reply = Envelope::response(UpdateStep::DownloadUpdate, ResponseKind::Progress);
    let mut frame = JsonCodec.encode(&reply).unwrap();
    frame.push(b'\n');
    writer.write_all(&frame).await.unwrap();

    let event = next_event(&mut events).await;
    assert_eq!(event.generation, 3);
    match event.kind {
        ChannelEventKind::Message(bytes) => assert_eq!(JsonCodec.decode(&bytes).unwrap(), reply),
        ChannelEventKind::Disconnected => panic!("unexpected disconnect"),
    }
}

#[tokio::test]
async fn companion_hangup_raises_one_disconnect() {
    let name = unique_name();
    let listener = listen(&name);
    let (tx, mut events) = mpsc::unbounded_channel();
    let channel = LocalSocketFactory.create(0, tx);

    assert!(channel.connect(&name).await);
    let companion = accept(&listener).await;
    drop(companion);

    assert_eq!(next_event(&mut events).await, ChannelEvent::disconnected(0));
    assert!(!channel.is_connected());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn explicit_disconnect_is_silent() {
    let name = unique_name();
    let listener = listen(&name);
    let (tx, mut events) = mpsc::unbounded_channel();
    let channel = LocalSocketFactory.create(0, tx);

    assert!(channel.connect(&name).await);
    let _companion = accept(&listener).await;

    channel.disconnect().await;

    assert!(!channel.is_connected());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(events.try_recv().is_err());
}
