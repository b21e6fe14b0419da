//! Envelope codec and newline framing.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use update_session::ipc::codec::{Codec, JsonCodec};
use update_session::ipc::frame::{FrameCodec, MAX_FRAME_BYTES};
use update_session::models::{Command, Envelope, UpdateStep};
use update_session::AppError;

#[test]
fn json_codec_writes_a_single_line() {
    let bytes = JsonCodec
        .encode(&Envelope::from(&Command::for_step(UpdateStep::BeginExtraction)))
        .expect("encode");

    assert!(!bytes.contains(&b'\n'));
    assert_eq!(
        JsonCodec.decode(&bytes).expect("decode").step,
        UpdateStep::BeginExtraction
    );
}

#[test]
fn json_codec_rejects_garbage() {
    let err = JsonCodec.decode(b"not json").expect_err("garbage rejected");
    assert!(matches!(err, AppError::Codec(_)));
}

#[test]
fn json_codec_rejects_unknown_step() {
    let err = JsonCodec
        .decode(br#"{"action":"update_step","step":"reboot"}"#)
        .expect_err("unknown step rejected");
    assert!(matches!(err, AppError::Codec(_)));
}

#[test]
fn frame_codec_splits_on_newlines() {
    let mut codec = FrameCodec::new();
    let mut buf = BytesMut::from("{\"a\":1}\n{\"b\":2}\n{\"c\"");

    assert_eq!(codec.decode(&mut buf).expect("decode").as_deref(), Some("{\"a\":1}"));
    assert_eq!(codec.decode(&mut buf).expect("decode").as_deref(), Some("{\"b\":2}"));
    assert_eq!(codec.decode(&mut buf).expect("decode"), None);
}

#[test]
fn frame_codec_emits_trailing_frame_at_eof() {
    let mut codec = FrameCodec::new();
    let mut buf = BytesMut::from("{\"tail\":true}");

    assert_eq!(
        codec.decode_eof(&mut buf).expect("decode").as_deref(),
        Some("{\"tail\":true}")
    );
}

#[test]
fn frame_codec_rejects_oversized_frames() {
    let mut codec = FrameCodec::new();
    let mut buf = BytesMut::from(vec![b'x'; MAX_FRAME_BYTES + 1].as_slice());

    let err = codec.decode(&mut buf).expect_err("oversized frame rejected");

    assert!(matches!(err, AppError::Codec(ref msg) if msg.contains("frame too long")));
}

#[test]
fn frame_codec_encodes_with_newline() {
    let mut codec = FrameCodec::new();
    let mut buf = BytesMut::new();

    codec.encode("{}".to_owned(), &mut buf).expect("encode");

    assert_eq!(&buf[..], b"{}\n");
}
