//! Newline framing for envelopes on the local socket.
//!
//! Wraps [`tokio_util::codec::LinesCodec`] with a maximum frame length so a
//! misbehaving companion cannot make the reader allocate without bound.
//! Use [`FrameCodec`] with [`tokio_util::codec::FramedRead`] over the socket's
//! receive half.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder, LinesCodec, LinesCodecError};

use crate::{AppError, Result};

/// Maximum frame length accepted from the companion: 1 MiB.
pub const MAX_FRAME_BYTES: usize = 1_048_576;

/// Line codec for the companion channel.
///
/// Oversized inbound frames decode to [`AppError::Codec`]; the underlying
/// codec then discards input up to the next newline, so the stream stays
/// usable. I/O errors map to [`AppError::Io`].
#[derive(Debug)]
pub struct FrameCodec(LinesCodec);

impl FrameCodec {
    /// Create a codec with the default [`MAX_FRAME_BYTES`] limit.
    #[must_use]
    pub fn new() -> Self {
        Self(LinesCodec::new_with_max_length(MAX_FRAME_BYTES))
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = String;
    type Error = AppError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        self.0.decode(src).map_err(map_frame_error)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        self.0.decode_eof(src).map_err(map_frame_error)
    }
}

impl Encoder<String> for FrameCodec {
    type Error = AppError;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<()> {
        self.0.encode(item, dst).map_err(map_frame_error)
    }
}

fn map_frame_error(e: LinesCodecError) -> AppError {
    match e {
        LinesCodecError::MaxLineLengthExceeded => {
            AppError::Codec(format!("frame too long: exceeded {MAX_FRAME_BYTES} bytes"))
        }
        LinesCodecError::Io(io_err) => AppError::Io(io_err.to_string()),
    }
}
