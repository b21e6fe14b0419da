//! Envelope codec.
//!
//! The session only ever moves bytes through the [`Channel`](super::channel::Channel);
//! the [`Codec`] turns them into [`Envelope`]s and back. [`JsonCodec`] writes
//! one compact JSON object per frame.

use crate::models::Envelope;
use crate::Result;

/// Marshals envelopes to and from frame bytes.
pub trait Codec: Send + Sync {
    /// Encode `envelope` into one frame.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Codec` if the envelope cannot be serialized.
    fn encode(&self, envelope: &Envelope) -> Result<Vec<u8>>;

    /// Decode one frame.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Codec` if the bytes are not a valid envelope.
    fn decode(&self, bytes: &[u8]) -> Result<Envelope>;
}

/// Compact single-line JSON codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(&self, envelope: &Envelope) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(envelope)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Envelope> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
