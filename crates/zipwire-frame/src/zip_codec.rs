//! `tokio_util` codec over the streaming decoder.
//!
//! ```ignore
//! let framed = tokio_util::codec::Framed::new(stream, ZipCodec::new());
//! ```

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{encode_frame, Message};
use crate::decoder::{DecoderStats, FrameDecoder};
use crate::error::FrameError;

/// Frame codec for `tokio_util::codec::Framed`.
///
/// Decoding runs the same byte-at-a-time state machine as
/// [`FrameDecoder`], so noise and corrupted frames are skipped rather than
/// reported. Every byte handed to [`Decoder::decode`] is consumed.
#[derive(Debug, Default)]
pub struct ZipCodec {
    decoder: FrameDecoder,
}

impl ZipCodec {
    /// Create a codec with a fresh decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decoder counters.
    pub fn stats(&self) -> DecoderStats {
        self.decoder.stats()
    }
}

impl Decoder for ZipCodec {
    type Item = Message;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>, FrameError> {
        let mut consumed = 0usize;
        let mut decoded = None;
        for &byte in src.iter() {
            consumed += 1;
            if let Some(message) = self.decoder.feed(byte) {
                decoded = Some(message);
                break;
            }
        }
        src.advance(consumed);
        Ok(decoded)
    }
}

impl Encoder<Message> for ZipCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), FrameError> {
        encode_frame(item.msg_type, item.seq, &item.payload, dst)
    }
}
