use bytes::{BufMut, Bytes, BytesMut};

use crate::crc::crc16;
use crate::decoder::FrameDecoder;
use crate::error::{FrameError, Result};

/// Sync bytes that open every frame.
pub const SYNC: [u8; 2] = [0xAA, 0x55];

/// Maximum payload size in bytes.
pub const MAX_PAYLOAD: usize = 64;

/// Smallest legal `LEN` value (TYPE + SEQ, empty payload).
pub const MIN_LEN: u8 = 2;

/// Largest legal `LEN` value (TYPE + SEQ + maximal payload).
pub const MAX_LEN: u8 = 2 + MAX_PAYLOAD as u8;

/// Sync (2) + LEN (1) + TYPE (1) + SEQ (1).
pub const HEADER_SIZE: usize = 5;

/// Trailing little-endian CRC.
pub const CRC_SIZE: usize = 2;

/// Largest possible frame on the wire.
pub const MAX_FRAME_SIZE: usize = SYNC.len() + 1 + MAX_LEN as usize + CRC_SIZE;

/// One protocol message: type, sequence number and opaque payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Command or response kind.
    pub msg_type: u8,
    /// Correlation number. `0` means uncorrelated.
    pub seq: u8,
    /// Payload bytes, at most [`MAX_PAYLOAD`].
    pub payload: Bytes,
}

impl Message {
    /// Create a new message.
    pub fn new(msg_type: u8, seq: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            msg_type,
            seq,
            payload: payload.into(),
        }
    }

    /// The total wire size of this message once framed.
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len() + CRC_SIZE
    }

    /// Encode into a standalone frame.
    pub fn encode(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.wire_size());
        encode_frame(self.msg_type, self.seq, &self.payload, &mut buf)?;
        Ok(buf.freeze())
    }

    /// Payload as UTF-8 text, if it is valid UTF-8.
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}

/// Encode a message into the wire format, appending to `dst`.
///
/// Wire format:
/// ```text
/// ┌──────┬──────┬─────┬──────┬─────┬──────────────┬────────┬─────────┐
/// │ 0xAA │ 0x55 │ LEN │ TYPE │ SEQ │ PAYLOAD      │ CRC lo │ CRC hi  │
/// │      │      │     │      │     │ (LEN-2 bytes)│        │         │
/// └──────┴──────┴─────┴──────┴─────┴──────────────┴────────┴─────────┘
///                 └───────── CRC-16 span ────────┘
/// ```
///
/// Nothing is written when the payload is too large.
pub fn encode_frame(msg_type: u8, seq: u8, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD,
        });
    }

    let start = dst.len();
    dst.reserve(HEADER_SIZE + payload.len() + CRC_SIZE);
    dst.put_slice(&SYNC);
    dst.put_u8(MIN_LEN + payload.len() as u8);
    dst.put_u8(msg_type);
    dst.put_u8(seq);
    dst.put_slice(payload);

    let crc = crc16(&dst[start + SYNC.len()..]);
    dst.put_u16_le(crc);
    Ok(())
}

/// Decode the first valid frame found in `bytes`.
///
/// Leading noise and corrupted frames are skipped the same way the
/// streaming decoder skips them.
pub fn decode_frame(bytes: &[u8]) -> Option<Message> {
    let mut decoder = FrameDecoder::new();
    bytes.iter().find_map(|&byte| decoder.feed(byte))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_frame_bytes() {
        let mut buf = BytesMut::new();
        encode_frame(0x01, 1, b"{}", &mut buf).unwrap();
        assert_eq!(
            buf.as_ref(),
            &[0xAA, 0x55, 0x04, 0x01, 0x01, 0x7B, 0x7D, 0x17, 0xA2]
        );
    }

    #[test]
    fn empty_payload_frame() {
        let mut buf = BytesMut::new();
        encode_frame(0x07, 9, b"", &mut buf).unwrap();
        assert_eq!(buf.len(), HEADER_SIZE + CRC_SIZE);
        assert_eq!(buf[2], MIN_LEN);

        let msg = decode_frame(&buf).unwrap();
        assert_eq!(msg, Message::new(0x07, 9, Bytes::new()));
    }

    #[test]
    fn max_payload_accepted() {
        let payload = [0x5A; MAX_PAYLOAD];
        let mut buf = BytesMut::new();
        encode_frame(0x08, 200, &payload, &mut buf).unwrap();
        assert_eq!(buf.len(), MAX_FRAME_SIZE);
        assert_eq!(buf[2], MAX_LEN);
    }

    #[test]
    fn payload_too_large_writes_nothing() {
        let payload = [0u8; MAX_PAYLOAD + 1];
        let mut buf = BytesMut::from(&b"keep"[..]);
        let err = encode_frame(0x01, 1, &payload, &mut buf).unwrap_err();

        assert!(matches!(
            err,
            FrameError::PayloadTooLarge { size: 65, max: 64 }
        ));
        assert_eq!(buf.as_ref(), b"keep");
    }

    #[test]
    fn appends_after_existing_bytes() {
        let mut buf = BytesMut::new();
        encode_frame(0x05, 1, b"{\"angle\":90}", &mut buf).unwrap();
        let first_len = buf.len();
        encode_frame(0x06, 2, b"{}", &mut buf).unwrap();

        let second = decode_frame(&buf[first_len..]).unwrap();
        assert_eq!(second.msg_type, 0x06);
        assert_eq!(second.seq, 2);
    }

    #[test]
    fn type_and_sequence_are_not_validated() {
        let msg = Message::new(0x00, 0, &b"x"[..]);
        let wire = msg.encode().unwrap();
        assert_eq!(decode_frame(&wire), Some(msg));
    }

    #[test]
    fn message_helpers() {
        let msg = Message::new(0x82, 4, &b"{\"ok\":true}"[..]);
        assert_eq!(msg.wire_size(), HEADER_SIZE + 11 + CRC_SIZE);
        assert_eq!(msg.payload_str(), Some("{\"ok\":true}"));
        assert_eq!(Message::new(0x82, 4, vec![0xFF]).payload_str(), None);
    }

    #[test]
    fn decode_frame_skips_noise() {
        let msg = Message::new(0x82, 3, &b"{\"ok\":true}"[..]);
        let mut wire = vec![0x00, 0xAA, 0x13, 0x55];
        wire.extend_from_slice(&msg.encode().unwrap());
        assert_eq!(decode_frame(&wire), Some(msg));
    }
}
