use bytes::Bytes;
use tracing::{debug, trace};

use crate::codec::{Message, CRC_SIZE, HEADER_SIZE, MAX_FRAME_SIZE, MAX_LEN, MIN_LEN, SYNC};
use crate::crc::crc16;

/// Hard cap on buffered bytes. One maximal frame fits exactly.
pub const BUFFER_CAP: usize = MAX_FRAME_SIZE;

/// Parse position within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStage {
    /// Scanning for `0xAA`.
    AwaitSync0,
    /// Saw `0xAA`, expecting `0x55`.
    AwaitSync1,
    AwaitLength,
    AwaitType,
    AwaitSeq,
    AwaitPayload,
    AwaitCrcLow,
    AwaitCrcHigh,
}

/// Counters for frames the decoder accepted or dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    /// Frames that passed validation.
    pub frames: u64,
    /// Complete frames dropped because the checksum did not match.
    pub crc_failures: u64,
    /// Candidate frames dropped for a `LEN` outside `2..=66`.
    pub length_rejects: u64,
    /// `0xAA` not followed by `0x55`.
    pub sync_misses: u64,
    /// Forced resets because the buffer reached [`BUFFER_CAP`].
    pub overflow_resets: u64,
}

/// Streaming frame decoder.
///
/// Feed it the inbound byte stream one byte at a time. It returns a
/// [`Message`] whenever a frame completes with a valid checksum and silently
/// drops anything malformed. One decoder per byte channel.
///
/// When a frame is rejected at the sync, length or checksum step and the
/// rejected byte is itself `0xAA`, that byte immediately starts a new
/// candidate frame. A frame arriving directly after a corrupted one is
/// therefore not lost.
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    stage: DecodeStage,
    buf: Vec<u8>,
    declared_len: u8,
    payload_len: usize,
    msg_type: u8,
    seq: u8,
    stats: DecoderStats,
}

impl FrameDecoder {
    /// Create a decoder waiting for the first sync byte.
    pub fn new() -> Self {
        Self {
            stage: DecodeStage::AwaitSync0,
            buf: Vec::with_capacity(BUFFER_CAP),
            declared_len: 0,
            payload_len: 0,
            msg_type: 0,
            seq: 0,
            stats: DecoderStats::default(),
        }
    }

    /// Consume one byte. Returns a message when it completes a valid frame.
    pub fn feed(&mut self, byte: u8) -> Option<Message> {
        match self.stage {
            DecodeStage::AwaitSync0 => {
                if byte == SYNC[0] {
                    self.begin(byte);
                }
            }
            DecodeStage::AwaitSync1 => {
                if byte == SYNC[1] {
                    self.push(byte, DecodeStage::AwaitLength);
                } else {
                    self.stats.sync_misses += 1;
                    trace!("sync miss on byte {byte:#04x}");
                    self.resync(byte);
                }
            }
            DecodeStage::AwaitLength => {
                if (MIN_LEN..=MAX_LEN).contains(&byte) {
                    self.declared_len = byte;
                    self.payload_len = usize::from(byte - MIN_LEN);
                    self.push(byte, DecodeStage::AwaitType);
                } else {
                    self.stats.length_rejects += 1;
                    trace!("rejected frame length {byte}");
                    self.resync(byte);
                }
            }
            DecodeStage::AwaitType => {
                self.msg_type = byte;
                self.push(byte, DecodeStage::AwaitSeq);
            }
            DecodeStage::AwaitSeq => {
                self.seq = byte;
                let next = if self.payload_len > 0 {
                    DecodeStage::AwaitPayload
                } else {
                    DecodeStage::AwaitCrcLow
                };
                self.push(byte, next);
            }
            DecodeStage::AwaitPayload => {
                let next = if self.buf.len() + 1 == HEADER_SIZE + self.payload_len {
                    DecodeStage::AwaitCrcLow
                } else {
                    DecodeStage::AwaitPayload
                };
                self.push(byte, next);
            }
            DecodeStage::AwaitCrcLow => {
                self.push(byte, DecodeStage::AwaitCrcHigh);
            }
            DecodeStage::AwaitCrcHigh => {
                if self.push(byte, DecodeStage::AwaitCrcHigh) {
                    return self.complete(byte);
                }
            }
        }
        None
    }

    /// Feed a run of bytes, collecting every message they complete in order.
    pub fn feed_all(&mut self, bytes: &[u8]) -> Vec<Message> {
        bytes.iter().filter_map(|&byte| self.feed(byte)).collect()
    }

    /// Drop any partial frame and wait for the next sync byte.
    pub fn reset(&mut self) {
        self.stage = DecodeStage::AwaitSync0;
        self.buf.clear();
        self.declared_len = 0;
        self.payload_len = 0;
        self.msg_type = 0;
        self.seq = 0;
    }

    /// Current parse stage.
    pub fn stage(&self) -> DecodeStage {
        self.stage
    }

    /// Bytes held for the frame in progress.
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    /// Accept/drop counters since creation.
    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    fn begin(&mut self, byte: u8) {
        self.buf.clear();
        self.buf.push(byte);
        self.stage = DecodeStage::AwaitSync1;
    }

    /// Append `byte` and move to `next`. Returns false if the cap forced a reset.
    fn push(&mut self, byte: u8, next: DecodeStage) -> bool {
        if self.buf.len() >= BUFFER_CAP {
            self.stats.overflow_resets += 1;
            debug!(buffered = self.buf.len(), "decoder buffer full; resetting");
            self.reset();
            return false;
        }
        self.buf.push(byte);
        self.stage = next;
        true
    }

    fn resync(&mut self, byte: u8) {
        self.reset();
        if byte == SYNC[0] {
            self.begin(byte);
        }
    }

    fn complete(&mut self, last: u8) -> Option<Message> {
        debug_assert_eq!(self.buf.len(), HEADER_SIZE + self.payload_len + CRC_SIZE);

        let span_end = self.buf.len() - CRC_SIZE;
        let calculated = crc16(&self.buf[SYNC.len()..span_end]);
        let received = u16::from_le_bytes([self.buf[span_end], self.buf[span_end + 1]]);

        if calculated != received {
            self.stats.crc_failures += 1;
            debug!(
                "crc mismatch: calculated={calculated:#06x} received={received:#06x} len={}",
                self.declared_len
            );
            self.resync(last);
            return None;
        }

        let message = Message {
            msg_type: self.msg_type,
            seq: self.seq,
            payload: Bytes::copy_from_slice(&self.buf[HEADER_SIZE..span_end]),
        };
        self.stats.frames += 1;
        self.reset();
        Some(message)
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(msg_type: u8, seq: u8, payload: &[u8]) -> Vec<u8> {
        Message::new(msg_type, seq, payload.to_vec())
            .encode()
            .unwrap()
            .to_vec()
    }

    #[test]
    fn decodes_single_frame() {
        let wire = frame(0x82, 7, b"{\"ok\":true}");
        let mut decoder = FrameDecoder::new();

        let (last, head) = wire.split_last().unwrap();
        for &byte in head {
            assert!(decoder.feed(byte).is_none());
        }
        let msg = decoder.feed(*last).unwrap();

        assert_eq!(msg.msg_type, 0x82);
        assert_eq!(msg.seq, 7);
        assert_eq!(msg.payload.as_ref(), b"{\"ok\":true}");
        assert_eq!(decoder.stage(), DecodeStage::AwaitSync0);
        assert_eq!(decoder.buffered_len(), 0);
    }

    #[test]
    fn stage_progression() {
        let wire = frame(0x05, 1, b"ab");
        let mut decoder = FrameDecoder::new();
        let expected = [
            DecodeStage::AwaitSync1,
            DecodeStage::AwaitLength,
            DecodeStage::AwaitType,
            DecodeStage::AwaitSeq,
            DecodeStage::AwaitPayload,
            DecodeStage::AwaitPayload,
            DecodeStage::AwaitCrcLow,
            DecodeStage::AwaitCrcHigh,
        ];
        for (byte, stage) in wire.iter().zip(expected) {
            assert!(decoder.feed(*byte).is_none());
            assert_eq!(decoder.stage(), stage);
        }
    }

    #[test]
    fn empty_payload_skips_payload_stage() {
        let wire = frame(0x07, 3, b"");
        let mut decoder = FrameDecoder::new();
        for &byte in &wire[..5] {
            decoder.feed(byte);
        }
        assert_eq!(decoder.stage(), DecodeStage::AwaitCrcLow);
        assert!(decoder.feed(wire[5]).is_none());
        let msg = decoder.feed(wire[6]).unwrap();
        assert!(msg.payload.is_empty());
    }

    #[test]
    fn ignores_noise_before_sync() {
        let mut decoder = FrameDecoder::new();
        for byte in [0x00, 0x55, 0x13, 0xFF] {
            assert!(decoder.feed(byte).is_none());
            assert_eq!(decoder.stage(), DecodeStage::AwaitSync0);
            assert_eq!(decoder.buffered_len(), 0);
        }
    }

    #[test]
    fn back_to_back_frames() {
        let mut wire = frame(0x82, 1, b"{\"ok\":true}");
        wire.extend(frame(0x83, 0, b"{\"batt\":7400}"));

        let msgs = FrameDecoder::new().feed_all(&wire);
        assert_eq!(msgs.len(), 2);
        assert_eq!((msgs[0].msg_type, msgs[0].seq), (0x82, 1));
        assert_eq!((msgs[1].msg_type, msgs[1].seq), (0x83, 0));
    }

    #[test]
    fn repeated_sync0_restarts_candidate() {
        let mut wire = vec![0xAA];
        wire.extend(frame(0x81, 2, b"{}"));

        let mut decoder = FrameDecoder::new();
        let msgs = decoder.feed_all(&wire);
        assert_eq!(msgs, vec![Message::new(0x81, 2, &b"{}"[..])]);
        assert_eq!(decoder.stats().sync_misses, 1);
    }

    #[test]
    fn bad_length_that_is_sync0_restarts_candidate() {
        // 0xAA as LEN is out of range, but starts the next frame.
        let mut wire = vec![0xAA, 0x55];
        wire.extend(frame(0x82, 9, b""));

        let mut decoder = FrameDecoder::new();
        let msgs = decoder.feed_all(&wire);
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].seq, 9);
        assert_eq!(decoder.stats().length_rejects, 1);
    }

    #[test]
    fn length_out_of_range_rejected() {
        let mut decoder = FrameDecoder::new();
        decoder.feed_all(&[0xAA, 0x55, 0x01]);
        assert_eq!(decoder.stage(), DecodeStage::AwaitSync0);
        decoder.feed_all(&[0xAA, 0x55, MAX_LEN + 1]);
        assert_eq!(decoder.stage(), DecodeStage::AwaitSync0);
        assert_eq!(decoder.stats().length_rejects, 2);
    }

    #[test]
    fn crc_failure_drops_frame() {
        let mut wire = frame(0x82, 4, b"{\"ok\":true}");
        let last = wire.len() - 1;
        wire[last] ^= 0x01;

        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed_all(&wire).is_empty());
        assert_eq!(decoder.stats().crc_failures, 1);
        assert_eq!(decoder.stage(), DecodeStage::AwaitSync0);
    }

    #[test]
    fn crc_failure_on_sync0_byte_restarts_candidate() {
        // Valid HELLO frame ends with CRC high 0xA2; corrupt it to 0xAA.
        let valid = frame(0x01, 1, b"{}");
        assert_ne!(valid[valid.len() - 1], 0xAA);
        let mut wire = valid.clone();
        let last = wire.len() - 1;
        wire[last] = 0xAA;
        // The next frame's 0xAA was swallowed as the bad CRC byte.
        wire.extend_from_slice(&valid[1..]);

        let mut decoder = FrameDecoder::new();
        let msgs = decoder.feed_all(&wire);
        assert_eq!(msgs, vec![Message::new(0x01, 1, &b"{}"[..])]);
        assert_eq!(decoder.stats().crc_failures, 1);
    }

    #[test]
    fn noise_ending_in_sync0_before_frame() {
        let mut wire = vec![0x10, 0x20, 0xAA];
        wire.extend(frame(0x82, 5, b"{\"ok\":false,\"err\":4}"));
        let msgs = FrameDecoder::new().feed_all(&wire);
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].seq, 5);
    }

    #[test]
    fn truncated_frame_then_valid_frame() {
        // The cut-off frame swallows frame 1 as payload and the head of
        // frame 2 as its CRC. Frame 3 decodes.
        let mut wire = frame(0x83, 0, b"0123456789")[..8].to_vec();
        wire.extend(frame(0x82, 1, b""));
        wire.extend(frame(0x82, 2, b""));
        wire.extend(frame(0x82, 3, b""));

        let mut decoder = FrameDecoder::new();
        let msgs = decoder.feed_all(&wire);
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].seq, 3);
        assert_eq!(decoder.stats().crc_failures, 1);
    }

    #[test]
    fn buffer_never_exceeds_cap() {
        let mut decoder = FrameDecoder::new();
        let mut noise = vec![0xAA, 0x55, MAX_LEN];
        noise.extend(std::iter::repeat(0xEE).take(200));
        for byte in noise {
            decoder.feed(byte);
            assert!(decoder.buffered_len() <= BUFFER_CAP);
        }
    }

    #[test]
    fn reset_discards_partial_frame() {
        let wire = frame(0x82, 1, b"{}");
        let mut decoder = FrameDecoder::new();
        decoder.feed_all(&wire[..4]);
        decoder.reset();
        assert_eq!(decoder.stage(), DecodeStage::AwaitSync0);
        assert_eq!(decoder.buffered_len(), 0);
        assert_eq!(decoder.feed_all(&wire).len(), 1);
    }

    #[test]
    fn largest_frame_completes_on_its_last_byte() {
        let payload = [0x5A; crate::codec::MAX_PAYLOAD];
        let wire = frame(0x83, 42, &payload);
        assert_eq!(wire.len(), BUFFER_CAP);

        let mut decoder = FrameDecoder::new();
        let (last, head) = wire.split_last().unwrap();
        for &byte in head {
            assert!(decoder.feed(byte).is_none());
        }
        assert_eq!(decoder.buffered_len(), BUFFER_CAP - 1);
        let msg = decoder.feed(*last).unwrap();
        assert_eq!(msg.payload.as_ref(), &payload[..]);
        assert_eq!(decoder.stats().frames, 1);
    }

    #[test]
    fn stats_count_frames() {
        let mut wire = frame(0x82, 1, b"");
        wire.extend(frame(0x82, 2, b""));
        let mut decoder = FrameDecoder::new();
        decoder.feed_all(&wire);
        assert_eq!(decoder.stats().frames, 2);
    }
}
