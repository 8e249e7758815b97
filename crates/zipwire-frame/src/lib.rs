//! CRC-16 checked framing for the zipwire serial protocol.
//!
//! Every message travels as one self-delimited frame:
//! - 2 sync bytes `0xAA 0x55`
//! - 1 length byte covering TYPE + SEQ + payload
//! - 1 type byte and 1 sequence byte
//! - up to 64 payload bytes
//! - CRC-16/CCITT-FALSE over LEN..payload, little-endian
//!
//! The decoder is a byte-at-a-time state machine that resynchronizes on
//! noise and drops corrupted frames without surfacing an error.

pub mod codec;
pub mod crc;
pub mod decoder;
pub mod error;
pub mod framed;
pub mod msg_type;

#[cfg(feature = "async")]
pub mod zip_codec;

pub use codec::{
    decode_frame, encode_frame, Message, CRC_SIZE, HEADER_SIZE, MAX_FRAME_SIZE, MAX_LEN,
    MAX_PAYLOAD, MIN_LEN, SYNC,
};
pub use crc::{crc16, crc16_bitwise, Crc16};
pub use decoder::{DecodeStage, DecoderStats, FrameDecoder, BUFFER_CAP};
pub use error::{FrameError, Result};
pub use framed::{deadline_after, FramedChannel};
pub use msg_type::{
    ACK, CONFIG_SET, DRIVE_TANK, DRIVE_TWIST, E_STOP, FAULT, HELLO, INFO, LED, SERVO, SET_MODE,
    TELEMETRY,
};

#[cfg(feature = "async")]
pub use zip_codec::ZipCodec;
