//! Framed command/response protocol engine for serial-linked robot
//! controllers.
//!
//! zipwire moves small JSON commands between a host and an embedded
//! controller over an unreliable byte stream, typically a USB serial port.
//!
//! # Crate Structure
//!
//! - [`transport`] — Duplex byte channels (serial, Unix socket, in-memory mock)
//! - [`frame`] — CRC-16 framing and the resynchronizing streaming decoder
//! - [`session`] — Sequence-correlated transactions, typed commands, device simulator

/// Re-export transport types.
pub mod transport {
    pub use zipwire_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use zipwire_frame::*;
}

/// Re-export session types.
pub mod session {
    pub use zipwire_session::*;
}
