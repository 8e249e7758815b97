//! Duplex byte channel abstraction for zipwire.
//!
//! The protocol engine never opens, configures or closes a link itself. It
//! talks to a [`ByteChannel`]: something that can write bytes and hand back
//! whatever inbound bytes are pending without blocking.
//!
//! Provided channels:
//! - [`SerialChannel`] — a physical or USB virtual serial port (`serial` feature)
//! - [`SocketChannel`] — a Unix domain socket, used for bridged or simulated links
//! - [`MockChannel`] — in-memory channel with a scripted responder, for tests
//!
//! This is the lowest layer of zipwire. Everything else builds on top of
//! the [`ByteChannel`] trait provided here.

pub mod error;
pub mod mock;
pub mod traits;

#[cfg(feature = "serial")]
pub mod serial;

#[cfg(unix)]
pub mod socket;

pub use error::{Result, TransportError};
pub use mock::MockChannel;
pub use traits::ByteChannel;

#[cfg(feature = "serial")]
pub use serial::{SerialChannel, SerialConfig};

#[cfg(unix)]
pub use socket::{SocketChannel, SocketListener};
