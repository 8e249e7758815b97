//! In-memory channel for deterministic testing of the protocol engine.
//!
//! [`MockChannel`] records everything written to it and serves inbound bytes
//! from a queue. A responder closure can be installed to script the remote
//! side: every write is handed to the responder and whatever it returns is
//! appended to the inbound queue.
//!
//! ```
//! use zipwire_transport::{ByteChannel, MockChannel};
//!
//! let mut channel = MockChannel::with_responder(|sent| sent.to_vec());
//! channel.write_all(b"ping").unwrap();
//!
//! let mut buf = [0u8; 8];
//! let n = channel.read_available(&mut buf).unwrap();
//! assert_eq!(&buf[..n], b"ping");
//! ```

use std::collections::VecDeque;
use std::fmt;

use crate::error::{Result, TransportError};
use crate::traits::ByteChannel;

type Responder = Box<dyn FnMut(&[u8]) -> Vec<u8> + Send>;

/// A scripted in-memory [`ByteChannel`].
#[derive(Default)]
pub struct MockChannel {
    inbound: VecDeque<u8>,
    written: Vec<Vec<u8>>,
    responder: Option<Responder>,
    /// Once set, an empty inbound queue reports [`TransportError::Closed`].
    closed: bool,
}

impl MockChannel {
    /// Create a silent channel: writes are recorded, nothing ever arrives.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a channel whose remote side answers each write with the
    /// bytes returned by `responder`.
    pub fn with_responder<F>(responder: F) -> Self
    where
        F: FnMut(&[u8]) -> Vec<u8> + Send + 'static,
    {
        Self {
            responder: Some(Box::new(responder)),
            ..Self::default()
        }
    }

    /// Queue bytes as if the remote side had sent them.
    pub fn push_inbound(&mut self, bytes: &[u8]) {
        self.inbound.extend(bytes.iter().copied());
    }

    /// Mark the remote side as gone once the inbound queue drains.
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Every `write_all` call, in order.
    pub fn written(&self) -> &[Vec<u8>] {
        &self.written
    }

    /// All written bytes concatenated.
    pub fn written_bytes(&self) -> Vec<u8> {
        self.written.concat()
    }

    /// Bytes still waiting to be read.
    pub fn pending_inbound(&self) -> usize {
        self.inbound.len()
    }
}

impl ByteChannel for MockChannel {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.written.push(bytes.to_vec());
        if let Some(responder) = self.responder.as_mut() {
            let reply = responder(bytes);
            self.inbound.extend(reply);
        }
        Ok(())
    }

    fn bytes_available(&mut self) -> Result<usize> {
        if self.inbound.is_empty() && self.closed {
            return Err(TransportError::Closed);
        }
        Ok(self.inbound.len())
    }

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.inbound.is_empty() && self.closed {
            return Err(TransportError::Closed);
        }
        let n = buf.len().min(self.inbound.len());
        for (slot, byte) in buf.iter_mut().zip(self.inbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl fmt::Debug for MockChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockChannel")
            .field("inbound", &self.inbound.len())
            .field("writes", &self.written.len())
            .field("responder", &self.responder.is_some())
            .field("closed", &self.closed)
            .finish()
    }
}
