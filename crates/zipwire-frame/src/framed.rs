use std::collections::VecDeque;
use std::time::{Duration, Instant};

use bytes::BytesMut;
use tracing::debug;
use zipwire_transport::ByteChannel;

use crate::codec::{encode_frame, Message, MAX_FRAME_SIZE};
use crate::decoder::{DecoderStats, FrameDecoder};
use crate::error::Result;
use crate::msg_type::type_name;

const READ_CHUNK_SIZE: usize = 256;

/// Stand-in deadline for waits too long to represent as an [`Instant`].
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// The instant `timeout` from now, saturating instead of overflowing.
///
/// Timeouts past what the platform clock can represent wait about a
/// century, which callers treat as "no deadline".
pub fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// Sends and receives framed messages over a [`ByteChannel`].
///
/// Owns the channel's decoder state. Messages come back in exactly the order
/// their bytes arrived; a read that completes several frames queues the
/// extras for the following calls.
pub struct FramedChannel<C> {
    inner: C,
    decoder: FrameDecoder,
    ready: VecDeque<Message>,
    write_buf: BytesMut,
}

impl<C: ByteChannel> FramedChannel<C> {
    /// Wrap a byte channel.
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            decoder: FrameDecoder::new(),
            ready: VecDeque::new(),
            write_buf: BytesMut::with_capacity(MAX_FRAME_SIZE),
        }
    }

    /// Encode and transmit one frame.
    ///
    /// Oversized payloads are rejected before anything is written.
    pub fn send(&mut self, msg_type: u8, seq: u8, payload: &[u8]) -> Result<()> {
        self.write_buf.clear();
        encode_frame(msg_type, seq, payload, &mut self.write_buf)?;
        self.inner.write_all(&self.write_buf)?;
        debug!(
            msg_type = type_name(msg_type),
            seq,
            size = self.write_buf.len(),
            "sent frame"
        );
        Ok(())
    }

    /// Transmit a prebuilt message.
    pub fn write_message(&mut self, message: &Message) -> Result<()> {
        self.send(message.msg_type, message.seq, &message.payload)
    }

    /// Return the next decoded message without blocking.
    pub fn poll_message(&mut self) -> Result<Option<Message>> {
        if let Some(message) = self.ready.pop_front() {
            return Ok(Some(message));
        }

        let mut chunk = [0u8; READ_CHUNK_SIZE];
        let n = self.inner.read_available(&mut chunk)?;
        for &byte in &chunk[..n] {
            if let Some(message) = self.decoder.feed(byte) {
                self.ready.push_back(message);
            }
        }

        Ok(self.ready.pop_front())
    }

    /// Wait for the next decoded message until `deadline`.
    ///
    /// Returns `Ok(None)` once the deadline passes. The channel is polled
    /// every `poll_interval` while idle.
    pub fn recv_message(
        &mut self,
        deadline: Instant,
        poll_interval: Duration,
    ) -> Result<Option<Message>> {
        loop {
            if let Some(message) = self.poll_message()? {
                return Ok(Some(message));
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            std::thread::sleep(poll_interval.min(deadline - now));
        }
    }

    /// Decoder counters for this channel.
    pub fn stats(&self) -> DecoderStats {
        self.decoder.stats()
    }

    /// Borrow the underlying channel.
    pub fn get_ref(&self) -> &C {
        &self.inner
    }

    /// Mutably borrow the underlying channel.
    pub fn get_mut(&mut self) -> &mut C {
        &mut self.inner
    }

    /// Consume the framed channel and return the inner byte channel.
    pub fn into_inner(self) -> C {
        self.inner
    }
}

impl<C> std::fmt::Debug for FramedChannel<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FramedChannel")
            .field("stage", &self.decoder.stage())
            .field("ready", &self.ready.len())
            .finish()
    }
}
