use std::time::Duration;

use tracing::{debug, trace};
use zipwire_frame::{
    deadline_after, msg_type, DecoderStats, FrameError, FramedChannel, Message, MAX_PAYLOAD,
};
use zipwire_transport::ByteChannel;

use crate::command::Command;
use crate::error::Result;
use crate::reply::Reply;
use crate::sequence::SequenceGenerator;

/// Session timing configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long [`Session::execute`] waits for a correlated response.
    pub response_timeout: Duration,
    /// Sleep between channel polls while waiting.
    pub poll_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            response_timeout: Duration::from_secs(2),
            poll_interval: Duration::from_millis(5),
        }
    }
}

/// How a wait for a correlated response ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// An INFO or ACK carrying the awaited sequence number.
    Acknowledged(Message),
    /// The timeout elapsed first.
    TimedOut,
}

impl Outcome {
    /// The matched response, if any.
    pub fn message(&self) -> Option<&Message> {
        match self {
            Outcome::Acknowledged(message) => Some(message),
            Outcome::TimedOut => None,
        }
    }
}

/// True when `message` answers the transaction numbered `seq`.
pub fn is_correlated(message: &Message, seq: u8) -> bool {
    msg_type::is_response(message.msg_type) && message.seq == seq
}

/// A command/response session with one controller.
///
/// One transaction is outstanding at a time. While waiting, any message
/// that is not a response carrying the awaited sequence number (telemetry,
/// faults, late replies to earlier commands) is consumed and dropped.
pub struct Session<C> {
    framed: FramedChannel<C>,
    sequence: SequenceGenerator,
    config: SessionConfig,
    discarded: u64,
}

impl<C: ByteChannel> Session<C> {
    /// Create a session with default timing.
    pub fn new(channel: C) -> Self {
        Self::with_config(channel, SessionConfig::default())
    }

    /// Create a session with explicit timing.
    pub fn with_config(channel: C, config: SessionConfig) -> Self {
        Self {
            framed: FramedChannel::new(channel),
            sequence: SequenceGenerator::new(),
            config,
            discarded: 0,
        }
    }

    /// Transmit a command frame and return its sequence number.
    ///
    /// Does not wait for a response. An oversized payload fails before a
    /// sequence number is consumed.
    pub fn send(&mut self, msg_type: u8, payload: &[u8]) -> Result<u8> {
        if payload.len() > MAX_PAYLOAD {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD,
            }
            .into());
        }

        let seq = self.sequence.next_seq();
        self.framed.send(msg_type, seq, payload)?;
        Ok(seq)
    }

    /// Wait up to `timeout` for the response to transaction `seq`.
    pub fn await_response(&mut self, seq: u8, timeout: Duration) -> Result<Outcome> {
        let deadline = deadline_after(timeout);
        loop {
            let Some(message) = self
                .framed
                .recv_message(deadline, self.config.poll_interval)?
            else {
                trace!(seq, ?timeout, "no response before deadline");
                return Ok(Outcome::TimedOut);
            };

            if is_correlated(&message, seq) {
                return Ok(Outcome::Acknowledged(message));
            }

            self.discarded += 1;
            debug!(
                msg_type = msg_type::type_name(message.msg_type),
                seq = message.seq,
                awaiting = seq,
                "discarding uncorrelated message"
            );
        }
    }

    /// Send a frame and wait for its response using the configured timeout.
    pub fn transact(&mut self, msg_type: u8, payload: &[u8]) -> Result<Outcome> {
        let seq = self.send(msg_type, payload)?;
        self.await_response(seq, self.config.response_timeout)
    }

    /// Send a typed command and interpret the controller's answer.
    pub fn execute(&mut self, command: &Command) -> Result<Reply> {
        let payload = command.payload()?;
        match self.transact(command.msg_type(), &payload)? {
            Outcome::Acknowledged(message) => Ok(Reply::from_response(&message)),
            Outcome::TimedOut => Ok(Reply::TimedOut),
        }
    }

    /// Return the next inbound message without waiting, bypassing correlation.
    pub fn poll_message(&mut self) -> Result<Option<Message>> {
        Ok(self.framed.poll_message()?)
    }

    /// Sequence number of the most recent transmission.
    pub fn last_seq(&self) -> Option<u8> {
        self.sequence.last()
    }

    /// Number of messages dropped while waiting for responses.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    /// Decoder counters for the underlying channel.
    pub fn stats(&self) -> DecoderStats {
        self.framed.stats()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Borrow the underlying channel.
    pub fn channel(&self) -> &C {
        self.framed.get_ref()
    }

    /// Mutably borrow the underlying channel.
    pub fn channel_mut(&mut self) -> &mut C {
        self.framed.get_mut()
    }

    /// Consume the session and return the underlying channel.
    pub fn into_inner(self) -> C {
        self.framed.into_inner()
    }
}

impl<C> std::fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("framed", &self.framed)
            .field("last_seq", &self.sequence.last())
            .field("config", &self.config)
            .field("discarded", &self.discarded)
            .finish()
    }
}
