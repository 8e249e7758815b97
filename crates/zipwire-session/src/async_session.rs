//! Async session over any `AsyncRead + AsyncWrite` stream.
//!
//! Same correlation rules as [`Session`](crate::Session); the wait suspends
//! the task instead of blocking the thread, and dropping the future abandons
//! the transaction.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tracing::debug;
use zipwire_frame::{msg_type, FrameError, Message, ZipCodec, MAX_PAYLOAD};
use zipwire_transport::TransportError;

use crate::command::Command;
use crate::error::Result;
use crate::reply::Reply;
use crate::sequence::SequenceGenerator;
use crate::session::{is_correlated, Outcome, SessionConfig};

/// Async command/response session.
pub struct AsyncSession<T> {
    framed: Framed<T, ZipCodec>,
    sequence: SequenceGenerator,
    config: SessionConfig,
    discarded: u64,
}

impl<T> AsyncSession<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(io: T) -> Self {
        Self::with_config(io, SessionConfig::default())
    }

    pub fn with_config(io: T, config: SessionConfig) -> Self {
        Self {
            framed: Framed::new(io, ZipCodec::new()),
            sequence: SequenceGenerator::new(),
            config,
            discarded: 0,
        }
    }

    /// Transmit a command frame and return its sequence number.
    pub async fn send(&mut self, msg_type: u8, payload: &[u8]) -> Result<u8> {
        if payload.len() > MAX_PAYLOAD {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD,
            }
            .into());
        }

        let seq = self.sequence.next_seq();
        self.framed
            .send(Message::new(msg_type, seq, payload.to_vec()))
            .await?;
        debug!(msg_type = msg_type::type_name(msg_type), seq, "sent frame");
        Ok(seq)
    }

    /// Wait up to `timeout` for the response to transaction `seq`.
    pub async fn await_response(&mut self, seq: u8, timeout: Duration) -> Result<Outcome> {
        match tokio::time::timeout(timeout, self.next_correlated(seq)).await {
            Ok(result) => result.map(Outcome::Acknowledged),
            Err(_) => Ok(Outcome::TimedOut),
        }
    }

    /// Send a frame and wait for its response using the configured timeout.
    pub async fn transact(&mut self, msg_type: u8, payload: &[u8]) -> Result<Outcome> {
        let seq = self.send(msg_type, payload).await?;
        self.await_response(seq, self.config.response_timeout).await
    }

    /// Send a typed command and interpret the controller's answer.
    pub async fn execute(&mut self, command: &Command) -> Result<Reply> {
        let payload = command.payload()?;
        match self.transact(command.msg_type(), &payload).await? {
            Outcome::Acknowledged(message) => Ok(Reply::from_response(&message)),
            Outcome::TimedOut => Ok(Reply::TimedOut),
        }
    }

    pub fn last_seq(&self) -> Option<u8> {
        self.sequence.last()
    }

    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    pub fn into_inner(self) -> T {
        self.framed.into_inner()
    }

    async fn next_correlated(&mut self, seq: u8) -> Result<Message> {
        loop {
            let message = self
                .framed
                .next()
                .await
                .ok_or(FrameError::Transport(TransportError::Closed))??;

            if is_correlated(&message, seq) {
                return Ok(message);
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
}

impl<T> std::fmt::Debug for AsyncSession<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncSession")
            .field("last_seq", &self.sequence.last())
            .field("config", &self.config)
            .field("discarded", &self.discarded)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;
    use crate::device::DeviceSimulator;
    use crate::error::SessionError;

    fn fast() -> SessionConfig {
        SessionConfig {
            response_timeout: Duration::from_millis(500),
            poll_interval: Duration::from_millis(1),
        }
    }

    /// Serve `device` on the far end of an in-memory duplex pipe.
    fn spawn_device(mut io: tokio::io::DuplexStream, mut device: DeviceSimulator) {
        tokio::spawn(async move {
            let mut buf = [0u8; 256];
            loop {
                let n = match io.read(&mut buf).await {
                    Ok(0) | Err(_) => return,
                    Ok(n) => n,
                };
                let reply = device.handle_bytes(&buf[..n]);
                if io.write_all(&reply).await.is_err() {
                    return;
                }
            }
        });
    }

    #[tokio::test]
    async fn execute_against_simulator() {
        let (host, device) = tokio::io::duplex(1024);
        spawn_device(device, DeviceSimulator::new());
        let mut session = AsyncSession::with_config(host, fast());

        let info = session.execute(&Command::Hello).await.unwrap();
        assert!(matches!(info, Reply::Info(_)));

        let reply = session
            .execute(&Command::DriveTank { left: 10, right: 10 })
            .await
            .unwrap();
        assert!(matches!(reply, Reply::Rejected(_)));

        let reply = session
            .execute(&Command::SetMode(crate::command::Mode::Manual))
            .await
            .unwrap();
        assert!(reply.is_success());
        assert_eq!(session.last_seq(), Some(3));
        // The ACK trailing HELLO's INFO.
        assert_eq!(session.discarded(), 1);
    }

    #[tokio::test]
    async fn silent_peer_times_out() {
        let (host, _device) = tokio::io::duplex(1024);
        let mut session = AsyncSession::with_config(host, fast());

        let seq = session.send(msg_type::HELLO, b"{}").await.unwrap();
        let outcome = session
            .await_response(seq, Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::TimedOut);
    }

    #[tokio::test]
    async fn closed_peer_is_an_error() {
        let (host, device) = tokio::io::duplex(1024);
        drop(device);
        let mut session = AsyncSession::with_config(host, fast());

        let err = session
            .await_response(1, Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Frame(_)));
    }
}
