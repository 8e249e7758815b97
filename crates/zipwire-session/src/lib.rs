//! Command/response sessions over zipwire frames.
//!
//! This is the transaction layer. A [`Session`] numbers each outbound
//! command, transmits it, and waits under a timeout for the INFO or ACK
//! that carries the same sequence number. Everything else received while
//! waiting is dropped. Retrying is left to the caller.
//!
//! ```no_run
//! use zipwire_session::{Command, Mode, Reply, Session};
//! use zipwire_transport::SocketChannel;
//!
//! let channel = SocketChannel::connect("/tmp/zip.sock")?;
//! let mut session = Session::new(channel);
//! match session.execute(&Command::SetMode(Mode::Manual))? {
//!     Reply::Accepted(_) => println!("manual mode"),
//!     other => println!("not accepted: {other:?}"),
//! }
//! # Ok::<(), zipwire_session::SessionError>(())
//! ```

pub mod command;
pub mod device;
pub mod error;
pub mod reply;
pub mod sequence;
pub mod session;

#[cfg(feature = "async")]
pub mod async_session;

pub use command::{Command, Mode, SERVO_MAX_ANGLE, TANK_PWM_LIMIT};
pub use device::{DeviceInfo, DeviceSimulator, DeviceState};
pub use error::{Result, SessionError};
pub use reply::{Ack, AckCode, Reply};
pub use sequence::SequenceGenerator;
pub use session::{is_correlated, Outcome, Session, SessionConfig};

#[cfg(feature = "async")]
pub use async_session::AsyncSession;
