/// Errors that can occur during frame encoding or channel I/O.
///
/// Malformed or corrupted inbound frames are not errors: the decoder drops
/// them and resynchronizes.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload exceeds the maximum frame payload.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The underlying byte channel failed.
    #[error("channel error: {0}")]
    Transport(#[from] zipwire_transport::TransportError),
}

pub type Result<T> = std::result::Result<T, FrameError>;

impl From<std::io::Error> for FrameError {
    fn from(err: std::io::Error) -> Self {
        FrameError::Transport(zipwire_transport::TransportError::Io(err))
    }
}
