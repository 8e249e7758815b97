/// Errors that can occur in session operations.
///
/// A command that goes unanswered is not an error: it surfaces as
/// [`Outcome::TimedOut`](crate::Outcome::TimedOut).
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] zipwire_transport::TransportError),

    /// Frame-level error, including oversized payloads.
    #[error("frame error: {0}")]
    Frame(#[from] zipwire_frame::FrameError),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A command failed local validation and was not sent.
    #[error("invalid command: {0}")]
    InvalidCommand(String),
}

pub type Result<T> = std::result::Result<T, SessionError>;
