use std::fmt;

use serde::{Deserialize, Serialize};
use zipwire_frame::{msg_type, Message};

/// Controller error codes carried in a negative ACK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckCode {
    UnknownCommand,
    InvalidParameter,
    InvalidMode,
    /// Drive commands are only accepted in manual mode.
    WrongMode,
    ParseError,
}

impl AckCode {
    /// Numeric code used on the wire.
    pub fn code(self) -> i64 {
        match self {
            AckCode::UnknownCommand => 1,
            AckCode::InvalidParameter => 2,
            AckCode::InvalidMode => 3,
            AckCode::WrongMode => 4,
            AckCode::ParseError => 5,
        }
    }

    /// Look up a code received from the controller.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(AckCode::UnknownCommand),
            2 => Some(AckCode::InvalidParameter),
            3 => Some(AckCode::InvalidMode),
            4 => Some(AckCode::WrongMode),
            5 => Some(AckCode::ParseError),
            _ => None,
        }
    }

    /// Short description, small enough to ride along in an ACK payload.
    pub fn description(self) -> &'static str {
        match self {
            AckCode::UnknownCommand => "unknown command",
            AckCode::InvalidParameter => "invalid parameter",
            AckCode::InvalidMode => "invalid mode",
            AckCode::WrongMode => "wrong mode",
            AckCode::ParseError => "json parse error",
        }
    }
}

impl fmt::Display for AckCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Decoded ACK payload: `{"ok": bool, "err": int, "message": string}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    #[serde(default = "default_ok")]
    pub ok: bool,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub err: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

fn default_ok() -> bool {
    true
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}

impl Ack {
    /// A positive acknowledgement.
    pub fn accepted() -> Self {
        Self {
            ok: true,
            err: 0,
            message: String::new(),
        }
    }

    /// A negative acknowledgement for `code`.
    pub fn rejected(code: AckCode) -> Self {
        Self {
            ok: false,
            err: code.code(),
            message: code.description().to_string(),
        }
    }

    /// Parse an ACK payload.
    ///
    /// Controllers in the field sometimes send truncated or non-JSON ACKs;
    /// anything unparsable counts as a positive acknowledgement.
    pub fn parse(payload: &[u8]) -> Self {
        serde_json::from_slice(payload).unwrap_or_else(|_| Self::accepted())
    }

    /// The typed error code, if the controller sent a known one.
    pub fn code(&self) -> Option<AckCode> {
        AckCode::from_code(self.err)
    }
}

/// Result of [`Session::execute`](crate::Session::execute).
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// The controller acknowledged the command.
    Accepted(Ack),
    /// The controller answered with its identity.
    Info(serde_json::Value),
    /// The controller refused the command.
    Rejected(Ack),
    /// No correlated response arrived in time.
    TimedOut,
}

impl Reply {
    /// Interpret a correlated response message.
    pub fn from_response(message: &Message) -> Self {
        if message.msg_type == msg_type::INFO {
            let info = serde_json::from_slice(&message.payload).unwrap_or_else(|_| {
                serde_json::Value::String(String::from_utf8_lossy(&message.payload).into_owned())
            });
            return Reply::Info(info);
        }

        let ack = Ack::parse(&message.payload);
        if ack.ok {
            Reply::Accepted(ack)
        } else {
            Reply::Rejected(ack)
        }
    }

    /// True for `Accepted` and `Info`.
    pub fn is_success(&self) -> bool {
        matches!(self, Reply::Accepted(_) | Reply::Info(_))
    }
}
