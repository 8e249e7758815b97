//! Typed host → controller commands.
//!
//! Each [`Command`] knows its wire type code and renders its own compact
//! JSON payload. Commands without parameters are sent as `{}`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use zipwire_frame::msg_type;

use crate::error::{Result, SessionError};

/// Largest servo angle in degrees.
pub const SERVO_MAX_ANGLE: u8 = 180;

/// Track PWM range accepted by `DRIVE_TANK`.
pub const TANK_PWM_LIMIT: u16 = 255;

/// Controller operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Standby,
    Manual,
    LineFollow,
    ObstacleAvoid,
    Follow,
}

impl Mode {
    /// All modes, in code order.
    pub const ALL: [Mode; 5] = [
        Mode::Standby,
        Mode::Manual,
        Mode::LineFollow,
        Mode::ObstacleAvoid,
        Mode::Follow,
    ];

    /// Numeric code used on the wire.
    pub fn code(self) -> u8 {
        match self {
            Mode::Standby => 0,
            Mode::Manual => 1,
            Mode::LineFollow => 2,
            Mode::ObstacleAvoid => 3,
            Mode::Follow => 4,
        }
    }

    /// Look up a mode by wire code.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.code() == code)
    }

    /// Canonical lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            Mode::Standby => "standby",
            Mode::Manual => "manual",
            Mode::LineFollow => "line-follow",
            Mode::ObstacleAvoid => "obstacle-avoid",
            Mode::Follow => "follow",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = SessionError;

    /// Accepts a canonical name (`line-follow`, `line_follow`) or a wire code.
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        if let Some(mode) = Self::ALL.into_iter().find(|m| m.name() == normalized) {
            return Ok(mode);
        }
        normalized
            .parse::<u8>()
            .ok()
            .and_then(Self::from_code)
            .ok_or_else(|| SessionError::InvalidCommand(format!("unknown mode '{s}'")))
    }
}

/// A command the host can send to the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Ask the controller to identify itself.
    Hello,
    /// Switch operating mode.
    SetMode(Mode),
    /// Drive by linear velocity (mm/s) and yaw rate (mrad/s).
    DriveTwist { v: i16, omega: i16 },
    /// Drive each track with a signed PWM value.
    DriveTank { left: i16, right: i16 },
    /// Point the pan servo.
    Servo { angle: u8 },
    /// Set the status LED colour.
    Led { r: u8, g: u8, b: u8, brightness: u8 },
    /// Stop all motion and latch the stop.
    EStop,
    /// Write a runtime configuration key.
    ConfigSet {
        key: String,
        value: serde_json::Value,
    },
}

#[derive(Serialize, Deserialize)]
pub(crate) struct ModePayload {
    pub mode: i64,
}

#[derive(Serialize, Deserialize)]
pub(crate) struct TwistPayload {
    pub v: i64,
    pub omega: i64,
}

#[derive(Serialize, Deserialize)]
pub(crate) struct TankPayload {
    pub left: i64,
    pub right: i64,
}

#[derive(Serialize, Deserialize)]
pub(crate) struct ServoPayload {
    pub angle: i64,
}

#[derive(Serialize, Deserialize)]
pub(crate) struct LedPayload {
    pub r: i64,
    pub g: i64,
    pub b: i64,
    pub brightness: i64,
}

#[derive(Serialize, Deserialize)]
pub(crate) struct ConfigPayload {
    pub key: String,
    pub value: serde_json::Value,
}

impl Command {
    /// Wire type code.
    pub fn msg_type(&self) -> u8 {
        match self {
            Command::Hello => msg_type::HELLO,
            Command::SetMode(_) => msg_type::SET_MODE,
            Command::DriveTwist { .. } => msg_type::DRIVE_TWIST,
            Command::DriveTank { .. } => msg_type::DRIVE_TANK,
            Command::Servo { .. } => msg_type::SERVO,
            Command::Led { .. } => msg_type::LED,
            Command::EStop => msg_type::E_STOP,
            Command::ConfigSet { .. } => msg_type::CONFIG_SET,
        }
    }

    /// Check parameter ranges the type system does not already enforce.
    pub fn validate(&self) -> Result<()> {
        match self {
            Command::Servo { angle } if *angle > SERVO_MAX_ANGLE => {
                Err(SessionError::InvalidCommand(format!(
                    "servo angle {angle} out of range 0..={SERVO_MAX_ANGLE}"
                )))
            }
            Command::DriveTank { left, right }
                if left.unsigned_abs() > TANK_PWM_LIMIT || right.unsigned_abs() > TANK_PWM_LIMIT =>
            {
                Err(SessionError::InvalidCommand(format!(
                    "track PWM ({left}, {right}) out of range -{TANK_PWM_LIMIT}..={TANK_PWM_LIMIT}"
                )))
            }
            Command::ConfigSet { key, .. } if key.is_empty() => Err(
                SessionError::InvalidCommand("config key must not be empty".to_string()),
            ),
            _ => Ok(()),
        }
    }

    /// Validate and render the compact JSON payload.
    pub fn payload(&self) -> Result<Vec<u8>> {
        self.validate()?;
        let payload = match self {
            Command::Hello | Command::EStop => b"{}".to_vec(),
            Command::SetMode(mode) => serde_json::to_vec(&ModePayload {
                mode: mode.code().into(),
            })?,
            Command::DriveTwist { v, omega } => serde_json::to_vec(&TwistPayload {
                v: (*v).into(),
                omega: (*omega).into(),
            })?,
            Command::DriveTank { left, right } => serde_json::to_vec(&TankPayload {
                left: (*left).into(),
                right: (*right).into(),
            })?,
            Command::Servo { angle } => serde_json::to_vec(&ServoPayload {
                angle: (*angle).into(),
            })?,
            Command::Led { r, g, b, brightness } => serde_json::to_vec(&LedPayload {
                r: (*r).into(),
                g: (*g).into(),
                b: (*b).into(),
                brightness: (*brightness).into(),
            })?,
            Command::ConfigSet { key, value } => serde_json::to_vec(&ConfigPayload {
                key: key.clone(),
                value: value.clone(),
            })?,
        };
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(cmd: &Command) -> String {
        String::from_utf8(cmd.payload().unwrap()).unwrap()
    }

    #[test]
    fn empty_commands_send_braces() {
        assert_eq!(text(&Command::Hello), "{}");
        assert_eq!(text(&Command::EStop), "{}");
    }

    #[test]
    fn payloads_are_compact_json() {
        assert_eq!(text(&Command::SetMode(Mode::Manual)), r#"{"mode":1}"#);
        assert_eq!(
            text(&Command::DriveTwist { v: 120, omega: -40 }),
            r#"{"v":120,"omega":-40}"#
        );
        assert_eq!(
            text(&Command::DriveTank { left: 50, right: -50 }),
            r#"{"left":50,"right":-50}"#
        );
        assert_eq!(text(&Command::Servo { angle: 90 }), r#"{"angle":90}"#);
        assert_eq!(
            text(&Command::Led {
                r: 255,
                g: 0,
                b: 0,
                brightness: 128
            }),
            r#"{"r":255,"g":0,"b":0,"brightness":128}"#
        );
        assert_eq!(
            text(&Command::ConfigSet {
                key: "max_pwm".into(),
                value: serde_json::json!(200)
            }),
            r#"{"key":"max_pwm","value":200}"#
        );
    }

    #[test]
    fn type_codes() {
        assert_eq!(Command::Hello.msg_type(), 0x01);
        assert_eq!(Command::SetMode(Mode::Follow).msg_type(), 0x02);
        assert_eq!(Command::EStop.msg_type(), 0x07);
        assert_eq!(
            Command::ConfigSet {
                key: "k".into(),
                value: serde_json::Value::Null
            }
            .msg_type(),
            0x08
        );
    }

    #[test]
    fn servo_angle_is_range_checked() {
        assert!(Command::Servo { angle: 180 }.validate().is_ok());
        let err = Command::Servo { angle: 181 }.payload().unwrap_err();
        assert!(matches!(err, SessionError::InvalidCommand(_)));
    }

    #[test]
    fn tank_pwm_is_range_checked() {
        assert!(Command::DriveTank { left: -255, right: 255 }.validate().is_ok());
        assert!(Command::DriveTank { left: 256, right: 0 }.validate().is_err());
        assert!(Command::DriveTank { left: 0, right: -300 }.validate().is_err());
        assert!(Command::DriveTank { left: i16::MIN, right: 0 }.validate().is_err());
    }

    #[test]
    fn config_key_required() {
        let cmd = Command::ConfigSet {
            key: String::new(),
            value: serde_json::json!(1),
        };
        assert!(cmd.validate().is_err());
    }

    #[test]
    fn mode_parsing() {
        assert_eq!("manual".parse::<Mode>().unwrap(), Mode::Manual);
        assert_eq!("LINE_FOLLOW".parse::<Mode>().unwrap(), Mode::LineFollow);
        assert_eq!("3".parse::<Mode>().unwrap(), Mode::ObstacleAvoid);
        assert!("5".parse::<Mode>().is_err());
        assert!("turbo".parse::<Mode>().is_err());
    }

    #[test]
    fn mode_codes_roundtrip() {
        for mode in Mode::ALL {
            assert_eq!(Mode::from_code(mode.code()), Some(mode));
        }
        assert_eq!(Mode::from_code(9), None);
    }
}
