//! Host-side emulation of the controller's command handling.
//!
//! [`DeviceSimulator`] answers frames the way the robot firmware does:
//! - HELLO → INFO then ACK, both carrying the request's sequence number
//! - drive commands are refused unless the controller is in manual mode
//! - E_STOP zeroes the tracks, drops to standby and latches until the next
//!   successful SET_MODE
//! - malformed JSON, out-of-range values and unknown codes get negative ACKs
//!
//! It backs the `simulate` CLI command and end-to-end session tests.

use std::collections::BTreeMap;

use bytes::BytesMut;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use zipwire_frame::{encode_frame, msg_type, FrameDecoder, Message};

use crate::command::{
    ConfigPayload, LedPayload, Mode, ModePayload, ServoPayload, TankPayload, TwistPayload,
    SERVO_MAX_ANGLE, TANK_PWM_LIMIT,
};
use crate::error::Result;
use crate::reply::{Ack, AckCode};

/// Identity reported in INFO frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub name: String,
    pub fw: String,
    pub proto: u8,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self {
            name: "ZIP".to_string(),
            fw: env!("CARGO_PKG_VERSION").to_string(),
            proto: 1,
        }
    }
}

/// Observable controller state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceState {
    pub mode: u8,
    pub estop: bool,
    pub left: i16,
    pub right: i16,
    pub servo: u8,
    #[serde(skip)]
    pub led: [u8; 4],
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            mode: Mode::Standby.code(),
            estop: false,
            left: 0,
            right: 0,
            servo: 90,
            led: [0; 4],
        }
    }
}

impl DeviceState {
    /// Current mode as a typed value.
    pub fn mode(&self) -> Mode {
        Mode::from_code(self.mode).unwrap_or(Mode::Standby)
    }
}

/// Emulated controller.
#[derive(Debug, Default)]
pub struct DeviceSimulator {
    decoder: FrameDecoder,
    info: DeviceInfo,
    state: DeviceState,
    config: BTreeMap<String, serde_json::Value>,
    handled: u64,
}

impl DeviceSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// A simulator reporting a custom identity.
    pub fn with_info(info: DeviceInfo) -> Self {
        Self {
            info,
            ..Self::default()
        }
    }

    /// Feed raw bytes from the host and return the encoded replies.
    pub fn handle_bytes(&mut self, bytes: &[u8]) -> Vec<u8> {
        let mut out = BytesMut::new();
        for message in self.decoder.feed_all(bytes) {
            for reply in self.handle_message(&message) {
                // Replies are built from bounded payloads.
                if let Err(err) = encode_frame(reply.msg_type, reply.seq, &reply.payload, &mut out)
                {
                    debug!(%err, "dropping unencodable reply");
                }
            }
        }
        out.to_vec()
    }

    /// Handle one decoded host message and return the replies in send order.
    ///
    /// Controller → host codes are ignored.
    pub fn handle_message(&mut self, message: &Message) -> Vec<Message> {
        if !msg_type::is_command(message.msg_type) {
            return Vec::new();
        }
        self.handled += 1;
        let seq = message.seq;

        if message.msg_type == msg_type::HELLO {
            return vec![
                Message::new(msg_type::INFO, seq, to_payload(&self.info)),
                ack(seq, Ack::accepted()),
            ];
        }

        let result = match message.msg_type {
            msg_type::SET_MODE => self.set_mode(&message.payload),
            msg_type::DRIVE_TWIST => self.drive_twist(&message.payload),
            msg_type::DRIVE_TANK => self.drive_tank(&message.payload),
            msg_type::SERVO => self.servo(&message.payload),
            msg_type::LED => self.led(&message.payload),
            msg_type::E_STOP => {
                self.emergency_stop();
                Ok(())
            }
            msg_type::CONFIG_SET => self.config_set(&message.payload),
            _ => Err(AckCode::UnknownCommand),
        };

        let reply = match result {
            Ok(()) => Ack::accepted(),
            Err(code) => {
                debug!(
                    msg_type = msg_type::type_name(message.msg_type),
                    seq,
                    %code,
                    "rejecting command"
                );
                Ack::rejected(code)
            }
        };
        vec![ack(seq, reply)]
    }

    /// Build an uncorrelated telemetry frame from the current state.
    pub fn telemetry(&self) -> Message {
        Message::new(msg_type::TELEMETRY, 0, to_payload(&self.state))
    }

    /// Build an uncorrelated fault frame.
    pub fn fault(&self, code: u8, detail: &str) -> Result<Message> {
        #[derive(Serialize)]
        struct Fault<'a> {
            code: u8,
            detail: &'a str,
        }
        let payload = serde_json::to_vec(&Fault { code, detail })?;
        let message = Message::new(msg_type::FAULT, 0, payload);
        message.encode()?;
        Ok(message)
    }

    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    /// Runtime configuration written through CONFIG_SET.
    pub fn config(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.config
    }

    /// Number of host commands handled.
    pub fn handled(&self) -> u64 {
        self.handled
    }

    fn set_mode(&mut self, payload: &[u8]) -> std::result::Result<(), AckCode> {
        let ModePayload { mode } = parse(payload)?;
        let mode = u8::try_from(mode)
            .ok()
            .and_then(Mode::from_code)
            .ok_or(AckCode::InvalidMode)?;
        self.stop_tracks();
        self.state.mode = mode.code();
        self.state.estop = false;
        Ok(())
    }

    fn drive_twist(&mut self, payload: &[u8]) -> std::result::Result<(), AckCode> {
        let TwistPayload { v, omega } = parse(payload)?;
        self.require_manual()?;
        let v = i16::try_from(v).map_err(|_| AckCode::InvalidParameter)?;
        let omega = i16::try_from(omega).map_err(|_| AckCode::InvalidParameter)?;

        // mm/s and mrad/s scaled to PWM, then mixed per track.
        let v_pwm = i32::from(v) / 2;
        let omega_pwm = i32::from(omega) / 10;
        let limit = i32::from(TANK_PWM_LIMIT);
        self.state.left = clamp_pwm(v_pwm - omega_pwm, limit);
        self.state.right = clamp_pwm(v_pwm + omega_pwm, limit);
        Ok(())
    }

    fn drive_tank(&mut self, payload: &[u8]) -> std::result::Result<(), AckCode> {
        let TankPayload { left, right } = parse(payload)?;
        self.require_manual()?;
        let limit = u64::from(TANK_PWM_LIMIT);
        if left.unsigned_abs() > limit || right.unsigned_abs() > limit {
            return Err(AckCode::InvalidParameter);
        }
        self.state.left = i16::try_from(left).map_err(|_| AckCode::InvalidParameter)?;
        self.state.right = i16::try_from(right).map_err(|_| AckCode::InvalidParameter)?;
        Ok(())
    }

    fn servo(&mut self, payload: &[u8]) -> std::result::Result<(), AckCode> {
        let ServoPayload { angle } = parse(payload)?;
        self.state.servo = u8::try_from(angle)
            .ok()
            .filter(|angle| *angle <= SERVO_MAX_ANGLE)
            .ok_or(AckCode::InvalidParameter)?;
        Ok(())
    }

    fn led(&mut self, payload: &[u8]) -> std::result::Result<(), AckCode> {
        let LedPayload { r, g, b, brightness } = parse(payload)?;
        let mut led = [0u8; 4];
        for (slot, value) in led.iter_mut().zip([r, g, b, brightness]) {
            *slot = u8::try_from(value).map_err(|_| AckCode::InvalidParameter)?;
        }
        self.state.led = led;
        Ok(())
    }

    fn config_set(&mut self, payload: &[u8]) -> std::result::Result<(), AckCode> {
        let ConfigPayload { key, value } = parse(payload)?;
        if key.is_empty() {
            return Err(AckCode::InvalidParameter);
        }
        self.config.insert(key, value);
        Ok(())
    }

    fn emergency_stop(&mut self) {
        self.stop_tracks();
        self.state.mode = Mode::Standby.code();
        self.state.estop = true;
    }

    fn stop_tracks(&mut self) {
        self.state.left = 0;
        self.state.right = 0;
    }

    fn require_manual(&self) -> std::result::Result<(), AckCode> {
        if self.state.mode() == Mode::Manual {
            Ok(())
        } else {
            Err(AckCode::WrongMode)
        }
    }
}

fn parse<T: DeserializeOwned>(payload: &[u8]) -> std::result::Result<T, AckCode> {
    serde_json::from_slice(payload).map_err(|_| AckCode::ParseError)
}

fn to_payload<T: Serialize>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).unwrap_or_else(|_| b"{}".to_vec())
}

fn ack(seq: u8, ack: Ack) -> Message {
    Message::new(msg_type::ACK, seq, to_payload(&ack))
}

fn clamp_pwm(value: i32, limit: i32) -> i16 {
    // `limit` never exceeds `i16::MAX`.
    value.clamp(-limit, limit) as i16
}
