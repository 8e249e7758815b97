//! Message type codes.
//!
//! Codes `0x01..=0x7F` are host → controller commands.
//! Codes `0x80..=0xFF` are controller → host messages.

/// Request device identity.
pub const HELLO: u8 = 0x01;
/// Switch operating mode.
pub const SET_MODE: u8 = 0x02;
/// Drive by linear and angular velocity.
pub const DRIVE_TWIST: u8 = 0x03;
/// Drive each track directly.
pub const DRIVE_TANK: u8 = 0x04;
/// Position the pan servo.
pub const SERVO: u8 = 0x05;
/// Set the status LED.
pub const LED: u8 = 0x06;
/// Emergency stop.
pub const E_STOP: u8 = 0x07;
/// Write a runtime configuration key.
pub const CONFIG_SET: u8 = 0x08;

/// Device identity, sent in reply to HELLO.
pub const INFO: u8 = 0x81;
/// Command acknowledgement, correlated by sequence.
pub const ACK: u8 = 0x82;
/// Periodic status push.
pub const TELEMETRY: u8 = 0x83;
/// Asynchronous fault notification.
pub const FAULT: u8 = 0x84;

/// Returns a human-readable name for a message type.
pub fn type_name(msg_type: u8) -> &'static str {
    match msg_type {
        HELLO => "HELLO",
        SET_MODE => "SET_MODE",
        DRIVE_TWIST => "DRIVE_TWIST",
        DRIVE_TANK => "DRIVE_TANK",
        SERVO => "SERVO",
        LED => "LED",
        E_STOP => "E_STOP",
        CONFIG_SET => "CONFIG_SET",
        INFO => "INFO",
        ACK => "ACK",
        TELEMETRY => "TELEMETRY",
        FAULT => "FAULT",
        _ => "UNKNOWN",
    }
}

/// Returns true for controller messages that answer a specific command.
pub fn is_response(msg_type: u8) -> bool {
    matches!(msg_type, INFO | ACK)
}

/// Returns true for controller messages not tied to any command.
pub fn is_unsolicited(msg_type: u8) -> bool {
    matches!(msg_type, TELEMETRY | FAULT)
}

/// Returns true if the code is in the host → controller range.
pub fn is_command(msg_type: u8) -> bool {
    (0x01..0x80).contains(&msg_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names() {
        assert_eq!(type_name(HELLO), "HELLO");
        assert_eq!(type_name(ACK), "ACK");
        assert_eq!(type_name(0x42), "UNKNOWN");
    }

    #[test]
    fn classification() {
        assert!(is_response(INFO));
        assert!(is_response(ACK));
        assert!(!is_response(TELEMETRY));
        assert!(is_unsolicited(FAULT));
        assert!(is_command(CONFIG_SET));
        assert!(!is_command(0x00));
        assert!(!is_command(INFO));
    }
}
