//! Serial port channel.
//!
//! The controller enumerates as a USB virtual COM port (CH340 on the UNO
//! shield) and speaks 8N1 without flow control, so only the baud rate and
//! the driver-level read timeout are configurable.

use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use serialport::SerialPort;
use tracing::info;

use crate::error::{Result, TransportError};
use crate::traits::ByteChannel;

/// Serial port configuration.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Baud rate. Default: 115200.
    pub baud_rate: u32,
    /// Driver read timeout; only hit when the port under-reports pending bytes.
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            timeout: Duration::from_millis(10),
        }
    }
}

/// A [`ByteChannel`] over a serial device such as `/dev/ttyUSB0` or `COM3`.
pub struct SerialChannel {
    port: Box<dyn SerialPort>,
    path: String,
}

impl SerialChannel {
    /// Open `path` with the given configuration.
    pub fn open(path: &str, config: &SerialConfig) -> Result<Self> {
        let port = serialport::new(path, config.baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None)
            .flow_control(serialport::FlowControl::None)
            .timeout(config.timeout)
            .open()
            .map_err(|source| TransportError::Open {
                path: path.to_string(),
                source: source.into(),
            })?;

        info!(path, baud = config.baud_rate, "opened serial port");

        Ok(Self {
            port,
            path: path.to_string(),
        })
    }

    /// Device path this channel was opened on.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl ByteChannel for SerialChannel {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.port.write_all(bytes)?;
        self.port.flush()?;
        Ok(())
    }

    fn bytes_available(&mut self) -> Result<usize> {
        let pending = self
            .port
            .bytes_to_read()
            .map_err(|err| TransportError::Io(err.into()))?;
        Ok(pending as usize)
    }

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
        let pending = self.bytes_available()?.min(buf.len());
        if pending == 0 {
            return Ok(0);
        }
        match self.port.read(&mut buf[..pending]) {
            Ok(n) => Ok(n),
            Err(err) if err.kind() == ErrorKind::TimedOut => Ok(0),
            Err(err) if err.kind() == ErrorKind::Interrupted => Ok(0),
            Err(err) => Err(TransportError::Io(err)),
        }
    }
}

impl std::fmt::Debug for SerialChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialChannel")
            .field("path", &self.path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_controller() {
        let config = SerialConfig::default();
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.timeout, Duration::from_millis(10));
    }

    #[test]
    fn open_missing_device_reports_path() {
        let err = SerialChannel::open("/dev/zipwire-does-not-exist", &SerialConfig::default())
            .unwrap_err();
        match err {
            TransportError::Open { path, .. } => assert_eq!(path, "/dev/zipwire-does-not-exist"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
