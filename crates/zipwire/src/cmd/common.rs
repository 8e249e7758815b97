//! Helpers shared by the controller-facing commands.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;
use zipwire_frame::msg_type::type_name;
use zipwire_session::{Command as DeviceCommand, Mode, Outcome, Reply, Session, SessionConfig};
use zipwire_transport::{ByteChannel, SerialChannel, SerialConfig};

use crate::cmd::{RequestArgs, TargetArgs};
use crate::exit::{
    session_error, transport_error, CliError, CliResult, FAILURE, INTERNAL, SUCCESS, TIMEOUT, USAGE,
};
use crate::output::{print_reply, OutputFormat};

pub type BoxedChannel = Box<dyn ByteChannel + Send>;

/// Open the link named by `--port` or `--socket`.
pub fn open_channel(target: &TargetArgs) -> CliResult<BoxedChannel> {
    if let Some(path) = &target.socket {
        return open_socket(path);
    }
    let Some(port) = &target.port else {
        return Err(CliError::new(USAGE, "either --port or --socket is required"));
    };
    let config = SerialConfig {
        baud_rate: target.baud,
        ..SerialConfig::default()
    };
    let channel =
        SerialChannel::open(port, &config).map_err(|err| transport_error("open failed", err))?;
    Ok(Box::new(channel))
}

#[cfg(unix)]
fn open_socket(path: &std::path::Path) -> CliResult<BoxedChannel> {
    let channel = zipwire_transport::SocketChannel::connect(path)
        .map_err(|err| transport_error("connect failed", err))?;
    Ok(Box::new(channel))
}

#[cfg(not(unix))]
fn open_socket(_path: &std::path::Path) -> CliResult<BoxedChannel> {
    Err(CliError::new(
        USAGE,
        "--socket requires Unix domain sockets; use --port on this platform",
    ))
}

/// Open a session with the request's response timeout.
pub fn open_session(request: &RequestArgs) -> CliResult<Session<BoxedChannel>> {
    let config = SessionConfig {
        response_timeout: parse_duration(&request.timeout)?,
        ..SessionConfig::default()
    };
    let channel = open_channel(&request.target)?;
    Ok(Session::with_config(channel, config))
}

/// Send one frame, resending on timeout up to `retries` more times.
///
/// Each attempt uses a fresh sequence number.
pub fn transact_with_retries<C: ByteChannel>(
    session: &mut Session<C>,
    code: u8,
    payload: &[u8],
    retries: u32,
) -> CliResult<Outcome> {
    for attempt in 0..=retries {
        let outcome = session
            .transact(code, payload)
            .map_err(|err| session_error("transaction failed", err))?;
        if let Outcome::Acknowledged(_) = outcome {
            return Ok(outcome);
        }
        warn!(
            msg_type = type_name(code),
            seq = ?session.last_seq(),
            attempt = attempt + 1,
            "no response before timeout"
        );
    }
    Ok(Outcome::TimedOut)
}

/// Execute a typed command with [`transact_with_retries`].
pub fn execute_with_retries<C: ByteChannel>(
    session: &mut Session<C>,
    command: &DeviceCommand,
    retries: u32,
) -> CliResult<Reply> {
    let payload = command
        .payload()
        .map_err(|err| session_error("command failed", err))?;
    let reply = match transact_with_retries(session, command.msg_type(), &payload, retries)? {
        Outcome::Acknowledged(message) => Reply::from_response(&message),
        Outcome::TimedOut => Reply::TimedOut,
    };
    Ok(reply)
}

/// Open a session, run one typed command and report the reply.
pub fn run_command(
    name: &str,
    command: DeviceCommand,
    request: &RequestArgs,
    format: OutputFormat,
) -> CliResult<i32> {
    command
        .validate()
        .map_err(|err| session_error(name, err))?;
    let mut session = open_session(request)?;
    let reply = execute_with_retries(&mut session, &command, request.retries)?;
    finish(name, session.last_seq(), &reply, format)
}

/// Print the reply and map it onto an exit code.
pub fn finish(name: &str, seq: Option<u8>, reply: &Reply, format: OutputFormat) -> CliResult<i32> {
    print_reply(name, seq, reply, format);
    match reply {
        Reply::Accepted(_) | Reply::Info(_) => Ok(SUCCESS),
        Reply::Rejected(_) => Ok(FAILURE),
        Reply::TimedOut => Err(CliError::new(
            TIMEOUT,
            format!("{name}: no response from controller"),
        )),
    }
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

/// Parse a message type given as a name, decimal or `0x` hex.
pub fn parse_msg_type(input: &str) -> CliResult<u8> {
    let input = input.trim();
    let parsed = if let Some(hex) = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        u8::from_str_radix(hex, 16).ok()
    } else if input.chars().all(|c| c.is_ascii_digit()) {
        input.parse().ok()
    } else {
        let name = input.to_ascii_uppercase().replace('-', "_");
        (0..=u8::MAX).find(|code| type_name(*code) == name && name != "UNKNOWN")
    };
    parsed.ok_or_else(|| CliError::new(USAGE, format!("unknown message type: {input}")))
}

/// Payload from `--json` (validated) or `--data`; `{}` when neither is given.
pub fn resolve_payload(json: Option<&str>, data: Option<&str>) -> CliResult<Vec<u8>> {
    if let Some(json) = json {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|err| CliError::new(USAGE, format!("--json is not valid JSON: {err}")))?;
        // Compact form keeps frames small.
        return serde_json::to_vec(&value)
            .map_err(|err| CliError::new(USAGE, format!("--json could not be encoded: {err}")));
    }
    if let Some(data) = data {
        return Ok(data.as_bytes().to_vec());
    }
    Ok(b"{}".to_vec())
}

/// Clear `running` on Ctrl-C.
pub fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

pub fn parse_mode(input: &str) -> Result<Mode, String> {
    input.parse::<Mode>().map_err(|err| err.to_string())
}
