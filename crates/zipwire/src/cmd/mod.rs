use clap::{Args, Subcommand};
use std::path::PathBuf;

use zipwire_session::Mode;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod common;
pub mod control;
pub mod encode;
pub mod monitor;
pub mod send;
pub mod simulate;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send one raw frame and print the correlated response.
    Send(SendArgs),
    /// Ask the controller to identify itself.
    Hello(HelloArgs),
    /// Switch the controller's operating mode.
    Mode(ModeArgs),
    /// Drive the tracks (manual mode only).
    Drive(DriveArgs),
    /// Point the pan servo.
    Servo(ServoArgs),
    /// Set the status LED colour.
    Led(LedArgs),
    /// Emergency stop.
    Estop(EstopArgs),
    /// Write a runtime configuration key.
    Config(ConfigArgs),
    /// Print every frame the controller sends.
    Monitor(MonitorArgs),
    /// Encode a frame and print its bytes.
    Encode(EncodeArgs),
    /// Decode frames from a hex dump.
    Decode(DecodeArgs),
    /// Serve an emulated controller on a Unix socket.
    Simulate(SimulateArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args, format),
        Command::Hello(args) => control::hello(args, format),
        Command::Mode(args) => control::mode(args, format),
        Command::Drive(args) => control::drive(args, format),
        Command::Servo(args) => control::servo(args, format),
        Command::Led(args) => control::led(args, format),
        Command::Estop(args) => control::estop(args, format),
        Command::Config(args) => control::config(args, format),
        Command::Monitor(args) => monitor::run(args, format),
        Command::Encode(args) => encode::encode(args, format),
        Command::Decode(args) => encode::decode(args, format),
        Command::Simulate(args) => simulate::run(args),
        Command::Version(args) => version::run(args),
    }
}

/// Where the controller is reachable.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Serial device (e.g. /dev/ttyUSB0, COM3).
    #[arg(long, conflicts_with = "socket", required_unless_present = "socket")]
    pub port: Option<String>,
    /// Unix socket bridged to the controller.
    #[arg(long)]
    pub socket: Option<PathBuf>,
    /// Serial baud rate.
    #[arg(long, env = "ZIPWIRE_BAUD", default_value_t = 115_200)]
    pub baud: u32,
}

/// Target plus transaction policy.
#[derive(Args, Debug, Clone)]
pub struct RequestArgs {
    #[command(flatten)]
    pub target: TargetArgs,
    /// Time to wait for each response (e.g. 2s, 500ms).
    #[arg(long, default_value = "2s")]
    pub timeout: String,
    /// Resend up to N more times when no response arrives.
    #[arg(long, default_value_t = 0)]
    pub retries: u32,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub request: RequestArgs,
    /// Message type: a name (servo), decimal (5) or hex (0x05).
    #[arg(long = "type", short = 't')]
    pub msg_type: String,
    /// JSON payload. Default: {}.
    #[arg(long, conflicts_with = "data")]
    pub json: Option<String>,
    /// Raw string payload.
    #[arg(long, conflicts_with = "json")]
    pub data: Option<String>,
    /// Transmit without waiting for a response.
    #[arg(long)]
    pub no_wait: bool,
}

#[derive(Args, Debug)]
pub struct HelloArgs {
    #[command(flatten)]
    pub request: RequestArgs,
}

#[derive(Args, Debug)]
pub struct ModeArgs {
    /// standby, manual, line-follow, obstacle-avoid, follow, or 0-4.
    #[arg(value_parser = common::parse_mode)]
    pub mode: Mode,
    #[command(flatten)]
    pub request: RequestArgs,
}

#[derive(Args, Debug)]
pub struct DriveArgs {
    #[command(subcommand)]
    pub motion: DriveMotion,
}

#[derive(Subcommand, Debug)]
pub enum DriveMotion {
    /// Set each track's PWM directly.
    Tank(TankArgs),
    /// Drive by linear velocity and yaw rate.
    Twist(TwistArgs),
}

#[derive(Args, Debug)]
pub struct TankArgs {
    /// Left track PWM (-255..=255).
    #[arg(allow_negative_numbers = true, value_parser = clap::value_parser!(i16).range(-255..=255))]
    pub left: i16,
    /// Right track PWM (-255..=255).
    #[arg(allow_negative_numbers = true, value_parser = clap::value_parser!(i16).range(-255..=255))]
    pub right: i16,
    #[command(flatten)]
    pub request: RequestArgs,
}

#[derive(Args, Debug)]
pub struct TwistArgs {
    /// Linear velocity in mm/s.
    #[arg(allow_negative_numbers = true)]
    pub v: i16,
    /// Yaw rate in mrad/s.
    #[arg(allow_negative_numbers = true)]
    pub omega: i16,
    #[command(flatten)]
    pub request: RequestArgs,
}

#[derive(Args, Debug)]
pub struct ServoArgs {
    /// Angle in degrees (0..=180).
    #[arg(value_parser = clap::value_parser!(u8).range(0..=180))]
    pub angle: u8,
    #[command(flatten)]
    pub request: RequestArgs,
}

#[derive(Args, Debug)]
pub struct LedArgs {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    #[arg(long, default_value_t = 255)]
    pub brightness: u8,
    #[command(flatten)]
    pub request: RequestArgs,
}

#[derive(Args, Debug)]
pub struct EstopArgs {
    #[command(flatten)]
    pub request: RequestArgs,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Configuration key.
    pub key: String,
    /// Value; parsed as JSON when possible, otherwise sent as a string.
    pub value: String,
    #[command(flatten)]
    pub request: RequestArgs,
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    #[command(flatten)]
    pub target: TargetArgs,
    /// Exit after printing N frames.
    #[arg(long)]
    pub count: Option<usize>,
    /// Exit after this long (e.g. 10s, 500ms).
    #[arg(long)]
    pub duration: Option<String>,
    /// Print decoder counters on exit.
    #[arg(long)]
    pub stats: bool,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Message type: a name (servo), decimal (5) or hex (0x05).
    #[arg(long = "type", short = 't')]
    pub msg_type: String,
    /// Sequence number.
    #[arg(long, default_value_t = 1)]
    pub seq: u8,
    /// JSON payload. Default: {}.
    #[arg(long, conflicts_with = "data")]
    pub json: Option<String>,
    /// Raw string payload.
    #[arg(long, conflicts_with = "json")]
    pub data: Option<String>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Hex bytes; spaces, colons and a leading 0x are ignored.
    pub hex: Vec<String>,
    /// Print decoder counters after the messages.
    #[arg(long)]
    pub stats: bool,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Socket path to bind.
    #[arg(long)]
    pub socket: PathBuf,
    /// Push TELEMETRY at this interval (e.g. 1s, 250ms).
    #[arg(long)]
    pub telemetry: Option<String>,
    /// Exit after the first host disconnects.
    #[arg(long)]
    pub once: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
