mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    name = "zipwire",
    version,
    about = "Talk to a ZIP robot controller over its framed serial protocol"
)]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::DriveMotion;

    #[test]
    fn parses_send_subcommand() {
        let cli = Cli::try_parse_from([
            "zipwire",
            "send",
            "--port",
            "/dev/ttyUSB0",
            "--type",
            "servo",
            "--json",
            "{\"angle\":90}",
        ])
        .expect("send args should parse");

        assert!(matches!(cli.command, Command::Send(_)));
    }

    #[test]
    fn rejects_conflicting_payload_args() {
        let err = Cli::try_parse_from([
            "zipwire",
            "send",
            "--socket",
            "/tmp/zip.sock",
            "--type",
            "led",
            "--json",
            "{\"r\":1}",
            "--data",
            "hello",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn rejects_port_and_socket_together() {
        let err = Cli::try_parse_from([
            "zipwire",
            "hello",
            "--port",
            "/dev/ttyUSB0",
            "--socket",
            "/tmp/zip.sock",
        ])
        .expect_err("port and socket should conflict");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn requires_a_target() {
        let err = Cli::try_parse_from(["zipwire", "estop"]).expect_err("target is required");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn parses_negative_tank_speeds() {
        let cli = Cli::try_parse_from([
            "zipwire",
            "drive",
            "tank",
            "-50",
            "50",
            "--socket",
            "/tmp/zip.sock",
        ])
        .expect("negative speeds should parse");

        let Command::Drive(args) = cli.command else {
            panic!("expected drive");
        };
        let DriveMotion::Tank(tank) = args.motion else {
            panic!("expected tank");
        };
        assert_eq!((tank.left, tank.right), (-50, 50));
    }

    #[test]
    fn rejects_out_of_range_servo_angle() {
        let err = Cli::try_parse_from(["zipwire", "servo", "181", "--socket", "/tmp/zip.sock"])
            .expect_err("181 degrees should be rejected");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn parses_mode_names() {
        let cli = Cli::try_parse_from(["zipwire", "mode", "line-follow", "--socket", "/tmp/z"])
            .expect("mode should parse");
        let Command::Mode(args) = cli.command else {
            panic!("expected mode");
        };
        assert_eq!(args.mode, zipwire_session::Mode::LineFollow);
    }

    #[test]
    fn parses_encode_without_target() {
        let cli = Cli::try_parse_from(["zipwire", "encode", "--type", "hello", "--seq", "1"])
            .expect("encode needs no link");
        assert!(matches!(cli.command, Command::Encode(_)));
    }
}
