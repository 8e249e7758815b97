use zipwire_session::Command as DeviceCommand;

use crate::cmd::common::run_command;
use crate::cmd::{
    ConfigArgs, DriveArgs, DriveMotion, EstopArgs, HelloArgs, LedArgs, ModeArgs, ServoArgs,
};
use crate::exit::CliResult;
use crate::output::OutputFormat;

pub fn hello(args: HelloArgs, format: OutputFormat) -> CliResult<i32> {
    run_command("hello", DeviceCommand::Hello, &args.request, format)
}

pub fn mode(args: ModeArgs, format: OutputFormat) -> CliResult<i32> {
    run_command("mode", DeviceCommand::SetMode(args.mode), &args.request, format)
}

pub fn drive(args: DriveArgs, format: OutputFormat) -> CliResult<i32> {
    match args.motion {
        DriveMotion::Tank(tank) => run_command(
            "drive",
            DeviceCommand::DriveTank {
                left: tank.left,
                right: tank.right,
            },
            &tank.request,
            format,
        ),
        DriveMotion::Twist(twist) => run_command(
            "drive",
            DeviceCommand::DriveTwist {
                v: twist.v,
                omega: twist.omega,
            },
            &twist.request,
            format,
        ),
    }
}

pub fn servo(args: ServoArgs, format: OutputFormat) -> CliResult<i32> {
    run_command(
        "servo",
        DeviceCommand::Servo { angle: args.angle },
        &args.request,
        format,
    )
}

pub fn led(args: LedArgs, format: OutputFormat) -> CliResult<i32> {
    run_command(
        "led",
        DeviceCommand::Led {
            r: args.r,
            g: args.g,
            b: args.b,
            brightness: args.brightness,
        },
        &args.request,
        format,
    )
}

pub fn estop(args: EstopArgs, format: OutputFormat) -> CliResult<i32> {
    run_command("estop", DeviceCommand::EStop, &args.request, format)
}

pub fn config(args: ConfigArgs, format: OutputFormat) -> CliResult<i32> {
    let command = DeviceCommand::ConfigSet {
        key: args.key,
        value: config_value(&args.value),
    };
    run_command("config", command, &args.request, format)
}

/// `180` and `true` go out as JSON; anything unparsable is sent as a string.
fn config_value(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}
