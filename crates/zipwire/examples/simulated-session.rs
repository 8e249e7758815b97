//! Drive an emulated controller through an in-memory channel.
//!
//! Run with:
//!   cargo run --example simulated-session
//!
//! Against a socket instead, start the simulator in one terminal:
//!   cargo run --features cli -- simulate --socket /tmp/zipwire.sock
//! and in another:
//!   cargo run --features cli -- hello --socket /tmp/zipwire.sock

use std::sync::{Arc, Mutex};

use zipwire::session::{Command, DeviceSimulator, Mode, Reply, Session};
use zipwire::transport::MockChannel;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let device = Arc::new(Mutex::new(DeviceSimulator::new()));
    let remote = Arc::clone(&device);
    let channel = MockChannel::with_responder(move |sent| match remote.lock() {
        Ok(mut device) => device.handle_bytes(sent),
        Err(_) => Vec::new(),
    });
    let mut session = Session::new(channel);

    let steps = [
        Command::Hello,
        Command::DriveTank { left: 80, right: 80 },
        Command::SetMode(Mode::Manual),
        Command::DriveTwist { v: 300, omega: -500 },
        Command::Servo { angle: 45 },
        Command::Led {
            r: 255,
            g: 64,
            b: 0,
            brightness: 128,
        },
        Command::ConfigSet {
            key: "max_pwm".into(),
            value: serde_json::json!(200),
        },
        Command::EStop,
    ];

    for command in &steps {
        let reply = session.execute(command)?;
        let seq = session.last_seq().unwrap_or_default();
        match reply {
            Reply::Info(info) => eprintln!("seq {seq}: info {info}"),
            Reply::Accepted(_) => eprintln!("seq {seq}: {command:?} accepted"),
            Reply::Rejected(ack) => eprintln!(
                "seq {seq}: {command:?} rejected ({})",
                ack.code().map(|code| code.description()).unwrap_or("unknown")
            ),
            Reply::TimedOut => eprintln!("seq {seq}: {command:?} timed out"),
        }
    }

    if let Ok(device) = device.lock() {
        eprintln!("final state: {:?}", device.state());
    }
    eprintln!(
        "decoder: {:?}, discarded: {}",
        session.stats(),
        session.discarded()
    );
    Ok(())
}
