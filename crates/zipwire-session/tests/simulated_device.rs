use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use zipwire_session::{AckCode, Command, DeviceSimulator, Mode, Reply, Session, SessionConfig};
use zipwire_transport::{ByteChannel, MockChannel};

fn fast() -> SessionConfig {
    SessionConfig {
        response_timeout: Duration::from_millis(500),
        poll_interval: Duration::from_millis(1),
    }
}

fn simulated() -> (Session<MockChannel>, Arc<Mutex<DeviceSimulator>>) {
    let device = Arc::new(Mutex::new(DeviceSimulator::new()));
    let remote = Arc::clone(&device);
    let channel = MockChannel::with_responder(move |sent| remote.lock().unwrap().handle_bytes(sent));
    (Session::with_config(channel, fast()), device)
}

#[test]
fn manual_drive_sequence() {
    let (mut session, device) = simulated();

    assert!(matches!(
        session.execute(&Command::Hello).unwrap(),
        Reply::Info(_)
    ));
    assert!(session
        .execute(&Command::SetMode(Mode::Manual))
        .unwrap()
        .is_success());
    assert!(session
        .execute(&Command::DriveTank { left: 50, right: 50 })
        .unwrap()
        .is_success());
    assert!(session
        .execute(&Command::Servo { angle: 0 })
        .unwrap()
        .is_success());

    let state = device.lock().unwrap().state().clone();
    assert_eq!(state.mode(), Mode::Manual);
    assert_eq!((state.left, state.right, state.servo), (50, 50, 0));
}

#[test]
fn estop_blocks_driving() {
    let (mut session, _device) = simulated();

    session.execute(&Command::SetMode(Mode::Manual)).unwrap();
    assert!(session.execute(&Command::EStop).unwrap().is_success());

    match session
        .execute(&Command::DriveTwist { v: 100, omega: 0 })
        .unwrap()
    {
        Reply::Rejected(ack) => assert_eq!(ack.code(), Some(AckCode::WrongMode)),
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[test]
fn telemetry_between_commands_is_ignored() {
    let (mut session, device) = simulated();
    let telemetry = device.lock().unwrap().telemetry().encode().unwrap();
    session.channel_mut().push_inbound(&telemetry);
    session.channel_mut().push_inbound(&telemetry);

    assert!(session
        .execute(&Command::Led {
            r: 0,
            g: 255,
            b: 255,
            brightness: 255
        })
        .unwrap()
        .is_success());
    assert_eq!(session.discarded(), 2);
}

#[cfg(unix)]
#[test]
fn session_over_socket_pair() {
    use zipwire_transport::{SocketChannel, TransportError};

    let (host, mut remote) = SocketChannel::pair().unwrap();

    let server = thread::spawn(move || {
        let mut device = DeviceSimulator::new();
        let mut buf = [0u8; 256];
        loop {
            match remote.read_available(&mut buf) {
                Ok(0) => thread::sleep(Duration::from_millis(1)),
                Ok(n) => {
                    let reply = device.handle_bytes(&buf[..n]);
                    remote.write_all(&reply).unwrap();
                }
                Err(TransportError::Closed) => return device.handled(),
                Err(err) => panic!("device side failed: {err}"),
            }
        }
    });

    let mut session = Session::with_config(host, fast());
    assert!(matches!(
        session.execute(&Command::Hello).unwrap(),
        Reply::Info(_)
    ));
    assert!(session
        .execute(&Command::ConfigSet {
            key: "max_pwm".into(),
            value: serde_json::json!(180)
        })
        .unwrap()
        .is_success());
    drop(session);

    assert_eq!(server.join().unwrap(), 2);
}
