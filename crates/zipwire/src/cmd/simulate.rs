use crate::cmd::SimulateArgs;
use crate::exit::CliResult;

#[cfg(unix)]
pub fn run(args: SimulateArgs) -> CliResult<i32> {
    unix::run(args)
}

#[cfg(not(unix))]
pub fn run(_args: SimulateArgs) -> CliResult<i32> {
    Err(crate::exit::CliError::new(
        crate::exit::USAGE,
        "simulate requires Unix domain sockets",
    ))
}

#[cfg(unix)]
mod unix {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use tracing::{debug, info};
    use zipwire_frame::{deadline_after, msg_type, FrameError, FramedChannel};
    use zipwire_session::DeviceSimulator;
    use zipwire_transport::{SocketChannel, SocketListener, TransportError};

    use crate::cmd::common::{install_ctrlc_handler, parse_duration};
    use crate::cmd::SimulateArgs;
    use crate::exit::{frame_error, transport_error, CliResult, SUCCESS};

    const POLL_INTERVAL: Duration = Duration::from_millis(2);
    const ACCEPT_INTERVAL: Duration = Duration::from_millis(20);
    const WAKE_INTERVAL: Duration = Duration::from_millis(100);

    pub fn run(args: SimulateArgs) -> CliResult<i32> {
        let telemetry = args.telemetry.as_deref().map(parse_duration).transpose()?;
        let listener =
            SocketListener::bind(&args.socket).map_err(|err| transport_error("bind failed", err))?;

        let running = Arc::new(AtomicBool::new(true));
        install_ctrlc_handler(running.clone())?;

        // Controller state survives host reconnects, like the real board.
        let mut device = DeviceSimulator::new();

        while running.load(Ordering::SeqCst) {
            let channel = match listener.try_accept() {
                Ok(Some(channel)) => channel,
                Ok(None) => {
                    std::thread::sleep(ACCEPT_INTERVAL);
                    continue;
                }
                Err(err) => return Err(transport_error("accept failed", err)),
            };

            info!(path = ?listener.path(), "host connected");
            serve(channel, &mut device, telemetry, &running)?;
            info!(handled = device.handled(), "host disconnected");

            if args.once {
                break;
            }
        }

        Ok(SUCCESS)
    }

    /// Answer one host until it disconnects or `running` is cleared.
    fn serve(
        channel: SocketChannel,
        device: &mut DeviceSimulator,
        telemetry: Option<Duration>,
        running: &AtomicBool,
    ) -> CliResult<()> {
        let mut framed = FramedChannel::new(channel);
        let mut next_telemetry = telemetry.map(deadline_after);

        while running.load(Ordering::SeqCst) {
            let mut wake = Instant::now() + WAKE_INTERVAL;
            if let Some(at) = next_telemetry {
                wake = wake.min(at);
            }

            match framed.recv_message(wake, POLL_INTERVAL) {
                Ok(Some(message)) => {
                    debug!(
                        msg_type = msg_type::type_name(message.msg_type),
                        seq = message.seq,
                        "host frame"
                    );
                    for reply in device.handle_message(&message) {
                        if !write(&mut framed, &reply)? {
                            return Ok(());
                        }
                    }
                }
                Ok(None) => {}
                Err(FrameError::Transport(TransportError::Closed)) => return Ok(()),
                Err(FrameError::Transport(TransportError::Io(err)))
                    if err.kind() == std::io::ErrorKind::ConnectionReset =>
                {
                    return Ok(())
                }
                Err(err) => return Err(frame_error("receive failed", err)),
            }

            if let (Some(at), Some(interval)) = (next_telemetry, telemetry) {
                if Instant::now() >= at {
                    if !write(&mut framed, &device.telemetry())? {
                        return Ok(());
                    }
                    next_telemetry = Some(
                        at.checked_add(interval)
                            .unwrap_or_else(|| deadline_after(interval)),
                    );
                }
            }
        }

        Ok(())
    }

    /// Returns `false` once the host has gone away.
    fn write(
        framed: &mut FramedChannel<SocketChannel>,
        message: &zipwire_frame::Message,
    ) -> CliResult<bool> {
        match framed.write_message(message) {
            Ok(()) => Ok(true),
            Err(FrameError::Transport(TransportError::Closed)) => Ok(false),
            Err(FrameError::Transport(TransportError::Io(err)))
                if err.kind() == std::io::ErrorKind::ConnectionReset =>
            {
                Ok(false)
            }
            Err(err) => Err(frame_error("send failed", err)),
        }
    }
}
