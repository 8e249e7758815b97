use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::info;
use zipwire_frame::{deadline_after, FrameError, FramedChannel};
use zipwire_transport::TransportError;

use crate::cmd::common::{install_ctrlc_handler, open_channel, parse_duration};
use crate::cmd::MonitorArgs;
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_message, print_stats, OutputFormat};

const POLL_INTERVAL: Duration = Duration::from_millis(5);
/// Upper bound on how long one wait runs before the stop flag is rechecked.
const WAKE_INTERVAL: Duration = Duration::from_millis(100);

pub fn run(args: MonitorArgs, format: OutputFormat) -> CliResult<i32> {
    let stop_at = args
        .duration
        .as_deref()
        .map(parse_duration)
        .transpose()?
        .map(deadline_after);

    let mut framed = FramedChannel::new(open_channel(&args.target)?);

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0usize;

    while running.load(Ordering::SeqCst) {
        let mut wake = Instant::now() + WAKE_INTERVAL;
        if let Some(stop_at) = stop_at {
            if Instant::now() >= stop_at {
                break;
            }
            wake = wake.min(stop_at);
        }

        let message = match framed.recv_message(wake, POLL_INTERVAL) {
            Ok(Some(message)) => message,
            Ok(None) => continue,
            Err(FrameError::Transport(TransportError::Closed)) => {
                info!("controller link closed");
                break;
            }
            Err(err) => return Err(frame_error("receive failed", err)),
        };

        print_message(&message, format);
        printed = printed.saturating_add(1);

        if let Some(count) = args.count {
            if printed >= count {
                break;
            }
        }
    }

    if args.stats {
        print_stats(&framed.stats(), format);
    }

    Ok(SUCCESS)
}
