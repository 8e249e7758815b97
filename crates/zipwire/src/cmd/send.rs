use zipwire_frame::{msg_type, Message, ACK};
use zipwire_session::{Ack, Outcome};

use crate::cmd::common::{open_session, parse_msg_type, resolve_payload, transact_with_retries};
use crate::cmd::SendArgs;
use crate::exit::{frame_error, session_error, CliError, CliResult, FAILURE, SUCCESS, TIMEOUT};
use crate::output::{print_frame_bytes, print_message, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let code = parse_msg_type(&args.msg_type)?;
    let payload = resolve_payload(args.json.as_deref(), args.data.as_deref())?;
    let mut session = open_session(&args.request)?;

    if args.no_wait {
        let seq = session
            .send(code, &payload)
            .map_err(|err| session_error("send failed", err))?;
        let frame = Message::new(code, seq, payload)
            .encode()
            .map_err(|err| frame_error("send failed", err))?;
        print_frame_bytes(code, seq, &frame, format);
        return Ok(SUCCESS);
    }

    match transact_with_retries(&mut session, code, &payload, args.request.retries)? {
        Outcome::Acknowledged(message) => {
            print_message(&message, format);
            Ok(exit_code_for(&message))
        }
        Outcome::TimedOut => Err(CliError::new(
            TIMEOUT,
            format!(
                "{}: no response from controller",
                msg_type::type_name(code)
            ),
        )),
    }
}

fn exit_code_for(response: &Message) -> i32 {
    if response.msg_type == ACK && !Ack::parse(&response.payload).ok {
        FAILURE
    } else {
        SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zipwire_frame::INFO;

    #[test]
    fn negative_ack_fails() {
        let nack = Message::new(ACK, 3, &br#"{"ok":false,"err":1}"#[..]);
        assert_eq!(exit_code_for(&nack), FAILURE);
    }

    #[test]
    fn positive_ack_and_info_succeed() {
        assert_eq!(
            exit_code_for(&Message::new(ACK, 3, &br#"{"ok":true}"#[..])),
            SUCCESS
        );
        assert_eq!(
            exit_code_for(&Message::new(INFO, 3, &br#"{"name":"ZIP"}"#[..])),
            SUCCESS
        );
        // Unparsable ACKs count as accepted.
        assert_eq!(exit_code_for(&Message::new(ACK, 3, &b"ok"[..])), SUCCESS);
    }
}
