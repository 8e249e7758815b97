//! Offline frame tools: build a frame, or pull frames out of a hex dump.

use zipwire_frame::{FrameDecoder, Message};

use crate::cmd::common::{parse_msg_type, resolve_payload};
use crate::cmd::{DecodeArgs, EncodeArgs};
use crate::exit::{frame_error, CliError, CliResult, DATA_INVALID, FAILURE, SUCCESS, USAGE};
use crate::output::{print_frame_bytes, print_message, print_stats, OutputFormat};

pub fn encode(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let code = parse_msg_type(&args.msg_type)?;
    let payload = resolve_payload(args.json.as_deref(), args.data.as_deref())?;

    let frame = Message::new(code, args.seq, payload)
        .encode()
        .map_err(|err| frame_error("encode failed", err))?;

    print_frame_bytes(code, args.seq, &frame, format);
    Ok(SUCCESS)
}

pub fn decode(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    if args.hex.is_empty() {
        return Err(CliError::new(USAGE, "no hex bytes given"));
    }
    let bytes = parse_hex(&args.hex.join(" "))?;

    let mut decoder = FrameDecoder::new();
    let messages = decoder.feed_all(&bytes);
    for message in &messages {
        print_message(message, format);
    }

    if args.stats {
        print_stats(&decoder.stats(), format);
    }

    if messages.is_empty() {
        Ok(FAILURE)
    } else {
        Ok(SUCCESS)
    }
}

/// Parse `AA 55 04`, `aa:55:04`, `0xAA 0x55` or `aa5504` into bytes.
fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let digits: String = input
        .split(|c: char| c.is_whitespace() || c == ':' || c == ',')
        .map(|token| {
            token
                .strip_prefix("0x")
                .or_else(|| token.strip_prefix("0X"))
                .unwrap_or(token)
        })
        .collect();

    if digits.len() % 2 != 0 {
        return Err(CliError::new(DATA_INVALID, "odd number of hex digits"));
    }

    digits
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|text| u8::from_str_radix(text, 16).ok())
                .ok_or_else(|| {
                    CliError::new(
                        DATA_INVALID,
                        format!("invalid hex byte: {}", String::from_utf8_lossy(pair)),
                    )
                })
        })
        .collect()
}
