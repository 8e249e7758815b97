use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use zipwire_frame::{msg_type::type_name, DecoderStats, Message};
use zipwire_session::Reply;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    msg_type: u8,
    type_name: &'a str,
    seq: u8,
    payload_size: usize,
    payload: String,
    timestamp: String,
}

pub fn print_message(message: &Message, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = MessageOutput {
                msg_type: message.msg_type,
                type_name: type_name(message.msg_type),
                seq: message.seq,
                payload_size: message.payload.len(),
                payload: payload_preview(&message.payload),
                timestamp: now_unix_seconds(),
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TYPE", "SEQ", "SIZE", "PAYLOAD"])
                .add_row(vec![
                    format!("{} (0x{:02X})", type_name(message.msg_type), message.msg_type),
                    message.seq.to_string(),
                    message.payload.len().to_string(),
                    payload_preview(&message.payload),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "type=0x{:02X} ({}) seq={} size={} payload={}",
                message.msg_type,
                type_name(message.msg_type),
                message.seq,
                message.payload.len(),
                payload_preview(&message.payload)
            );
        }
        OutputFormat::Raw => {
            let mut line = message.payload.to_vec();
            line.push(b'\n');
            print_raw(&line);
        }
    }
}

#[derive(Serialize)]
struct ReplyOutput<'a> {
    command: &'a str,
    seq: Option<u8>,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    err: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    info: Option<&'a serde_json::Value>,
}

pub fn print_reply(command: &str, seq: Option<u8>, reply: &Reply, format: OutputFormat) {
    let (status, err, message, info) = match reply {
        Reply::Accepted(_) => ("accepted", None, None, None),
        Reply::Info(info) => ("info", None, None, Some(info)),
        Reply::Rejected(ack) => (
            "rejected",
            Some(ack.err),
            Some(rejection_text(ack)),
            None,
        ),
        Reply::TimedOut => ("timeout", None, None, None),
    };

    match format {
        OutputFormat::Json => print_json(&ReplyOutput {
            command,
            seq,
            status,
            err,
            message,
            info,
        }),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["COMMAND", "SEQ", "STATUS", "DETAIL"])
                .add_row(vec![
                    command.to_string(),
                    seq.map(|s| s.to_string()).unwrap_or_else(|| "-".into()),
                    status.to_string(),
                    detail(message.as_deref(), info),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{command} seq={} status={status} {}",
                seq.map(|s| s.to_string()).unwrap_or_else(|| "-".into()),
                detail(message.as_deref(), info)
            );
        }
        OutputFormat::Raw => {
            println!("{status}");
        }
    }
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    msg_type: u8,
    type_name: &'a str,
    seq: u8,
    size: usize,
    frame: String,
}

/// Print an encoded frame.
pub fn print_frame_bytes(msg_type: u8, seq: u8, frame: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&FrameOutput {
            msg_type,
            type_name: type_name(msg_type),
            seq,
            size: frame.len(),
            frame: hex(frame, ""),
        }),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("{}", hex(frame, " ").to_uppercase());
        }
        OutputFormat::Raw => print_raw(frame),
    }
}

#[derive(Serialize)]
struct StatsOutput {
    frames: u64,
    crc_failures: u64,
    length_rejects: u64,
    sync_misses: u64,
    overflow_resets: u64,
}

pub fn print_stats(stats: &DecoderStats, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&StatsOutput {
            frames: stats.frames,
            crc_failures: stats.crc_failures,
            length_rejects: stats.length_rejects,
            sync_misses: stats.sync_misses,
            overflow_resets: stats.overflow_resets,
        }),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_header(vec!["FRAMES", "CRC FAIL", "LEN REJECT", "SYNC MISS", "OVERFLOW"])
                .add_row(vec![
                    stats.frames.to_string(),
                    stats.crc_failures.to_string(),
                    stats.length_rejects.to_string(),
                    stats.sync_misses.to_string(),
                    stats.overflow_resets.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "frames={} crc_failures={} length_rejects={} sync_misses={} overflow_resets={}",
                stats.frames,
                stats.crc_failures,
                stats.length_rejects,
                stats.sync_misses,
                stats.overflow_resets
            );
        }
        OutputFormat::Raw => {}
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// Lowercase hex with `sep` between bytes.
pub fn hex(bytes: &[u8], sep: &str) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(sep)
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn rejection_text(ack: &zipwire_session::Ack) -> String {
    if !ack.message.is_empty() {
        return ack.message.clone();
    }
    ack.code()
        .map(|code| code.description().to_string())
        .unwrap_or_else(|| format!("error code {}", ack.err))
}

fn detail(message: Option<&str>, info: Option<&serde_json::Value>) -> String {
    match (message, info) {
        (Some(message), _) => message.to_string(),
        (None, Some(info)) => info.to_string(),
        (None, None) => String::new(),
    }
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
