use std::fmt::Write as _;
use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use znpcoord_engine::DiscoveredPeer;
use znpcoord_frame::command::{subsystem_name, type_name};
use znpcoord_frame::Frame;

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

/// One frame as shown by `decode`.
#[derive(Debug, Serialize)]
pub struct DecodedFrame {
    pub class: String,
    pub command: String,
    pub command_type: &'static str,
    pub subsystem: &'static str,
    pub route: Option<&'static str>,
    pub payload_size: usize,
    pub payload: String,
    pub event: Option<String>,
    pub error: Option<String>,
    #[serde(skip)]
    raw_payload: Vec<u8>,
}

impl DecodedFrame {
    pub fn new(frame: &Frame, route: Option<&'static str>) -> Self {
        Self {
            class: format!("0x{:02X}", frame.class),
            command: format!("0x{:02X}", frame.command),
            command_type: type_name(frame.class),
            subsystem: subsystem_name(frame.class),
            route,
            payload_size: frame.payload.len(),
            payload: hex(&frame.payload),
            event: None,
            error: None,
            raw_payload: frame.payload.to_vec(),
        }
    }
}

pub fn print_decoded(decoded: &DecodedFrame, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(decoded),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CLASS", "COMMAND", "TYPE", "ROUTE", "SIZE", "EVENT"])
                .add_row(vec![
                    decoded.class.clone(),
                    decoded.command.clone(),
                    format!("{} {}", decoded.command_type, decoded.subsystem),
                    decoded.route.unwrap_or("-").to_string(),
                    decoded.payload_size.to_string(),
                    describe(decoded),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "class={} ({} {}) command={} route={} size={} payload={} {}",
                decoded.class,
                decoded.command_type,
                decoded.subsystem,
                decoded.command,
                decoded.route.unwrap_or("-"),
                decoded.payload_size,
                decoded.payload,
                describe(decoded)
            );
        }
        OutputFormat::Raw => print_raw(&decoded.raw_payload),
    }
}

#[derive(Serialize)]
struct EncodedOutput<'a> {
    frame: &'a str,
    size: usize,
}

pub fn print_encoded(bytes: &[u8], format: OutputFormat) {
    let frame = hex(bytes);
    match format {
        OutputFormat::Json => print_json(&EncodedOutput {
            frame: &frame,
            size: bytes.len(),
        }),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FRAME", "SIZE"])
                .add_row(vec![frame, bytes.len().to_string()]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{frame}"),
        OutputFormat::Raw => print_raw(bytes),
    }
}

#[derive(Serialize)]
struct PeerOutput {
    nwk_addr: String,
    ieee_addr: String,
    endpoints: Vec<u8>,
}

pub fn print_peers(peers: &[DiscoveredPeer], format: OutputFormat) {
    let rows: Vec<PeerOutput> = peers
        .iter()
        .map(|peer| PeerOutput {
            nwk_addr: format!("0x{:04X}", peer.nwk_addr),
            ieee_addr: peer.ieee_addr.to_string(),
            endpoints: peer.endpoints.clone(),
        })
        .collect();

    match format {
        OutputFormat::Json => print_json(&rows),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["NWK", "IEEE", "ENDPOINTS"]);
            for row in &rows {
                table.add_row(vec![row.nwk_addr.clone(), row.ieee_addr.clone(), hex(&row.endpoints)]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            for row in &rows {
                println!(
                    "nwk={} ieee={} endpoints={}",
                    row.nwk_addr,
                    row.ieee_addr,
                    hex(&row.endpoints)
                );
            }
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// Uppercase hex without separators.
pub fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02X}");
    }
    out
}

fn describe(decoded: &DecodedFrame) -> String {
    match (&decoded.event, &decoded.error) {
        (Some(event), _) => event.clone(),
        (None, Some(error)) => format!("error: {error}"),
        (None, None) => "-".to_string(),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}
