use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use znpcoord_engine::WriteMode;
use znpcoord_transport::DEFAULT_BAUD_RATE;

use crate::exit::{CliError, CliResult, DATA_INVALID, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod run;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Bring up the module and run as coordinator until interrupted.
    Run(RunArgs),
    /// Decode one frame given as hex.
    Decode(DecodeArgs),
    /// Encode one frame and print it as hex.
    Encode(EncodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Run(args) => run::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Encode(args) => encode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
pub enum WriteModeArg {
    /// Send all configuration writes back to back.
    #[default]
    Batch,
    /// Wait for each write to be acknowledged.
    AwaitAck,
}

impl From<WriteModeArg> for WriteMode {
    fn from(value: WriteModeArg) -> Self {
        match value {
            WriteModeArg::Batch => WriteMode::Batch,
            WriteModeArg::AwaitAck => WriteMode::AwaitAck,
        }
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Serial device path, or `unix:<path>` for a socket bridge.
    #[arg(env = "ZNPCOORD_LINK")]
    pub link: String,
    /// Serial baud rate.
    #[arg(long, env = "ZNPCOORD_BAUD", default_value_t = DEFAULT_BAUD_RATE)]
    pub baud: u32,
    /// How configuration writes are paced.
    #[arg(long, value_enum, env = "ZNPCOORD_WRITE_MODE", default_value = "batch")]
    pub write_mode: WriteModeArg,
    /// Drop unanswered discovery requests after this long (e.g. 30s, 500ms).
    #[arg(long, env = "ZNPCOORD_PENDING_TTL")]
    pub pending_ttl: Option<String>,
    /// Do not sweep associated devices when joining opens.
    #[arg(long, env = "ZNPCOORD_NO_DISCOVER")]
    pub no_discover: bool,
    /// Repeat the association sweep at this interval (e.g. 60s).
    #[arg(long, env = "ZNPCOORD_SWEEP_INTERVAL")]
    pub sweep_interval: Option<String>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Frame bytes as hex, starting with the FE marker.
    pub frame: String,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Class byte (e.g. 0x26).
    #[arg(long, value_parser = parse_byte)]
    pub class: u8,
    /// Command byte (e.g. 0x05).
    #[arg(long, value_parser = parse_byte)]
    pub command: u8,
    /// Payload as hex.
    pub payload: Option<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse a byte given as `0x26` hex or plain decimal.
fn parse_byte(input: &str) -> Result<u8, String> {
    let input = input.trim();
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(digits) => u8::from_str_radix(digits, 16),
        None => input.parse(),
    };
    parsed.map_err(|_| format!("invalid byte value: {input}"))
}

/// Parse hex bytes, ignoring whitespace, `:` separators and a `0x` prefix.
pub fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let trimmed = input.trim();
    let trimmed = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let digits: Vec<u8> = trimmed
        .bytes()
        .filter(|b| !b.is_ascii_whitespace() && *b != b':')
        .collect();

    if digits.len() % 2 != 0 {
        return Err(CliError::new(DATA_INVALID, "hex input has an odd number of digits"));
    }

    digits
        .chunks(2)
        .map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|text| u8::from_str_radix(text, 16).ok())
                .ok_or_else(|| CliError::new(DATA_INVALID, format!("invalid hex input: {input}")))
        })
        .collect()
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
