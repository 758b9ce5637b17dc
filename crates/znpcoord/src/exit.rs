use std::fmt;
use std::io;

use znpcoord_engine::EngineError;
use znpcoord_frame::FrameError;
use znpcoord_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound
        | io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::BrokenPipe => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Open { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Configure { source, .. }
        | TransportError::Io(source) => io_error(context, source),
        TransportError::InvalidAddress(_) | TransportError::UnsupportedBaud(_) => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::InvalidMarker(_)
        | FrameError::ChecksumMismatch { .. }
        | FrameError::Incomplete { .. }
        | FrameError::PayloadTooLarge { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        FrameError::ConnectionClosed => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
    }
}

pub fn engine_error(context: &str, err: EngineError) -> CliError {
    match err {
        EngineError::TransportRead(err) | EngineError::TransportWrite(err) | EngineError::Frame(err) => {
            frame_error(context, err)
        }
        EngineError::UnknownCommand { .. } | EngineError::ShortPayload { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        EngineError::IllegalEvent { .. } => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}
