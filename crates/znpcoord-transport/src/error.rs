use std::path::PathBuf;

/// Errors that can occur while opening or using the module link.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the serial device node.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to connect to the bridge socket.
    #[error("failed to connect to {path}: {source}")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to apply line settings to the serial device.
    #[error("failed to configure {path}: {source}")]
    Configure {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The requested baud rate has no termios equivalent.
    #[error("unsupported baud rate {0}")]
    UnsupportedBaud(u32),

    /// The link address could not be parsed.
    #[error("invalid link address: {0}")]
    InvalidAddress(String),

    /// An I/O error occurred on the link.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
