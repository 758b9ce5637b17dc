/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The buffer does not begin with the start marker (framing error).
    #[error("invalid start marker 0x{0:02X} (expected 0xFE)")]
    InvalidMarker(u8),

    /// The trailing checksum does not match the frame contents (integrity error).
    #[error("checksum mismatch (computed 0x{expected:02X}, frame carries 0x{actual:02X})")]
    ChecksumMismatch { expected: u8, actual: u8 },

    /// The buffer ends before the frame its length byte announces.
    #[error("incomplete frame ({available} of {needed} bytes)")]
    Incomplete { needed: usize, available: usize },

    /// The payload exceeds the protocol or configured maximum.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The link was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

impl FrameError {
    /// Whether the stream is still usable after this error.
    ///
    /// Corrupted or malformed frames are dropped by the reader; I/O failures
    /// and a closed link are not recoverable.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidMarker(_)
                | Self::ChecksumMismatch { .. }
                | Self::Incomplete { .. }
                | Self::PayloadTooLarge { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
