use znpcoord_frame::FrameError;

use crate::bringup::BringUpState;

/// Errors that can occur in the coordinator engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A well-formed frame with no dispatch entry.
    #[error("unknown command [class: 0x{class:02X}, command: 0x{command:02X}]")]
    UnknownCommand {
        class: u8,
        command: u8,
        payload: bytes::Bytes,
    },

    /// A routed frame whose payload is shorter than its handler needs.
    #[error("{name}: payload too short ({actual} bytes, need {expected})")]
    ShortPayload {
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A lifecycle event that the current bring-up state does not accept.
    #[error("{event} not accepted in state {state:?}")]
    IllegalEvent {
        state: BringUpState,
        event: &'static str,
    },

    /// Frame-level error outside the reader loop.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The blocking read on the link failed.
    #[error("transport read failed: {0}")]
    TransportRead(FrameError),

    /// Writing a request to the link failed.
    #[error("transport write failed: {0}")]
    TransportWrite(FrameError),
}

impl EngineError {
    /// Whether this error ends the reader loop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::TransportRead(_) | Self::TransportWrite(_))
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
