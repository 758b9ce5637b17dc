//! ZNP UART framing.
//!
//! Every frame on the wire is:
//! - a 1-byte start marker (`0xFE`)
//! - a 1-byte payload length
//! - a class byte (command type + subsystem) and a command byte
//! - the payload
//! - a 1-byte XOR checksum over everything after the marker
//!
//! Readers resynchronise on the start marker and drop corrupted frames so a
//! noisy line never wedges the stream.

pub mod codec;
pub mod command;
pub mod error;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub mod tokio_codec;

pub use codec::{
    checksum, decode_frame, encode_frame, Frame, FrameConfig, HEADER_SIZE, MAX_FRAME_SIZE,
    MAX_PAYLOAD, START_MARKER,
};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;

#[cfg(feature = "async")]
pub use tokio_codec::ZnpCodec;
