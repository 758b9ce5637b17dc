use std::io::{self, ErrorKind, Write};

use bytes::BytesMut;
use tracing::debug;

use crate::codec::{encode_frame, Frame, FrameConfig, MAX_FRAME_SIZE};
use crate::error::{FrameError, Result};

/// Writes complete frames to a blocking `Write` stream.
///
/// Each frame is encoded into a reused buffer and handed to the stream in
/// one `write_all`, then flushed so the module sees it immediately.
pub struct FrameWriter<T> {
    inner: T,
    scratch: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            scratch: BytesMut::with_capacity(MAX_FRAME_SIZE),
            config,
        }
    }

    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.send(frame.class, frame.command, frame.payload.as_ref())
    }

    /// Encode and send one command.
    pub fn send(&mut self, class: u8, command: u8, payload: &[u8]) -> Result<()> {
        if payload.len() > self.config.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: self.config.max_payload_size,
            });
        }

        self.scratch.clear();
        encode_frame(class, command, payload, &mut self.scratch)?;
        self.inner.write_all(&self.scratch).map_err(link_error)?;
        self.inner.flush().map_err(link_error)?;

        debug!(class, command, len = payload.len(), "frame sent");
        Ok(())
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

/// A stream that accepts zero bytes has gone away.
fn link_error(err: io::Error) -> FrameError {
    match err.kind() {
        ErrorKind::WriteZero => FrameError::ConnectionClosed,
        _ => FrameError::Io(err),
    }
}
