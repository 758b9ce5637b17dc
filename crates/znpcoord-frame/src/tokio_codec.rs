//! `tokio_util::codec` adapter for async links.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::codec::{decode_frame, encode_frame, Frame};
use crate::error::FrameError;

/// Frame codec for `Framed`/`FramedRead`.
///
/// Corrupted frames are logged and skipped inside `decode`, so a stream
/// built on this codec only ends on I/O failure or EOF.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZnpCodec;

impl Decoder for ZnpCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        loop {
            match decode_frame(src) {
                Ok(frame) => return Ok(frame),
                Err(err) if err.is_recoverable() => {
                    warn!(error = %err, "dropping malformed frame");
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Encoder<Frame> for ZnpCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), FrameError> {
        encode_frame(item.class, item.command, &item.payload, dst)
    }
}

impl Encoder<&Frame> for ZnpCodec {
    type Error = FrameError;

    fn encode(&mut self, item: &Frame, dst: &mut BytesMut) -> Result<(), FrameError> {
        encode_frame(item.class, item.command, &item.payload, dst)
    }
}
