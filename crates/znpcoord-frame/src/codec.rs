use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::command;
use crate::error::{FrameError, Result};

/// Start-of-frame indicator.
pub const START_MARKER: u8 = 0xFE;

/// Frame header: marker (1) + length (1) + class (1) + command (1) = 4 bytes.
pub const HEADER_SIZE: usize = 4;

/// Largest payload the module accepts: 255 minus header and checksum.
pub const MAX_PAYLOAD: usize = 250;

/// Transport ceiling for one physical read.
pub const MAX_FRAME_SIZE: usize = 256;

/// A checksummed ZNP frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Command type and subsystem.
    pub class: u8,
    /// Operation within the subsystem.
    pub command: u8,
    /// The frame payload.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(class: u8, command: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            class,
            command,
            payload: payload.into(),
        }
    }

    /// The total wire size of this frame (header + payload + checksum).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len() + 1
    }

    /// Command type bits (`SREQ`, `AREQ`, `SRSP`).
    pub fn command_type(&self) -> u8 {
        command::command_type(self.class)
    }

    /// Subsystem bits.
    pub fn subsystem(&self) -> u8 {
        command::subsystem(self.class)
    }

    /// Encode this frame into a standalone buffer.
    pub fn encode(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.wire_size());
        encode_frame(self.class, self.command, &self.payload, &mut buf)?;
        Ok(buf.freeze())
    }

    /// Decode a single frame from the start of `raw`.
    ///
    /// Bytes after the checksum are ignored.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let Some(&marker) = raw.first() else {
            return Err(FrameError::Incomplete {
                needed: HEADER_SIZE + 1,
                available: 0,
            });
        };
        if marker != START_MARKER {
            return Err(FrameError::InvalidMarker(marker));
        }
        if raw.len() < HEADER_SIZE {
            return Err(FrameError::Incomplete {
                needed: HEADER_SIZE + 1,
                available: raw.len(),
            });
        }

        let len = raw[1] as usize;
        if len > MAX_PAYLOAD {
            return Err(FrameError::PayloadTooLarge {
                size: len,
                max: MAX_PAYLOAD,
            });
        }

        let frame_end = HEADER_SIZE + len;
        if raw.len() <= frame_end {
            return Err(FrameError::Incomplete {
                needed: frame_end + 1,
                available: raw.len(),
            });
        }

        verify(&raw[1..frame_end], raw[frame_end])?;

        Ok(Self {
            class: raw[2],
            command: raw[3],
            payload: Bytes::copy_from_slice(&raw[HEADER_SIZE..frame_end]),
        })
    }
}

/// Single-byte XOR fold.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |fcs, b| fcs ^ b)
}

fn verify(covered: &[u8], actual: u8) -> Result<()> {
    let expected = checksum(covered);
    if expected != actual {
        return Err(FrameError::ChecksumMismatch { expected, actual });
    }
    Ok(())
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌────────┬────────┬───────┬─────────┬─────────────────┬──────────┐
/// │ Marker │ Length │ Class │ Command │ Payload         │ Checksum │
/// │ 0xFE   │ (1B)   │ (1B)  │ (1B)    │ (Length bytes)  │ (1B XOR) │
/// └────────┴────────┴───────┴─────────┴─────────────────┴──────────┘
/// ```
///
/// The checksum covers length through the last payload byte.
pub fn encode_frame(class: u8, command: u8, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD,
        });
    }
    let len = payload.len() as u8;
    let fcs = checksum(&[len, class, command]) ^ checksum(payload);

    dst.reserve(HEADER_SIZE + payload.len() + 1);
    dst.put_u8(START_MARKER);
    dst.put_u8(len);
    dst.put_u8(class);
    dst.put_u8(command);
    dst.put_slice(payload);
    dst.put_u8(fcs);
    Ok(())
}

/// Decode a frame from a stream buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer. On a framing or
/// integrity failure the offending bytes are discarded before the error is
/// returned, so the next call resynchronises on the following start marker.
pub fn decode_frame(src: &mut BytesMut) -> Result<Option<Frame>> {
    let Some(&first) = src.first() else {
        return Ok(None);
    };

    if first != START_MARKER {
        let skip = src
            .iter()
            .position(|&b| b == START_MARKER)
            .unwrap_or(src.len());
        src.advance(skip);
        return Err(FrameError::InvalidMarker(first));
    }

    if src.len() < 2 {
        return Ok(None); // Need the length byte
    }

    let len = src[1] as usize;
    if len > MAX_PAYLOAD {
        src.advance(1);
        return Err(FrameError::PayloadTooLarge {
            size: len,
            max: MAX_PAYLOAD,
        });
    }

    let frame_end = HEADER_SIZE + len;
    if src.len() <= frame_end {
        return Ok(None); // Need more data
    }

    if let Err(err) = verify(&src[1..frame_end], src[frame_end]) {
        src.advance(1);
        return Err(err);
    }

    let class = src[2];
    let command = src[3];
    src.advance(HEADER_SIZE);
    let payload = src.split_to(len).freeze();
    src.advance(1);

    Ok(Some(Frame {
        class,
        command,
        payload,
    }))
}

/// Configuration for frame readers and writers.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload accepted by writers. Default: 250.
    pub max_payload_size: usize,
    /// Bytes requested per physical read. Default: 256.
    pub read_chunk_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: MAX_PAYLOAD,
            read_chunk_size: MAX_FRAME_SIZE,
        }
    }
}
