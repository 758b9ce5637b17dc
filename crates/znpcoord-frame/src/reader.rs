use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use tracing::trace;

use crate::codec::{decode_frame, Frame, FrameConfig, MAX_FRAME_SIZE};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 2 * MAX_FRAME_SIZE;

/// Reads complete frames from any `Read` stream.
///
/// Handles partial reads internally; callers always get complete frames.
/// A corrupted frame surfaces as a recoverable error (see
/// [`FrameError::is_recoverable`]); the offending bytes are already dropped
/// and the next call continues with the rest of the stream.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached.
    pub fn read_frame(&mut self) -> Result<Frame> {
        let mut chunk = vec![0u8; self.config.read_chunk_size.max(1)];
        loop {
            if let Some(frame) = decode_frame(&mut self.buf)? {
                return Ok(frame);
            }

            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            trace!(bytes = read, buffered = self.buf.len(), "link read");
            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Number of bytes received but not yet consumed by a frame.
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::BytesMut;

    use super::*;
    use crate::codec::encode_frame;

    fn wire(frames: &[(u8, u8, &[u8])]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for (class, command, payload) in frames {
            encode_frame(*class, *command, payload, &mut buf).unwrap();
        }
        buf.to_vec()
    }

    #[test]
    fn read_single_frame() {
        let bytes = wire(&[(0x45, 0xC0, &[0x09])]);
        let mut reader = FrameReader::new(Cursor::new(bytes));
        let frame = reader.read_frame().unwrap();

        assert_eq!((frame.class, frame.command), (0x45, 0xC0));
        assert_eq!(frame.payload.as_ref(), &[0x09]);
    }

    #[test]
    fn read_multiple_frames_from_one_chunk() {
        let bytes = wire(&[
            (0x66, 0x05, &[0x00]),
            (0x66, 0x05, &[0x00]),
            (0x66, 0x00, &[]),
        ]);
        let mut reader = FrameReader::new(Cursor::new(bytes));

        let f1 = reader.read_frame().unwrap();
        let f2 = reader.read_frame().unwrap();
        let f3 = reader.read_frame().unwrap();

        assert_eq!(f1.command, 0x05);
        assert_eq!(f2.command, 0x05);
        assert_eq!(f3.command, 0x00);
        assert_eq!(reader.buffered_len(), 0);
    }

    #[test]
    fn partial_read_handling() {
        let byte_reader = ByteByByteReader {
            bytes: wire(&[(0x67, 0x48, &[0x02, 0x00])]),
            pos: 0,
        };
        let mut reader = FrameReader::new(byte_reader);

        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.command, 0x48);
        assert_eq!(frame.payload.as_ref(), &[0x02, 0x00]);
    }

    #[test]
    fn connection_closed_cleanly() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn connection_closed_mid_frame() {
        let mut bytes = wire(&[(0x67, 0x41, &[1, 2, 3, 4, 5, 6, 7, 8])]);
        bytes.truncate(6);

        let mut reader = FrameReader::new(Cursor::new(bytes));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn garbage_then_frame_recovers() {
        let mut bytes = vec![0x11, 0x22];
        bytes.extend(wire(&[(0x41, 0x80, &[0x00, 0x02, 0x01, 0x02, 0x06, 0x03])]));
        let mut reader = FrameReader::new(Cursor::new(bytes));

        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::InvalidMarker(0x11)));
        assert!(err.is_recoverable());

        let frame = reader.read_frame().unwrap();
        assert_eq!((frame.class, frame.command), (0x41, 0x80));
    }

    #[test]
    fn corrupted_frame_is_dropped() {
        let mut bytes = wire(&[(0x45, 0xC0, &[0x09])]);
        let last = bytes.len() - 1;
        bytes[last] ^= 0x80;
        bytes.extend(wire(&[(0x45, 0xC0, &[0x08])]));
        let mut reader = FrameReader::new(Cursor::new(bytes));

        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ChecksumMismatch { .. }));

        let frame = loop {
            match reader.read_frame() {
                Ok(frame) => break frame,
                Err(err) => assert!(err.is_recoverable(), "unexpected {err}"),
            }
        };
        assert_eq!(frame.payload.as_ref(), &[0x08]);
    }

    #[test]
    fn small_read_chunks() {
        let cfg = FrameConfig {
            read_chunk_size: 3,
            ..FrameConfig::default()
        };
        let bytes = wire(&[(0x67, 0x49, &[0x34, 0x12, 0x00, 0x00])]);
        let mut reader = FrameReader::with_config(Cursor::new(bytes), cfg);
        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.payload.as_ref(), &[0x34, 0x12, 0x00, 0x00]);
        assert_eq!(reader.config().read_chunk_size, 3);
    }

    #[test]
    fn interrupted_read_retries() {
        let reader = InterruptedThenData {
            interrupted: false,
            inner: Cursor::new(wire(&[(0x66, 0x08, &[0x00])])),
        };
        let mut framed = FrameReader::new(reader);
        let frame = framed.read_frame().unwrap();
        assert_eq!(frame.command, 0x08);
    }

    #[test]
    fn io_error_propagates() {
        let mut framed = FrameReader::new(FailingReader);
        let err = framed.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::BrokenPipe));
        assert!(!FrameError::ConnectionClosed.is_recoverable());
    }

    #[cfg(unix)]
    #[test]
    fn roundtrip_over_pipe() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = crate::writer::FrameWriter::new(left);
        let mut reader = FrameReader::new(right);

        writer.send(0x41, 0x00, &[0x00]).unwrap();
        let frame = reader.read_frame().unwrap();

        assert_eq!((frame.class, frame.command), (0x41, 0x00));
        assert_eq!(frame.payload.as_ref(), &[0x00]);
    }

    #[test]
    fn accessors_and_into_inner() {
        let cursor = Cursor::new(Vec::<u8>::new());
        let mut reader = FrameReader::new(cursor);

        let _ = reader.get_ref();
        let _ = reader.get_mut();
        let _inner = reader.into_inner();
    }

    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct InterruptedThenData {
        interrupted: bool,
        inner: Cursor<Vec<u8>>,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.inner.read(buf)
        }
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::BrokenPipe))
        }
    }
}
