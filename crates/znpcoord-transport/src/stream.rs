use std::io::{Read, Write};

use crate::error::Result;

/// A connected module link. Implements Read + Write.
///
/// This is the fundamental I/O type returned by [`crate::open`].
/// Reads and writes are independent, so a cloned handle may be used for the
/// reader loop while the original writes requests.
pub struct LinkStream {
    inner: LinkStreamInner,
}

enum LinkStreamInner {
    Device(std::fs::File),
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
}

impl Read for LinkStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            LinkStreamInner::Device(file) => file.read(buf),
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for LinkStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            LinkStreamInner::Device(file) => file.write(buf),
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            LinkStreamInner::Device(file) => file.flush(),
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => stream.flush(),
        }
    }
}

impl LinkStream {
    /// Wrap an already configured serial device.
    pub(crate) fn from_device(file: std::fs::File) -> Self {
        Self {
            inner: LinkStreamInner::Device(file),
        }
    }

    /// Wrap a connected Unix domain socket stream.
    #[cfg(unix)]
    pub fn from_unix(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: LinkStreamInner::Unix(stream),
        }
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            LinkStreamInner::Device(file) => Ok(Self::from_device(file.try_clone()?)),
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => Ok(Self::from_unix(stream.try_clone()?)),
        }
    }

    /// Link kind for diagnostics.
    pub fn kind(&self) -> &'static str {
        match &self.inner {
            LinkStreamInner::Device(_) => "serial",
            #[cfg(unix)]
            LinkStreamInner::Unix(_) => "unix",
        }
    }
}

impl std::fmt::Debug for LinkStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkStream")
            .field("type", &self.kind())
            .finish()
    }
}
