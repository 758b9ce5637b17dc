use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::stream::LinkStream;

/// Default serial speed of ZNP firmware images.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Prefix selecting a Unix domain socket bridge.
const UNIX_PREFIX: &str = "unix:";

/// Where the module is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkAddress {
    /// Serial device node, e.g. `/dev/ttyACM0`.
    Device(PathBuf),
    /// Unix domain socket bridged to a module, e.g. `unix:/tmp/znp.sock`.
    Unix(PathBuf),
}

impl FromStr for LinkAddress {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(path) = s.strip_prefix(UNIX_PREFIX) {
            if path.is_empty() {
                return Err(TransportError::InvalidAddress(s.to_string()));
            }
            return Ok(Self::Unix(PathBuf::from(path)));
        }
        if s.is_empty() {
            return Err(TransportError::InvalidAddress(s.to_string()));
        }
        Ok(Self::Device(PathBuf::from(s)))
    }
}

impl fmt::Display for LinkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Device(path) => write!(f, "{}", path.display()),
            Self::Unix(path) => write!(f, "{UNIX_PREFIX}{}", path.display()),
        }
    }
}

/// Line parameters for device links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkConfig {
    /// Serial speed. Ignored for socket bridges. Default: 115200.
    pub baud_rate: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}

/// Open the link described by `address` (blocking).
pub fn open(address: &LinkAddress, config: &LinkConfig) -> Result<LinkStream> {
    match address {
        #[cfg(unix)]
        LinkAddress::Device(path) => crate::serial::SerialDevice::open(path, config.baud_rate),
        #[cfg(unix)]
        LinkAddress::Unix(path) => {
            let stream = std::os::unix::net::UnixStream::connect(path).map_err(|e| {
                TransportError::Connect {
                    path: path.clone(),
                    source: e,
                }
            })?;
            debug!(?path, "connected to module bridge socket");
            Ok(LinkStream::from_unix(stream))
        }
        #[cfg(not(unix))]
        other => {
            let _ = config;
            Err(TransportError::InvalidAddress(format!(
                "{other}: links require a unix platform"
            )))
        }
    }
}
