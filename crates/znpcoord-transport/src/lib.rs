//! Duplex link to a ZNP radio module.
//!
//! Provides one stream type over the two ways a coordinator module is
//! usually reached:
//! - a serial device node (`/dev/ttyACM0`), switched to raw 8N1 at the
//!   requested baud rate
//! - a Unix domain socket bridged to a module or simulator (`unix:/path`)
//!
//! This is the lowest layer of znpcoord. Everything else builds on top of
//! the [`LinkStream`] type provided here.

pub mod error;
pub mod link;
pub mod stream;

#[cfg(unix)]
pub mod serial;

pub use error::{Result, TransportError};
pub use link::{open, LinkAddress, LinkConfig, DEFAULT_BAUD_RATE};
pub use stream::LinkStream;
