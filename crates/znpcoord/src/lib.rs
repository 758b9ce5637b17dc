//! Coordinator driver for ZNP radio modules.
//!
//! # Crate Structure
//!
//! - [`transport`]: Opening the serial device or a Unix socket bridge
//! - [`frame`]: Wire framing, checksum and opcode tables
//! - [`engine`]: Dispatch, request correlation and bring-up sequencing

/// Re-export transport types.
pub mod transport {
    pub use znpcoord_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use znpcoord_frame::*;
}

/// Re-export engine types.
pub mod engine {
    pub use znpcoord_engine::*;
}
