//! Coordinator engine for ZNP radio modules.
//!
//! Incoming frames are routed through a [`DispatchTable`] to semantic
//! [`Event`]s. Lifecycle events drive the [`BringUp`] state machine; peer
//! discovery chains park a [`PeerDiscovery`] workflow in the
//! [`PendingRegistry`] until the response it waits for arrives.
//!
//! [`Engine`] does no I/O. [`Coordinator`] wraps it with a frame writer and a
//! blocking read loop.

pub mod bringup;
pub mod coordinator;
pub mod discovery;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod event;
pub mod registry;
pub mod request;

pub use bringup::{
    default_configuration, BringUp, BringUpConfig, BringUpState, Transition, WriteMode,
};
pub use coordinator::Coordinator;
pub use discovery::{DiscoveredPeer, DiscoveryStage, PeerDiscovery, Step};
pub use dispatch::{DispatchTable, Route};
pub use engine::{DiscoveryRegistry, Engine, EngineConfig};
pub use error::{EngineError, Result};
pub use event::{DeviceState, Event, IeeeAddr, ModuleIdentity, ResetReason, ResponseKind};
pub use registry::{Callback, Correlate, Fired, PendingKey, PendingRegistry};
pub use request::{ConfigWrite, EndpointDescriptor, Request};
