//! I/O-free coordinator engine.
//!
//! Takes decoded frames in, hands requests out. The caller owns the link and
//! writes every returned request in order.
//!
//! Address lookups carry no discriminator in their response, so at most one
//! is outstanding at a time. Further peers wait in a queue until the current
//! lookup resolves or expires.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use znpcoord_frame::Frame;

use crate::bringup::{BringUp, BringUpConfig, BringUpState};
use crate::discovery::{DiscoveredPeer, PeerDiscovery, Step};
use crate::dispatch::DispatchTable;
use crate::error::{EngineError, Result};
use crate::event::{DeviceState, Event, ResponseKind};
use crate::registry::{Fired, PendingKey, PendingRegistry};
use crate::request::Request;

/// Short addresses meaning "no device at this association index".
const NO_DEVICE: [u16; 2] = [0xFFFE, 0xFFFF];

/// Association indices are one byte on the wire.
const MAX_ASSOCIATIONS: u16 = u8::MAX as u16 + 1;

pub type DiscoveryRegistry = PendingRegistry<ResponseKind, PeerDiscovery>;

#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub bring_up: BringUpConfig,
    /// Pending discoveries older than this are dropped by
    /// [`Engine::sweep_expired`]. `None` keeps them forever.
    pub pending_ttl: Option<Duration>,
}

pub struct Engine {
    dispatch: DispatchTable,
    bring_up: BringUp,
    registry: Arc<DiscoveryRegistry>,
    peers: Vec<DiscoveredPeer>,
    lookups: VecDeque<u16>,
    looking_up: Option<u16>,
    pending_ttl: Option<Duration>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_dispatch(config, DispatchTable::default())
    }

    pub fn with_dispatch(config: EngineConfig, dispatch: DispatchTable) -> Self {
        Self {
            dispatch,
            bring_up: BringUp::new(config.bring_up),
            registry: Arc::new(PendingRegistry::new()),
            peers: Vec::new(),
            lookups: VecDeque::new(),
            looking_up: None,
            pending_ttl: config.pending_ttl,
        }
    }

    /// Begin bring-up with a module reset.
    pub fn start(&mut self) -> Vec<Request> {
        vec![self.bring_up.start()]
    }

    /// Operator trigger: count associated devices and discover them.
    pub fn permit_joining(&mut self) -> Result<Vec<Request>> {
        self.bring_up.apply(&Event::PermitJoiningRequested)
    }

    /// Handle one frame, logging and dropping anything that cannot be routed.
    pub fn handle_frame(&mut self, frame: &Frame) -> Vec<Request> {
        match self.try_handle_frame(frame) {
            Ok(requests) => requests,
            Err(EngineError::UnknownCommand {
                class,
                command,
                payload,
            }) => {
                warn!(class, command, payload = ?payload.as_ref(), "unknown command");
                Vec::new()
            }
            Err(err) => {
                warn!(class = frame.class, command = frame.command, error = %err, "frame dropped");
                Vec::new()
            }
        }
    }

    /// Handle one frame, returning routing and state errors to the caller.
    pub fn try_handle_frame(&mut self, frame: &Frame) -> Result<Vec<Request>> {
        let event = self.dispatch.route(frame)?;
        debug!(
            class = frame.class,
            command = frame.command,
            event = event.name(),
            "frame received"
        );
        self.handle_event(&event)
    }

    /// Apply an event's own handling, then complete any pending request it
    /// answers.
    pub fn handle_event(&mut self, event: &Event) -> Result<Vec<Request>> {
        let mut requests = match event {
            Event::PowerUp { .. } => {
                let dropped = self.registry.sweep_expired(Duration::ZERO);
                self.lookups.clear();
                self.looking_up = None;
                if !dropped.is_empty() {
                    warn!(count = dropped.len(), "module reset, pending discoveries dropped");
                }
                self.bring_up.apply(event)?
            }
            Event::ConfigurationWritten { .. }
            | Event::NetworkStartConfirmed
            | Event::PermitJoinConfirmed { .. }
            | Event::PermitJoiningRequested => self.bring_up.apply(event)?,

            Event::StateChanged(state) => {
                log_state(*state);
                Vec::new()
            }
            Event::DeviceAnnounced {
                nwk_addr,
                ieee_addr,
                capabilities,
                ..
            } => {
                info!(nwk_addr, ieee = %ieee_addr, capabilities, "device announced");
                Vec::new()
            }
            Event::DeviceLeft {
                src_addr,
                ieee_addr,
                rejoin,
            } => {
                info!(src_addr, ieee = %ieee_addr, rejoin, "device left");
                Vec::new()
            }
            Event::Acknowledged { name, status } => {
                match status {
                    Some(code) if *code != 0 => warn!(request = *name, status = *code, "request rejected"),
                    _ => debug!(request = *name, "request acknowledged"),
                }
                Vec::new()
            }
            Event::AssociationCount(count) => {
                info!(count, "associated devices");
                (0..(*count).min(MAX_ASSOCIATIONS))
                    .map(|index| Request::association_find(index as u8))
                    .collect()
            }
            Event::AssociationFound { nwk_addr } => {
                if NO_DEVICE.contains(nwk_addr) {
                    debug!(nwk_addr, "empty association slot");
                    Vec::new()
                } else {
                    self.queue_lookup(*nwk_addr)
                }
            }
            Event::AddressResolved { ieee_addr } => {
                info!(ieee = %ieee_addr, "discovered new device");
                Vec::new()
            }
            Event::ActiveEndpoints {
                nwk_addr,
                endpoints,
                ..
            } => {
                debug!(nwk_addr, endpoints = ?endpoints, "active endpoints reported");
                Vec::new()
            }
        };

        requests.extend(self.correlate(event));
        Ok(requests)
    }

    /// Drop pending discoveries older than the configured TTL.
    ///
    /// Returns the next queued address lookup when the expired entry was the
    /// one outstanding.
    pub fn sweep_expired(&mut self) -> Vec<Request> {
        let Some(ttl) = self.pending_ttl else {
            return Vec::new();
        };
        let expired: Vec<PendingKey<ResponseKind>> = self.registry.sweep_expired(ttl);
        if expired.is_empty() {
            return Vec::new();
        }
        for key in &expired {
            warn!(key = %key, "pending request expired");
        }
        self.next_lookup()
    }

    /// Peers found but not yet looked up.
    pub fn queued_lookups(&self) -> usize {
        self.lookups.len()
    }

    pub fn state(&self) -> BringUpState {
        self.bring_up.state()
    }

    pub fn discovered_peers(&self) -> &[DiscoveredPeer] {
        &self.peers
    }

    pub fn registry(&self) -> Arc<DiscoveryRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn dispatch_table(&self) -> &DispatchTable {
        &self.dispatch
    }

    fn correlate(&mut self, event: &Event) -> Vec<Request> {
        let Some(kind) = event.response_kind() else {
            return Vec::new();
        };

        let fired: Vec<Fired<ResponseKind, PeerDiscovery>> = match kind {
            ResponseKind::AddressLookup => self.registry.dispatch_oldest(&kind).into_iter().collect(),
            ResponseKind::ActiveEndpoints { .. } => self.registry.dispatch(&kind),
        };

        let mut requests = Vec::new();
        for entry in fired {
            debug!(key = %entry.key, waited_ms = entry.waited.as_millis() as u64, "pending request completed");
            requests.extend(self.follow(entry.continuation.advance(event)));
        }
        if kind == ResponseKind::AddressLookup {
            requests.extend(self.next_lookup());
        }
        requests
    }

    fn queue_lookup(&mut self, nwk_addr: u16) -> Vec<Request> {
        let in_flight = self.looking_up == Some(nwk_addr) && self.lookup_pending();
        if in_flight || self.lookups.contains(&nwk_addr) {
            debug!(nwk_addr, "address lookup already scheduled");
            return Vec::new();
        }
        self.lookups.push_back(nwk_addr);
        self.next_lookup()
    }

    /// Start the next queued lookup unless one is still outstanding.
    fn next_lookup(&mut self) -> Vec<Request> {
        if self.lookup_pending() {
            return Vec::new();
        }
        self.looking_up = self.lookups.pop_front();
        match self.looking_up {
            Some(nwk_addr) => self.follow(PeerDiscovery::begin(nwk_addr)),
            None => Vec::new(),
        }
    }

    fn lookup_pending(&self) -> bool {
        self.registry
            .keys()
            .iter()
            .any(|key| key.kind == ResponseKind::AddressLookup)
    }

    fn follow(&mut self, step: Step) -> Vec<Request> {
        match step {
            Step::Await {
                kind,
                request,
                workflow,
            } => {
                let key = self.registry.register(kind, workflow);
                debug!(key = %key, request = request.name, "awaiting response");
                vec![request]
            }
            Step::Finished(peer) => {
                info!(
                    nwk_addr = peer.nwk_addr,
                    ieee = %peer.ieee_addr,
                    endpoints = ?peer.endpoints,
                    "peer discovered"
                );
                self.peers.retain(|known| known.nwk_addr != peer.nwk_addr);
                self.peers.push(peer);
                Vec::new()
            }
            Step::Abandoned { nwk_addr, reason } => {
                warn!(nwk_addr, reason, "peer discovery abandoned");
                Vec::new()
            }
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("state", &self.state())
            .field("pending", &self.registry.len())
            .field("queued_lookups", &self.lookups.len())
            .field("peers", &self.peers.len())
            .finish()
    }
}

fn log_state(state: DeviceState) {
    match state {
        DeviceState::CoordinatorStarted => info!(state = state.as_str(), "started as coordinator"),
        DeviceState::Unknown(code) => warn!(code, "unknown device state"),
        _ => info!(state = state.as_str(), "device state changed"),
    }
}
