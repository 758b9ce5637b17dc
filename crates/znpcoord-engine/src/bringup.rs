//! Device bring-up sequencing.
//!
//! Bring-up is an explicit state machine. [`BringUp::transition`] maps a
//! `(state, event)` pair to the next state and the requests to send; pairs
//! outside the table are rejected and change nothing.

use tracing::{info, warn};

use crate::error::{EngineError, Result};
use crate::event::Event;
use crate::request::{ConfigWrite, EndpointDescriptor, Request};

/// Configuration item ids written by the default sequence.
pub mod config_id {
    pub const STARTUP_OPTION: u8 = 0x03;
    pub const CHANNEL_LIST: u8 = 0x84;
    pub const LOGICAL_TYPE: u8 = 0x87;
    pub const ZDO_DIRECT_CB: u8 = 0x8F;
    pub const PRECFG_KEY: u8 = 0x62;
    pub const PRECFG_KEYS_ENABLE: u8 = 0x63;
    pub const SECURITY_MODE: u8 = 0x64;
}

/// Cluster whose ZDO messages are forwarded to the host (IAS zone).
pub const DEFAULT_CALLBACK_CLUSTER: u16 = 0x0500;

/// Where bring-up currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BringUpState {
    /// Reset sent, waiting for the module's reset indication.
    AwaitingPowerUp,
    /// Configuration writes sent one at a time; `acknowledged` writes done.
    WritingConfiguration { acknowledged: usize },
    /// Start request sent.
    NetworkStarting,
    /// Endpoint registered and join windows requested.
    NetworkStarted,
    /// At least one join window confirmed.
    PermittingJoins,
}

/// How configuration writes are paced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Send every write back to back, followed by the start request.
    #[default]
    Batch,
    /// Send the next write only after the previous one is acknowledged.
    AwaitAck,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BringUpConfig {
    pub write_mode: WriteMode,
    /// Written in order after power-up.
    pub configuration: Vec<ConfigWrite>,
    pub endpoint: EndpointDescriptor,
    pub callback_cluster: u16,
    /// One permit-joining request is sent per entry, in seconds.
    pub permit_windows: Vec<u8>,
    /// Run the association sweep when the first join window is confirmed.
    pub discover_on_permit_join: bool,
}

impl Default for BringUpConfig {
    fn default() -> Self {
        Self {
            write_mode: WriteMode::default(),
            configuration: default_configuration(),
            endpoint: EndpointDescriptor::default(),
            callback_cluster: DEFAULT_CALLBACK_CLUSTER,
            permit_windows: vec![0x00, 0x3C],
            discover_on_permit_join: true,
        }
    }
}

/// Coordinator role, fixed security key, channel 11.
pub fn default_configuration() -> Vec<ConfigWrite> {
    vec![
        ConfigWrite::new(config_id::STARTUP_OPTION, [0x00]),
        ConfigWrite::new(config_id::ZDO_DIRECT_CB, [0x01]),
        ConfigWrite::new(config_id::PRECFG_KEY, (0x00..=0x0F).collect::<Vec<u8>>()),
        ConfigWrite::new(config_id::PRECFG_KEYS_ENABLE, [0x00]),
        ConfigWrite::new(config_id::SECURITY_MODE, [0x01]),
        ConfigWrite::new(config_id::LOGICAL_TYPE, [0x00]),
        ConfigWrite::new(config_id::CHANNEL_LIST, [0x00, 0x08, 0x00, 0x00]),
    ]
}

/// Outcome of one accepted event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: BringUpState,
    pub requests: Vec<Request>,
}

impl Transition {
    fn to(next: BringUpState, requests: Vec<Request>) -> Self {
        Self { next, requests }
    }
}

/// Bring-up state machine.
#[derive(Debug, Clone)]
pub struct BringUp {
    config: BringUpConfig,
    state: BringUpState,
}

impl BringUp {
    pub fn new(config: BringUpConfig) -> Self {
        Self {
            config,
            state: BringUpState::AwaitingPowerUp,
        }
    }

    pub fn state(&self) -> BringUpState {
        self.state
    }

    pub fn config(&self) -> &BringUpConfig {
        &self.config
    }

    /// Restart bring-up: returns the reset request.
    pub fn start(&mut self) -> Request {
        self.state = BringUpState::AwaitingPowerUp;
        info!("resetting module");
        Request::reset()
    }

    /// Feed one lifecycle event, advancing the state on success.
    pub fn apply(&mut self, event: &Event) -> Result<Vec<Request>> {
        let transition = self.transition(self.state, event)?;
        if transition.next != self.state {
            info!(from = ?self.state, to = ?transition.next, "bring-up state changed");
        }
        self.state = transition.next;
        Ok(transition.requests)
    }

    /// The transition table.
    pub fn transition(&self, state: BringUpState, event: &Event) -> Result<Transition> {
        use BringUpState::*;

        match (state, event) {
            (_, Event::PowerUp { reason, identity }) => {
                match identity {
                    Some(id) => info!(
                        %reason,
                        transport_rev = id.transport_rev,
                        product_id = id.product_id,
                        version = %id.version(),
                        "module powered up"
                    ),
                    None => info!(%reason, "module powered up"),
                }
                Ok(self.begin_configuration())
            }

            (WritingConfiguration { acknowledged }, Event::ConfigurationWritten { status }) => {
                log_write_status(*status);
                let acknowledged = acknowledged + 1;
                match self.config.configuration.get(acknowledged) {
                    Some(write) => Ok(Transition::to(
                        WritingConfiguration { acknowledged },
                        vec![Request::write_configuration(write)],
                    )),
                    None => Ok(Transition::to(NetworkStarting, vec![Request::start_network()])),
                }
            }

            (NetworkStarting, Event::ConfigurationWritten { status }) => {
                log_write_status(*status);
                Ok(Transition::to(NetworkStarting, Vec::new()))
            }

            (NetworkStarting, Event::NetworkStartConfirmed) => {
                info!("network start confirmed");
                Ok(Transition::to(NetworkStarted, self.network_requests()))
            }

            (NetworkStarted | PermittingJoins, Event::PermitJoinConfirmed { status }) => {
                if *status == 0 {
                    info!("permit joining confirmed");
                } else {
                    warn!(status, "permit joining failed");
                }
                let requests = if state == NetworkStarted && self.config.discover_on_permit_join {
                    sweep_requests()
                } else {
                    Vec::new()
                };
                Ok(Transition::to(PermittingJoins, requests))
            }

            (NetworkStarted | PermittingJoins, Event::PermitJoiningRequested) => {
                info!("association sweep requested");
                Ok(Transition::to(PermittingJoins, sweep_requests()))
            }

            (state, event) => Err(EngineError::IllegalEvent {
                state,
                event: event.name(),
            }),
        }
    }

    fn begin_configuration(&self) -> Transition {
        let writes = &self.config.configuration;
        match self.config.write_mode {
            WriteMode::Batch => {
                let mut requests: Vec<Request> =
                    writes.iter().map(Request::write_configuration).collect();
                requests.push(Request::start_network());
                Transition::to(BringUpState::NetworkStarting, requests)
            }
            WriteMode::AwaitAck => match writes.first() {
                Some(first) => Transition::to(
                    BringUpState::WritingConfiguration { acknowledged: 0 },
                    vec![Request::write_configuration(first)],
                ),
                None => Transition::to(BringUpState::NetworkStarting, vec![Request::start_network()]),
            },
        }
    }

    fn network_requests(&self) -> Vec<Request> {
        let mut requests = vec![
            Request::register_endpoint(&self.config.endpoint),
            Request::startup_from_app(),
            Request::register_callback(self.config.callback_cluster),
        ];
        requests.extend(self.config.permit_windows.iter().map(|d| Request::permit_joining(*d)));
        requests
    }
}

impl Default for BringUp {
    fn default() -> Self {
        Self::new(BringUpConfig::default())
    }
}

/// Count the associated devices, then look up the first one.
pub fn sweep_requests() -> Vec<Request> {
    vec![Request::association_count(), Request::association_find(0)]
}

fn log_write_status(status: u8) {
    if status == 0 {
        info!("configuration write ok");
    } else {
        warn!(status, "configuration write failed");
    }
}
