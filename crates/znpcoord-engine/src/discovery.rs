use tracing::warn;

use crate::event::{Event, IeeeAddr, ResponseKind};
use crate::request::Request;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryStage {
    AddressResolving,
    ServicesQuerying,
}

/// A peer whose address and endpoints are known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredPeer {
    pub nwk_addr: u16,
    pub ieee_addr: IeeeAddr,
    pub endpoints: Vec<u8>,
}

/// In-flight discovery of one peer: extended address first, then active
/// endpoints. Parked in the pending registry between the two steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerDiscovery {
    nwk_addr: u16,
    ieee_addr: Option<IeeeAddr>,
    stage: DiscoveryStage,
}

/// What the workflow needs next.
#[derive(Debug)]
pub enum Step {
    /// Send `request` and park `workflow` under `kind`.
    Await {
        kind: ResponseKind,
        request: Request,
        workflow: PeerDiscovery,
    },
    Finished(DiscoveredPeer),
    Abandoned {
        nwk_addr: u16,
        reason: &'static str,
    },
}

impl PeerDiscovery {
    /// Start discovery of `nwk_addr` with an address lookup.
    pub fn begin(nwk_addr: u16) -> Step {
        Step::Await {
            kind: ResponseKind::AddressLookup,
            request: Request::address_lookup(nwk_addr),
            workflow: Self {
                nwk_addr,
                ieee_addr: None,
                stage: DiscoveryStage::AddressResolving,
            },
        }
    }

    pub fn nwk_addr(&self) -> u16 {
        self.nwk_addr
    }

    pub fn ieee_addr(&self) -> Option<IeeeAddr> {
        self.ieee_addr
    }

    pub fn stage(&self) -> DiscoveryStage {
        self.stage
    }

    /// Consume the response this workflow was parked for.
    pub fn advance(self, event: &Event) -> Step {
        match (self.stage, event) {
            (DiscoveryStage::AddressResolving, Event::AddressResolved { ieee_addr }) => {
                let nwk_addr = self.nwk_addr;
                Step::Await {
                    kind: ResponseKind::ActiveEndpoints { nwk_addr },
                    request: Request::active_endpoints(nwk_addr),
                    workflow: Self {
                        nwk_addr,
                        ieee_addr: Some(*ieee_addr),
                        stage: DiscoveryStage::ServicesQuerying,
                    },
                }
            }

            (
                DiscoveryStage::ServicesQuerying,
                Event::ActiveEndpoints {
                    status, endpoints, ..
                },
            ) => match self.ieee_addr {
                Some(ieee_addr) if *status == 0 => Step::Finished(DiscoveredPeer {
                    nwk_addr: self.nwk_addr,
                    ieee_addr,
                    endpoints: endpoints.clone(),
                }),
                Some(_) => {
                    warn!(nwk_addr = self.nwk_addr, status, "active endpoint query failed");
                    Step::Abandoned {
                        nwk_addr: self.nwk_addr,
                        reason: "active endpoint query failed",
                    }
                }
                None => Step::Abandoned {
                    nwk_addr: self.nwk_addr,
                    reason: "extended address missing",
                },
            },

            _ => Step::Abandoned {
                nwk_addr: self.nwk_addr,
                reason: "unexpected response",
            },
        }
    }
}
