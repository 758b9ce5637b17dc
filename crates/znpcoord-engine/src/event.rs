use std::fmt;

use crate::registry::Correlate;

/// Why the module (re)started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetReason {
    PowerUp,
    External,
    Watchdog,
    Other(u8),
}

impl From<u8> for ResetReason {
    fn from(value: u8) -> Self {
        match value {
            0x00 => Self::PowerUp,
            0x01 => Self::External,
            0x02 => Self::Watchdog,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for ResetReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PowerUp => f.write_str("power-up"),
            Self::External => f.write_str("external"),
            Self::Watchdog => f.write_str("watchdog"),
            Self::Other(code) => write!(f, "unknown(0x{code:02X})"),
        }
    }
}

/// Firmware identity reported with a reset indication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleIdentity {
    pub transport_rev: u8,
    pub product_id: u8,
    pub major: u8,
    pub minor: u8,
    pub maintenance: u8,
}

impl ModuleIdentity {
    /// Product version as `major.minor.maintenance`.
    pub fn version(&self) -> String {
        format!("{}.{}.{}", self.major, self.minor, self.maintenance)
    }
}

/// Network role/state reported by state-change indications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Hold,
    Initializing,
    DiscoveringNetwork,
    Joining,
    Rejoined,
    UnauthenticatedEndDevice,
    EndDevice,
    Router,
    CoordinatorStarting,
    CoordinatorStarted,
    Orphaned,
    Unknown(u8),
}

impl From<u8> for DeviceState {
    fn from(value: u8) -> Self {
        match value {
            0x00 => Self::Hold,
            0x01 => Self::Initializing,
            0x02 => Self::DiscoveringNetwork,
            0x03 => Self::Joining,
            0x04 => Self::Rejoined,
            0x05 => Self::UnauthenticatedEndDevice,
            0x06 => Self::EndDevice,
            0x07 => Self::Router,
            0x08 => Self::CoordinatorStarting,
            0x09 => Self::CoordinatorStarted,
            0x0A => Self::Orphaned,
            other => Self::Unknown(other),
        }
    }
}

impl DeviceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hold => "DEV_HOLD",
            Self::Initializing => "DEV_INIT",
            Self::DiscoveringNetwork => "DEV_NWK_DISC",
            Self::Joining => "DEV_NWK_JOINING",
            Self::Rejoined => "DEV_NWK_REJOIN",
            Self::UnauthenticatedEndDevice => "DEV_END_DEVICE_UNAUTH",
            Self::EndDevice => "DEV_END_DEVICE",
            Self::Router => "DEV_ROUTER",
            Self::CoordinatorStarting => "DEV_COORD_STARTING",
            Self::CoordinatorStarted => "DEV_ZB_COORD",
            Self::Orphaned => "DEV_NWK_ORPHAN",
            Self::Unknown(_) => "UNKNOWN",
        }
    }
}

/// 64-bit extended (IEEE) address, stored in wire order (little-endian).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IeeeAddr(pub [u8; 8]);

impl IeeeAddr {
    pub fn from_le_slice(bytes: &[u8]) -> Option<Self> {
        let raw: [u8; 8] = bytes.get(..8)?.try_into().ok()?;
        Some(Self(raw))
    }

    pub fn as_u64(&self) -> u64 {
        u64::from_le_bytes(self.0)
    }
}

/// Most significant byte first, uppercase hex.
impl fmt::Display for IeeeAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016X}", self.as_u64())
    }
}

/// Semantic name a pending request waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    /// Synchronous answer to an address lookup. The answer carries no
    /// discriminator, so waiters are completed oldest first.
    AddressLookup,
    /// Active-endpoint report for one peer.
    ActiveEndpoints { nwk_addr: u16 },
}

impl Correlate for ResponseKind {
    fn completed_by(&self, incoming: &Self) -> bool {
        self == incoming
    }
}

impl fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddressLookup => f.write_str("UTIL_ADDRMGR_NWK_ADDR_LOOKUP"),
            Self::ActiveEndpoints { nwk_addr } => write!(f, "ZDO_ACTIVE_EP_RSP:0x{nwk_addr:04X}"),
        }
    }
}

/// A decoded incoming frame, or an operator trigger fed to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    PowerUp {
        reason: ResetReason,
        identity: Option<ModuleIdentity>,
    },
    StateChanged(DeviceState),
    DeviceAnnounced {
        src_addr: u16,
        nwk_addr: u16,
        ieee_addr: IeeeAddr,
        capabilities: u8,
    },
    DeviceLeft {
        src_addr: u16,
        ieee_addr: IeeeAddr,
        rejoin: bool,
    },
    ActiveEndpoints {
        src_addr: u16,
        status: u8,
        nwk_addr: u16,
        endpoints: Vec<u8>,
    },
    /// Synchronous status for a request that needs no follow-up.
    Acknowledged {
        name: &'static str,
        status: Option<u8>,
    },
    NetworkStartConfirmed,
    ConfigurationWritten {
        status: u8,
    },
    PermitJoinConfirmed {
        status: u8,
    },
    AddressResolved {
        ieee_addr: IeeeAddr,
    },
    AssociationCount(u16),
    AssociationFound {
        nwk_addr: u16,
    },
    /// Operator asked for a join window and association sweep.
    PermitJoiningRequested,
}

impl Event {
    /// Short name used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PowerUp { .. } => "PowerUp",
            Self::StateChanged(_) => "StateChanged",
            Self::DeviceAnnounced { .. } => "DeviceAnnounced",
            Self::DeviceLeft { .. } => "DeviceLeft",
            Self::ActiveEndpoints { .. } => "ActiveEndpoints",
            Self::Acknowledged { .. } => "Acknowledged",
            Self::NetworkStartConfirmed => "NetworkStartConfirmed",
            Self::ConfigurationWritten { .. } => "ConfigurationWritten",
            Self::PermitJoinConfirmed { .. } => "PermitJoinConfirmed",
            Self::AddressResolved { .. } => "AddressResolved",
            Self::AssociationCount(_) => "AssociationCount",
            Self::AssociationFound { .. } => "AssociationFound",
            Self::PermitJoiningRequested => "PermitJoiningRequested",
        }
    }

    /// Semantic name that completes pending requests, if this event is a
    /// correlated response.
    pub fn response_kind(&self) -> Option<ResponseKind> {
        match self {
            Self::AddressResolved { .. } => Some(ResponseKind::AddressLookup),
            Self::ActiveEndpoints { nwk_addr, .. } => Some(ResponseKind::ActiveEndpoints {
                nwk_addr: *nwk_addr,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_state_table() {
        assert_eq!(DeviceState::from(0x00), DeviceState::Hold);
        assert_eq!(DeviceState::from(0x09), DeviceState::CoordinatorStarted);
        assert_eq!(DeviceState::from(0x0A), DeviceState::Orphaned);
        assert_eq!(DeviceState::from(0x0B), DeviceState::Unknown(0x0B));
        assert_eq!(DeviceState::from(0x08).as_str(), "DEV_COORD_STARTING");
    }

    #[test]
    fn reset_reason_table() {
        assert_eq!(ResetReason::from(0), ResetReason::PowerUp);
        assert_eq!(ResetReason::from(2), ResetReason::Watchdog);
        assert_eq!(ResetReason::from(7).to_string(), "unknown(0x07)");
    }

    #[test]
    fn ieee_address_renders_msb_first() {
        let addr = IeeeAddr::from_le_slice(&[0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01]).unwrap();
        assert_eq!(addr.to_string(), "0102030405060708");
        assert!(IeeeAddr::from_le_slice(&[0x01, 0x02]).is_none());
    }

    #[test]
    fn response_kinds_correlate_exactly() {
        let a = ResponseKind::ActiveEndpoints { nwk_addr: 0x1234 };
        let b = ResponseKind::ActiveEndpoints { nwk_addr: 0x1235 };
        assert!(a.completed_by(&a));
        assert!(!a.completed_by(&b));
        assert!(!ResponseKind::AddressLookup.completed_by(&a));
        assert_eq!(a.to_string(), "ZDO_ACTIVE_EP_RSP:0x1234");
    }

    #[test]
    fn only_correlated_responses_have_kinds() {
        let resolved = Event::AddressResolved {
            ieee_addr: IeeeAddr([0; 8]),
        };
        assert_eq!(resolved.response_kind(), Some(ResponseKind::AddressLookup));
        assert_eq!(Event::AssociationCount(2).response_kind(), None);
        assert_eq!(Event::NetworkStartConfirmed.name(), "NetworkStartConfirmed");
    }
}
