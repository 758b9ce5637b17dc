use std::collections::HashMap;

use znpcoord_frame::command::*;
use znpcoord_frame::Frame;

use crate::error::{EngineError, Result};
use crate::event::{DeviceState, Event, IeeeAddr, ModuleIdentity, ResetReason};

/// Payload parser for one route. Receives the route name for error reports.
pub type Parser = fn(&'static str, &[u8]) -> Result<Event>;

/// One entry of the dispatch table.
#[derive(Clone, Copy)]
pub struct Route {
    pub name: &'static str,
    pub parse: Parser,
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route").field("name", &self.name).finish()
    }
}

/// `(class, command)` → handler map.
#[derive(Debug, Clone)]
pub struct DispatchTable {
    routes: HashMap<(u8, u8), Route>,
}

impl DispatchTable {
    /// Table with no routes.
    pub fn empty() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    /// Add or replace a route, returning the previous one.
    pub fn insert(
        &mut self,
        class: u8,
        command: u8,
        name: &'static str,
        parse: Parser,
    ) -> Option<Route> {
        self.routes.insert((class, command), Route { name, parse })
    }

    pub fn lookup(&self, class: u8, command: u8) -> Option<&Route> {
        self.routes.get(&(class, command))
    }

    /// Decode a frame into its event.
    ///
    /// Unrouted frames yield [`EngineError::UnknownCommand`] carrying the raw
    /// payload.
    pub fn route(&self, frame: &Frame) -> Result<Event> {
        match self.lookup(frame.class, frame.command) {
            Some(route) => (route.parse)(route.name, &frame.payload),
            None => Err(EngineError::UnknownCommand {
                class: frame.class,
                command: frame.command,
                payload: frame.payload.clone(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Default for DispatchTable {
    fn default() -> Self {
        let areq_sys = class(TYPE_AREQ, SUBSYSTEM_SYS);
        let areq_zdo = class(TYPE_AREQ, SUBSYSTEM_ZDO);
        let srsp_af = class(TYPE_SRSP, SUBSYSTEM_AF);
        let srsp_zdo = class(TYPE_SRSP, SUBSYSTEM_ZDO);
        let srsp_sapi = class(TYPE_SRSP, SUBSYSTEM_SAPI);
        let srsp_util = class(TYPE_SRSP, SUBSYSTEM_UTIL);

        let mut table = Self::empty();
        table.insert(areq_sys, SYS_RESET_IND, "SYS_RESET_IND", parse_reset_ind);
        table.insert(areq_zdo, ZDO_STATE_CHANGE_IND, "ZDO_STATE_CHANGE_IND", parse_state_change);
        table.insert(areq_zdo, ZDO_END_DEVICE_ANNCE_IND, "ZDO_END_DEVICE_ANNCE_IND", parse_announce);
        table.insert(areq_zdo, ZDO_LEAVE_IND, "ZDO_LEAVE_IND", parse_leave);
        table.insert(areq_zdo, ZDO_ACTIVE_EP_RSP, "ZDO_ACTIVE_EP_RSP", parse_active_endpoints);
        table.insert(srsp_af, AF_REGISTER, "AF_REGISTER", parse_ack);
        table.insert(srsp_zdo, ZDO_ACTIVE_EP_REQ, "ZDO_ACTIVE_EP_REQ", parse_ack);
        table.insert(srsp_zdo, ZDO_STARTUP_FROM_APP, "ZDO_STARTUP_FROM_APP", parse_ack);
        table.insert(srsp_zdo, ZDO_MSG_CB_REGISTER, "ZDO_MSG_CB_REGISTER", parse_ack);
        table.insert(srsp_sapi, ZB_START_REQUEST, "ZB_START_REQUEST", parse_start_confirm);
        table.insert(srsp_sapi, ZB_WRITE_CONFIGURATION, "ZB_WRITE_CONFIGURATION", parse_config_written);
        table.insert(srsp_sapi, ZB_PERMIT_JOINING_REQUEST, "ZB_PERMIT_JOINING_REQUEST", parse_permit_join);
        table.insert(srsp_util, UTIL_ADDRMGR_NWK_ADDR_LOOKUP, "UTIL_ADDRMGR_NWK_ADDR_LOOKUP", parse_address);
        table.insert(srsp_util, UTIL_ASSOC_COUNT, "UTIL_ASSOC_COUNT", parse_assoc_count);
        table.insert(srsp_util, UTIL_ASSOC_FIND_DEVICE, "UTIL_ASSOC_FIND_DEVICE", parse_assoc_found);
        table
    }
}

fn require(name: &'static str, payload: &[u8], expected: usize) -> Result<()> {
    if payload.len() < expected {
        return Err(EngineError::ShortPayload {
            name,
            expected,
            actual: payload.len(),
        });
    }
    Ok(())
}

fn u16_le(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn ieee_at(name: &'static str, payload: &[u8], at: usize) -> Result<IeeeAddr> {
    payload
        .get(at..)
        .and_then(IeeeAddr::from_le_slice)
        .ok_or(EngineError::ShortPayload {
            name,
            expected: at + 8,
            actual: payload.len(),
        })
}

fn parse_reset_ind(name: &'static str, payload: &[u8]) -> Result<Event> {
    require(name, payload, 1)?;
    let identity = (payload.len() >= 6).then(|| ModuleIdentity {
        transport_rev: payload[1],
        product_id: payload[2],
        major: payload[3],
        minor: payload[4],
        maintenance: payload[5],
    });
    Ok(Event::PowerUp {
        reason: ResetReason::from(payload[0]),
        identity,
    })
}

fn parse_state_change(name: &'static str, payload: &[u8]) -> Result<Event> {
    require(name, payload, 1)?;
    Ok(Event::StateChanged(DeviceState::from(payload[0])))
}

fn parse_announce(name: &'static str, payload: &[u8]) -> Result<Event> {
    require(name, payload, 13)?;
    Ok(Event::DeviceAnnounced {
        src_addr: u16_le(payload, 0),
        nwk_addr: u16_le(payload, 2),
        ieee_addr: ieee_at(name, payload, 4)?,
        capabilities: payload[12],
    })
}

fn parse_leave(name: &'static str, payload: &[u8]) -> Result<Event> {
    require(name, payload, 13)?;
    Ok(Event::DeviceLeft {
        src_addr: u16_le(payload, 0),
        ieee_addr: ieee_at(name, payload, 2)?,
        rejoin: payload[12] != 0,
    })
}

fn parse_active_endpoints(name: &'static str, payload: &[u8]) -> Result<Event> {
    require(name, payload, 6)?;
    let count = usize::from(payload[5]);
    require(name, payload, 6 + count)?;
    Ok(Event::ActiveEndpoints {
        src_addr: u16_le(payload, 0),
        status: payload[2],
        nwk_addr: u16_le(payload, 3),
        endpoints: payload[6..6 + count].to_vec(),
    })
}

fn parse_ack(name: &'static str, payload: &[u8]) -> Result<Event> {
    Ok(Event::Acknowledged {
        name,
        status: payload.first().copied(),
    })
}

fn parse_start_confirm(_name: &'static str, _payload: &[u8]) -> Result<Event> {
    Ok(Event::NetworkStartConfirmed)
}

fn parse_config_written(name: &'static str, payload: &[u8]) -> Result<Event> {
    require(name, payload, 1)?;
    Ok(Event::ConfigurationWritten { status: payload[0] })
}

fn parse_permit_join(name: &'static str, payload: &[u8]) -> Result<Event> {
    require(name, payload, 1)?;
    Ok(Event::PermitJoinConfirmed { status: payload[0] })
}

fn parse_address(name: &'static str, payload: &[u8]) -> Result<Event> {
    Ok(Event::AddressResolved {
        ieee_addr: ieee_at(name, payload, 0)?,
    })
}

fn parse_assoc_count(name: &'static str, payload: &[u8]) -> Result<Event> {
    require(name, payload, 2)?;
    Ok(Event::AssociationCount(u16_le(payload, 0)))
}

fn parse_assoc_found(name: &'static str, payload: &[u8]) -> Result<Event> {
    require(name, payload, 2)?;
    Ok(Event::AssociationFound {
        nwk_addr: u16_le(payload, 0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(class: u8, command: u8, payload: &[u8]) -> Result<Event> {
        DispatchTable::default().route(&Frame::new(class, command, payload.to_vec()))
    }

    #[test]
    fn default_table_has_every_route() {
        let table = DispatchTable::default();
        assert_eq!(table.len(), 15);
        assert_eq!(table.lookup(0x66, 0x05).unwrap().name, "ZB_WRITE_CONFIGURATION");
        assert!(table.lookup(0x61, 0x01).is_none());
        assert!(DispatchTable::empty().is_empty());
    }

    #[test]
    fn reset_indication_with_identity() {
        let event = route(0x41, 0x80, &[0x00, 0x02, 0x01, 0x02, 0x06, 0x03]).unwrap();
        let Event::PowerUp { reason, identity } = event else {
            panic!("expected power-up, got {event:?}");
        };
        assert_eq!(reason, ResetReason::PowerUp);
        let identity = identity.unwrap();
        assert_eq!(identity.product_id, 0x01);
        assert_eq!(identity.version(), "2.6.3");
    }

    #[test]
    fn reset_indication_without_identity() {
        let event = route(0x41, 0x80, &[0x02]).unwrap();
        assert_eq!(
            event,
            Event::PowerUp {
                reason: ResetReason::Watchdog,
                identity: None,
            }
        );
    }

    #[test]
    fn state_change() {
        assert_eq!(
            route(0x45, 0xC0, &[0x09]).unwrap(),
            Event::StateChanged(DeviceState::CoordinatorStarted)
        );
    }

    #[test]
    fn association_count_is_little_endian() {
        assert_eq!(route(0x67, 0x48, &[0x02, 0x01]).unwrap(), Event::AssociationCount(0x0102));
    }

    #[test]
    fn association_found_reads_short_address() {
        assert_eq!(
            route(0x67, 0x49, &[0x34, 0x12, 0xAA, 0xBB]).unwrap(),
            Event::AssociationFound { nwk_addr: 0x1234 }
        );
    }

    #[test]
    fn address_lookup_reads_ieee() {
        let event = route(0x67, 0x41, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        assert_eq!(
            event,
            Event::AddressResolved {
                ieee_addr: IeeeAddr([1, 2, 3, 4, 5, 6, 7, 8]),
            }
        );
    }

    #[test]
    fn active_endpoints_list() {
        let event = route(0x45, 0x85, &[0x00, 0x00, 0x00, 0x34, 0x12, 0x02, 0x01, 0x08]).unwrap();
        assert_eq!(
            event,
            Event::ActiveEndpoints {
                src_addr: 0x0000,
                status: 0x00,
                nwk_addr: 0x1234,
                endpoints: vec![0x01, 0x08],
            }
        );
    }

    #[test]
    fn active_endpoints_truncated_list() {
        let err = route(0x45, 0x85, &[0x00, 0x00, 0x00, 0x34, 0x12, 0x03, 0x01]).unwrap_err();
        assert!(matches!(
            err,
            EngineError::ShortPayload {
                name: "ZDO_ACTIVE_EP_RSP",
                expected: 9,
                actual: 7,
            }
        ));
    }

    #[test]
    fn acknowledgements_keep_route_name() {
        assert_eq!(
            route(0x65, 0x40, &[0x00]).unwrap(),
            Event::Acknowledged {
                name: "ZDO_STARTUP_FROM_APP",
                status: Some(0x00),
            }
        );
        assert_eq!(
            route(0x64, 0x00, &[]).unwrap(),
            Event::Acknowledged {
                name: "AF_REGISTER",
                status: None,
            }
        );
    }

    #[test]
    fn start_confirmation_payload_optional() {
        assert_eq!(route(0x66, 0x00, &[]).unwrap(), Event::NetworkStartConfirmed);
        assert_eq!(route(0x66, 0x00, &[0x00]).unwrap(), Event::NetworkStartConfirmed);
    }

    #[test]
    fn announce_and_leave() {
        let mut announce = vec![0x00, 0x00, 0x34, 0x12];
        announce.extend_from_slice(&[8, 7, 6, 5, 4, 3, 2, 1]);
        announce.push(0x8E);
        let event = route(0x45, 0xC1, &announce).unwrap();
        assert!(matches!(
            event,
            Event::DeviceAnnounced {
                nwk_addr: 0x1234,
                capabilities: 0x8E,
                ..
            }
        ));

        let mut leave = vec![0x34, 0x12];
        leave.extend_from_slice(&[8, 7, 6, 5, 4, 3, 2, 1]);
        leave.extend_from_slice(&[0x00, 0x00, 0x01]);
        let Event::DeviceLeft { ieee_addr, rejoin, .. } = route(0x45, 0xC9, &leave).unwrap() else {
            panic!("expected leave");
        };
        assert_eq!(ieee_addr.to_string(), "0102030405060708");
        assert!(rejoin);
    }

    #[test]
    fn short_payload_rejected() {
        let err = route(0x67, 0x48, &[0x02]).unwrap_err();
        assert!(matches!(
            err,
            EngineError::ShortPayload {
                name: "UTIL_ASSOC_COUNT",
                expected: 2,
                actual: 1,
            }
        ));
        assert!(matches!(
            route(0x66, 0x05, &[]).unwrap_err(),
            EngineError::ShortPayload { .. }
        ));
        assert!(matches!(
            route(0x67, 0x41, &[1, 2, 3]).unwrap_err(),
            EngineError::ShortPayload { expected: 8, .. }
        ));
    }

    #[test]
    fn unknown_command_carries_payload() {
        let err = route(0x61, 0x99, &[0xDE, 0xAD]).unwrap_err();
        let EngineError::UnknownCommand {
            class,
            command,
            payload,
        } = err
        else {
            panic!("expected unknown command");
        };
        assert_eq!((class, command), (0x61, 0x99));
        assert_eq!(payload.as_ref(), &[0xDE, 0xAD]);
    }

    #[test]
    fn routes_can_be_overridden() {
        fn ignore(_: &'static str, _: &[u8]) -> Result<Event> {
            Ok(Event::Acknowledged {
                name: "custom",
                status: None,
            })
        }
        let mut table = DispatchTable::default();
        let previous = table.insert(0x45, 0xC0, "custom", ignore).unwrap();
        assert_eq!(previous.name, "ZDO_STATE_CHANGE_IND");
        let event = table.route(&Frame::new(0x45, 0xC0, vec![])).unwrap();
        assert!(matches!(event, Event::Acknowledged { name: "custom", .. }));
    }
}
