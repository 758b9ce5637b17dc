use bytes::{BufMut, Bytes, BytesMut};
use znpcoord_frame::command::*;
use znpcoord_frame::Frame;

/// Broadcast address covering the coordinator and all routers.
pub const ALL_ROUTERS: u16 = 0xFFFC;

/// Association relation range used for the association count.
pub const ASSOC_RELATION_FIRST: u8 = 0x00;
pub const ASSOC_RELATION_LAST: u8 = 0x06;

/// One configuration item written during bring-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWrite {
    pub id: u8,
    pub value: Vec<u8>,
}

impl ConfigWrite {
    pub fn new(id: u8, value: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            value: value.into(),
        }
    }
}

/// Application endpoint registered once the network is up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub endpoint: u8,
    pub profile_id: u16,
    pub device_id: u16,
    pub device_version: u8,
    pub latency: u8,
    pub input_clusters: Vec<u16>,
    pub output_clusters: Vec<u16>,
}

impl Default for EndpointDescriptor {
    /// Endpoint 1, home automation profile, basic cluster in, IAS zone out.
    fn default() -> Self {
        Self {
            endpoint: 0x01,
            profile_id: 0x0104,
            device_id: 0x0000,
            device_version: 0x00,
            latency: 0x00,
            input_clusters: vec![0x0000],
            output_clusters: vec![0x0500],
        }
    }
}

impl EndpointDescriptor {
    fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(
            9 + 2 * (self.input_clusters.len() + self.output_clusters.len()),
        );
        buf.put_u8(self.endpoint);
        buf.put_u16_le(self.profile_id);
        buf.put_u16_le(self.device_id);
        buf.put_u8(self.device_version);
        buf.put_u8(self.latency);
        for clusters in [&self.input_clusters, &self.output_clusters] {
            buf.put_u8(clusters.len() as u8);
            for cluster in clusters.iter() {
                buf.put_u16_le(*cluster);
            }
        }
        buf.freeze()
    }
}

/// A command the engine wants written to the link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub class: u8,
    pub command: u8,
    pub payload: Bytes,
    pub name: &'static str,
}

impl Request {
    pub fn new(class: u8, command: u8, name: &'static str, payload: impl Into<Bytes>) -> Self {
        Self {
            class,
            command,
            payload: payload.into(),
            name,
        }
    }

    /// Soft reset of the module.
    pub fn reset() -> Self {
        Self::new(
            class(TYPE_AREQ, SUBSYSTEM_SYS),
            SYS_RESET_REQ,
            "SYS_RESET_REQ",
            vec![0x00],
        )
    }

    pub fn write_configuration(write: &ConfigWrite) -> Self {
        let mut payload = Vec::with_capacity(2 + write.value.len());
        payload.push(write.id);
        payload.push(write.value.len() as u8);
        payload.extend_from_slice(&write.value);
        Self::new(
            class(TYPE_SREQ, SUBSYSTEM_SAPI),
            ZB_WRITE_CONFIGURATION,
            "ZB_WRITE_CONFIGURATION",
            payload,
        )
    }

    pub fn start_network() -> Self {
        Self::new(
            class(TYPE_SREQ, SUBSYSTEM_SAPI),
            ZB_START_REQUEST,
            "ZB_START_REQUEST",
            Bytes::new(),
        )
    }

    pub fn register_endpoint(endpoint: &EndpointDescriptor) -> Self {
        Self::new(
            class(TYPE_SREQ, SUBSYSTEM_AF),
            AF_REGISTER,
            "AF_REGISTER",
            endpoint.encode(),
        )
    }

    /// Start the ZDO stack immediately (zero start delay).
    pub fn startup_from_app() -> Self {
        Self::new(
            class(TYPE_SREQ, SUBSYSTEM_ZDO),
            ZDO_STARTUP_FROM_APP,
            "ZDO_STARTUP_FROM_APP",
            vec![0x00, 0x00],
        )
    }

    /// Ask the module to forward ZDO messages for `cluster_id`.
    pub fn register_callback(cluster_id: u16) -> Self {
        Self::new(
            class(TYPE_SREQ, SUBSYSTEM_ZDO),
            ZDO_MSG_CB_REGISTER,
            "ZDO_MSG_CB_REGISTER",
            cluster_id.to_le_bytes().to_vec(),
        )
    }

    /// Open the join window on all routers for `duration` seconds.
    pub fn permit_joining(duration: u8) -> Self {
        let [lo, hi] = ALL_ROUTERS.to_le_bytes();
        Self::new(
            class(TYPE_SREQ, SUBSYSTEM_SAPI),
            ZB_PERMIT_JOINING_REQUEST,
            "ZB_PERMIT_JOINING_REQUEST",
            vec![lo, hi, duration],
        )
    }

    pub fn association_count() -> Self {
        Self::new(
            class(TYPE_SREQ, SUBSYSTEM_UTIL),
            UTIL_ASSOC_COUNT,
            "UTIL_ASSOC_COUNT",
            vec![ASSOC_RELATION_FIRST, ASSOC_RELATION_LAST],
        )
    }

    pub fn association_find(index: u8) -> Self {
        Self::new(
            class(TYPE_SREQ, SUBSYSTEM_UTIL),
            UTIL_ASSOC_FIND_DEVICE,
            "UTIL_ASSOC_FIND_DEVICE",
            vec![index],
        )
    }

    /// Resolve the extended address of `nwk_addr`.
    pub fn address_lookup(nwk_addr: u16) -> Self {
        Self::new(
            class(TYPE_SREQ, SUBSYSTEM_UTIL),
            UTIL_ADDRMGR_NWK_ADDR_LOOKUP,
            "UTIL_ADDRMGR_NWK_ADDR_LOOKUP",
            nwk_addr.to_le_bytes().to_vec(),
        )
    }

    /// Query the active endpoints of `nwk_addr`, sent to that same peer.
    pub fn active_endpoints(nwk_addr: u16) -> Self {
        let [lo, hi] = nwk_addr.to_le_bytes();
        Self::new(
            class(TYPE_SREQ, SUBSYSTEM_ZDO),
            ZDO_ACTIVE_EP_REQ,
            "ZDO_ACTIVE_EP_REQ",
            vec![lo, hi, lo, hi],
        )
    }

    pub fn to_frame(&self) -> Frame {
        Frame::new(self.class, self.command, self.payload.clone())
    }
}
