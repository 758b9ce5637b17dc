//! Command type, subsystem and command identifiers.
//!
//! The class byte carries the command type in its top three bits and the
//! subsystem in the low five. These tables are data consumed by the engine;
//! the codec itself never interprets them.

/// Synchronous request (host → module).
pub const TYPE_SREQ: u8 = 0x20;
/// Asynchronous request or indication.
pub const TYPE_AREQ: u8 = 0x40;
/// Synchronous response (module → host).
pub const TYPE_SRSP: u8 = 0x60;

const TYPE_MASK: u8 = 0xE0;
const SUBSYSTEM_MASK: u8 = 0x1F;

pub const SUBSYSTEM_SYS: u8 = 0x01;
pub const SUBSYSTEM_AF: u8 = 0x04;
pub const SUBSYSTEM_ZDO: u8 = 0x05;
/// Simple API (`ZB_*`) subsystem.
pub const SUBSYSTEM_SAPI: u8 = 0x06;
pub const SUBSYSTEM_UTIL: u8 = 0x07;

/// Compose a class byte.
pub const fn class(command_type: u8, subsystem: u8) -> u8 {
    (command_type & TYPE_MASK) | (subsystem & SUBSYSTEM_MASK)
}

/// Command type bits of a class byte.
pub const fn command_type(class: u8) -> u8 {
    class & TYPE_MASK
}

/// Subsystem bits of a class byte.
pub const fn subsystem(class: u8) -> u8 {
    class & SUBSYSTEM_MASK
}

// SYS
pub const SYS_RESET_REQ: u8 = 0x00;
pub const SYS_PING: u8 = 0x01;
pub const SYS_VERSION: u8 = 0x02;
pub const SYS_RESET_IND: u8 = 0x80;

// AF
pub const AF_REGISTER: u8 = 0x00;

// ZDO
pub const ZDO_ACTIVE_EP_REQ: u8 = 0x05;
pub const ZDO_MATCH_DESC_REQ: u8 = 0x06;
pub const ZDO_MSG_CB_REGISTER: u8 = 0x3E;
pub const ZDO_STARTUP_FROM_APP: u8 = 0x40;
pub const ZDO_ACTIVE_EP_RSP: u8 = 0x85;
pub const ZDO_STATE_CHANGE_IND: u8 = 0xC0;
pub const ZDO_END_DEVICE_ANNCE_IND: u8 = 0xC1;
pub const ZDO_LEAVE_IND: u8 = 0xC9;

// SAPI
pub const ZB_START_REQUEST: u8 = 0x00;
pub const ZB_WRITE_CONFIGURATION: u8 = 0x05;
pub const ZB_PERMIT_JOINING_REQUEST: u8 = 0x08;

// UTIL
pub const UTIL_ADDRMGR_NWK_ADDR_LOOKUP: u8 = 0x41;
pub const UTIL_ASSOC_COUNT: u8 = 0x48;
pub const UTIL_ASSOC_FIND_DEVICE: u8 = 0x49;

/// Returns a human-readable name for the command type of a class byte.
pub fn type_name(class: u8) -> &'static str {
    match command_type(class) {
        TYPE_SREQ => "SREQ",
        TYPE_AREQ => "AREQ",
        TYPE_SRSP => "SRSP",
        0x00 => "POLL",
        _ => "RESERVED",
    }
}

/// Returns a human-readable name for the subsystem of a class byte.
pub fn subsystem_name(class: u8) -> &'static str {
    match subsystem(class) {
        0x00 => "RPC_ERROR",
        SUBSYSTEM_SYS => "SYS",
        0x02 => "MAC",
        0x03 => "NWK",
        SUBSYSTEM_AF => "AF",
        SUBSYSTEM_ZDO => "ZDO",
        SUBSYSTEM_SAPI => "SAPI",
        SUBSYSTEM_UTIL => "UTIL",
        0x08 => "DEBUG",
        0x09 => "APP",
        _ => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_composition() {
        assert_eq!(class(TYPE_SREQ, SUBSYSTEM_SAPI), 0x26);
        assert_eq!(class(TYPE_AREQ, SUBSYSTEM_SYS), 0x41);
        assert_eq!(class(TYPE_SRSP, SUBSYSTEM_UTIL), 0x67);
    }

    #[test]
    fn class_decomposition() {
        assert_eq!(command_type(0x45), TYPE_AREQ);
        assert_eq!(subsystem(0x45), SUBSYSTEM_ZDO);
        assert_eq!(type_name(0x66), "SRSP");
        assert_eq!(subsystem_name(0x66), "SAPI");
        assert_eq!(subsystem_name(0x1F), "UNKNOWN");
    }
}
