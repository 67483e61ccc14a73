//! The status module decodes the gateway's operational status reply: a
//! protocol version byte followed by independently versioned sub-records
//! for each gateway subsystem.
//!
//! The session layer buffers the complete reply body before parsing, so the
//! channel always sits at a clean frame boundary afterwards, whatever the
//! parse outcome.

pub mod cursor;
pub mod records;

use crate::error::KnxMuxError;
use cursor::ByteCursor;
use records::{
    parse_bridge_server, parse_bus_client, parse_bus_server, parse_common, parse_socket_server,
};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

pub use records::{
    BridgePeer, BridgeServerRecord, BusClientCounters, BusClientRecord, BusClientTarget,
    BusServerCounters, BusServerPeer, BusServerRecord, CommonRecord, CommonV1, CommonV2,
    SocketPeer, SocketServerCounters, SocketServerRecord,
};

/// A complete decoded status reply. Built fresh per query, never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Outer status protocol version (1 or 2).
    pub version: u8,
    pub common: CommonRecord,
    pub client: BusClientRecord,
    pub server: BusServerRecord,
    pub socket: SocketServerRecord,
    /// Present only when the outer version is 2 or later.
    pub bridge: Option<BridgeServerRecord>,
}

/// Decodes a buffered status reply body.
///
/// The four mandatory sub-records are read in fixed order; the bridge
/// record follows only for outer version 2. An unrecognized outer or
/// sub-record version fails the query with `VersionMismatch`; the session
/// stays usable because the caller already consumed the declared body.
pub fn parse_status(body: &[u8]) -> Result<StatusSnapshot, KnxMuxError> {
    let mut cursor = ByteCursor::new(body);
    let version = cursor.take_u8()?;
    if !(1..=2).contains(&version) {
        return Err(KnxMuxError::VersionMismatch {
            record: "status",
            version,
        });
    }

    let common = parse_common(&mut cursor)?;
    let client = parse_bus_client(&mut cursor)?;
    let server = parse_bus_server(&mut cursor)?;
    let socket = parse_socket_server(&mut cursor)?;
    let bridge = if version >= 2 {
        Some(parse_bridge_server(&mut cursor)?)
    } else {
        None
    };

    if !cursor.is_empty() {
        // Newer gateways may append records this layout does not know.
        crate::logging::log_debug(&format!(
            "status reply carries {} unparsed trailing bytes",
            cursor.remaining()
        ));
    }

    Ok(StatusSnapshot {
        version,
        common,
        client,
        server,
        socket,
        bridge,
    })
}

/// Renders a packed status IP field in dotted-quad form.
///
/// The wire parser keeps addresses packed; this is the presentation helper
/// for callers that display them.
pub fn dotted_quad(ip: u32) -> String {
    Ipv4Addr::from(ip).to_string()
}
