//! # Versioned Status Sub-Records
//!
//! A status reply nests one sub-record per gateway subsystem, each framed as
//! a 16-bit declared length and an 8-bit layout version followed by the
//! record's fixed fields. The subsystems version independently: an old
//! gateway may report layout 1 for one record and layout 3 for another in
//! the same reply, so every historical combination decodes here.
//!
//! The declared length covers the 3-byte record header and the fixed fields
//! only. Peer tables follow outside it, their entry count taken from the
//! fixed fields. Unknown trailing bytes inside a record's fixed area are
//! skipped, which is how newer gateways stay readable by older clients.

use crate::error::KnxMuxError;
use crate::status::cursor::ByteCursor;
use serde::{Deserialize, Serialize};

/// Generic gateway state: software version, log level, process identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommonRecord {
    V1(CommonV1),
    V2(CommonV2),
}

/// Layout 1 carries the software version as two numeric components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonV1 {
    pub version_major: u8,
    pub version_minor: u8,
    pub log_level: u16,
    pub uptime_secs: u32,
    pub uid: u16,
    pub gid: u16,
    pub daemon: bool,
}

/// Layout 2 replaced the numeric pair with a free-form version string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonV2 {
    pub version: String,
    pub log_level: u16,
    pub uptime_secs: u32,
    pub uid: u16,
    pub gid: u16,
    pub daemon: bool,
}

impl CommonRecord {
    /// Server software version rendered as text, whatever the layout.
    pub fn version_string(&self) -> String {
        match self {
            CommonRecord::V1(v1) => format!("{}.{}", v1.version_major, v1.version_minor),
            CommonRecord::V2(v2) => v2.version.clone(),
        }
    }

    pub fn log_level(&self) -> u16 {
        match self {
            CommonRecord::V1(v1) => v1.log_level,
            CommonRecord::V2(v2) => v2.log_level,
        }
    }

    pub fn uptime_secs(&self) -> u32 {
        match self {
            CommonRecord::V1(v1) => v1.uptime_secs,
            CommonRecord::V2(v2) => v2.uptime_secs,
        }
    }
}

/// Request counters shared by every bus-client layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusClientCounters {
    pub connected: bool,
    pub uptime_secs: u32,
    pub session_received: u32,
    pub session_sent: u32,
    pub total_received: u32,
    pub total_sent: u32,
    pub queue_len: u16,
    pub missed_heartbeats: u16,
}

/// Upstream bus interface coordinates, reported from layout 3 on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusClientTarget {
    pub name: Option<String>,
    pub ip: u32,
    pub port: u16,
    pub source_ip: u32,
}

/// State of the gateway's own connection to the upstream bus interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BusClientRecord {
    V1(BusClientCounters),
    /// Layout 2 appended a source address field the gateway of that
    /// generation sent garbled; it is skipped on decode.
    V2(BusClientCounters),
    V3 {
        counters: BusClientCounters,
        target: BusClientTarget,
    },
    V4 {
        counters: BusClientCounters,
        target: BusClientTarget,
        /// 2 when the gateway runs in loopback mode without a bus link.
        loopback: u8,
    },
}

impl BusClientRecord {
    pub fn counters(&self) -> &BusClientCounters {
        match self {
            BusClientRecord::V1(c) | BusClientRecord::V2(c) => c,
            BusClientRecord::V3 { counters, .. } | BusClientRecord::V4 { counters, .. } => counters,
        }
    }
}

/// Fixed fields shared by every bus-server layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusServerCounters {
    pub active: bool,
    pub port: u16,
    pub max_peers: u8,
    pub received: u32,
    pub sent: u32,
    pub queue_len: u16,
}

/// One connected EIBnet/IP client of the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusServerPeer {
    /// Unique connection id, assigned from layout 4 on.
    pub conn_id: Option<u32>,
    pub ip: u32,
    pub port: u16,
    pub received: u32,
    pub sent: u32,
    pub queue_len: u16,
    /// Gateway-side address of the link, reported from layout 2 on.
    pub source_ip: Option<u32>,
}

/// State of the gateway's EIBnet/IP server side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BusServerRecord {
    V1 {
        counters: BusServerCounters,
        peers: Vec<BusServerPeer>,
    },
    V2 {
        counters: BusServerCounters,
        peers: Vec<BusServerPeer>,
    },
    V3 {
        counters: BusServerCounters,
        peers: Vec<BusServerPeer>,
    },
    V4 {
        counters: BusServerCounters,
        default_level: u16,
        access_block: u16,
        peers: Vec<BusServerPeer>,
    },
}

impl BusServerRecord {
    pub fn peers(&self) -> &[BusServerPeer] {
        match self {
            BusServerRecord::V1 { peers, .. }
            | BusServerRecord::V2 { peers, .. }
            | BusServerRecord::V3 { peers, .. }
            | BusServerRecord::V4 { peers, .. } => peers,
        }
    }
}

/// Fixed fields shared by every socket-server layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketServerCounters {
    pub tcp_active: bool,
    pub pipe_active: bool,
    pub port: u16,
    pub pipe_path: String,
    pub max_peers: u8,
    pub received: u32,
    pub sent: u32,
    pub queue_len: u16,
}

/// One connected socket client of the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketPeer {
    /// Unique connection id, assigned from layout 5 on.
    pub conn_id: Option<u32>,
    pub ip: u32,
    pub port: u16,
    pub received: u32,
    pub sent: u32,
    /// Client identifier, reported from layout 2 on.
    pub identifier: Option<String>,
    /// Authenticated user, reported from layout 4 on.
    pub user: Option<String>,
}

/// State of the socket server this client itself is connected to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SocketServerRecord {
    V1 {
        counters: SocketServerCounters,
        peers: Vec<SocketPeer>,
    },
    V2 {
        counters: SocketServerCounters,
        peers: Vec<SocketPeer>,
    },
    V3 {
        counters: SocketServerCounters,
        authentication: bool,
        peers: Vec<SocketPeer>,
    },
    V4 {
        counters: SocketServerCounters,
        authentication: bool,
        peers: Vec<SocketPeer>,
    },
    V5 {
        counters: SocketServerCounters,
        authentication: bool,
        peers: Vec<SocketPeer>,
    },
}

impl SocketServerRecord {
    pub fn peers(&self) -> &[SocketPeer] {
        match self {
            SocketServerRecord::V1 { peers, .. }
            | SocketServerRecord::V2 { peers, .. }
            | SocketServerRecord::V3 { peers, .. }
            | SocketServerRecord::V4 { peers, .. }
            | SocketServerRecord::V5 { peers, .. } => peers,
        }
    }
}

/// One connected client of the legacy bridge-compatible server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgePeer {
    pub conn_id: u32,
    pub ip: u32,
    pub port: u16,
    pub received: u32,
    pub sent: u32,
}

/// State of the legacy bridge-compatible server, present from outer
/// status version 2 on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BridgeServerRecord {
    V1 {
        active: bool,
        port: u16,
        max_peers: u8,
        received: u32,
        sent: u32,
        queue_len: u16,
        peers: Vec<BridgePeer>,
    },
}

/// Reads a sub-record header and hands back its layout version together
/// with a cursor over the fixed fields the declared length covers.
fn record_body<'a>(
    cursor: &mut ByteCursor<'a>,
    record: &'static str,
) -> Result<(u8, ByteCursor<'a>), KnxMuxError> {
    let declared = cursor.take_u16()? as usize;
    if declared < 3 {
        return Err(KnxMuxError::TruncatedStatus {
            needed: 3,
            remaining: declared,
        });
    }
    let version = cursor.take_u8()?;
    let body = cursor.take_bytes(declared - 3)?;
    crate::logging::log_debug(&format!(
        "status record {record}: layout {version}, {} fixed bytes",
        body.len()
    ));
    Ok((version, ByteCursor::new(body)))
}

pub(crate) fn parse_common(cursor: &mut ByteCursor<'_>) -> Result<CommonRecord, KnxMuxError> {
    let (version, mut body) = record_body(cursor, "common")?;
    match version {
        1 => {
            let version_major = body.take_u8()?;
            let version_minor = body.take_u8()?;
            Ok(CommonRecord::V1(CommonV1 {
                version_major,
                version_minor,
                log_level: body.take_u16()?,
                uptime_secs: body.take_u32()?,
                uid: body.take_u16()?,
                gid: body.take_u16()?,
                daemon: body.take_u8()? != 0,
            }))
        }
        2 => {
            let server_version = body.take_cstring()?;
            Ok(CommonRecord::V2(CommonV2 {
                version: server_version,
                log_level: body.take_u16()?,
                uptime_secs: body.take_u32()?,
                uid: body.take_u16()?,
                gid: body.take_u16()?,
                daemon: body.take_u8()? != 0,
            }))
        }
        version => Err(KnxMuxError::VersionMismatch {
            record: "common",
            version,
        }),
    }
}

pub(crate) fn parse_bus_client(cursor: &mut ByteCursor<'_>) -> Result<BusClientRecord, KnxMuxError> {
    let (version, mut body) = record_body(cursor, "bus client")?;
    if !(1..=4).contains(&version) {
        return Err(KnxMuxError::VersionMismatch {
            record: "bus client",
            version,
        });
    }
    let counters = BusClientCounters {
        connected: body.take_u8()? != 0,
        uptime_secs: body.take_u32()?,
        session_received: body.take_u32()?,
        session_sent: body.take_u32()?,
        total_received: body.take_u32()?,
        total_sent: body.take_u32()?,
        queue_len: body.take_u16()?,
        missed_heartbeats: body.take_u16()?,
    };
    match version {
        1 => Ok(BusClientRecord::V1(counters)),
        2 => Ok(BusClientRecord::V2(counters)),
        _ => {
            let target = BusClientTarget {
                name: body.take_nstring()?,
                ip: body.take_u32()?,
                port: body.take_u16()?,
                source_ip: body.take_u32()?,
            };
            if version == 3 {
                Ok(BusClientRecord::V3 { counters, target })
            } else {
                let loopback = body.take_u8()?;
                Ok(BusClientRecord::V4 {
                    counters,
                    target,
                    loopback,
                })
            }
        }
    }
}

pub(crate) fn parse_bus_server(cursor: &mut ByteCursor<'_>) -> Result<BusServerRecord, KnxMuxError> {
    let (version, mut body) = record_body(cursor, "bus server")?;
    if !(1..=4).contains(&version) {
        return Err(KnxMuxError::VersionMismatch {
            record: "bus server",
            version,
        });
    }
    let active = body.take_u8()? != 0;
    let port = body.take_u16()?;
    let max_peers = body.take_u8()?;
    let peer_count = body.take_u8()?;
    let counters = BusServerCounters {
        active,
        port,
        max_peers,
        received: body.take_u32()?,
        sent: body.take_u32()?,
        queue_len: body.take_u16()?,
    };
    let (default_level, access_block) = if version == 4 {
        (body.take_u16()?, body.take_u16()?)
    } else {
        (0, 0)
    };

    // Peer entries follow the declared fixed area on the outer stream.
    let mut peers = Vec::with_capacity(peer_count as usize);
    for _ in 0..peer_count {
        let conn_id = if version >= 4 {
            Some(cursor.take_u32()?)
        } else {
            None
        };
        let ip = cursor.take_u32()?;
        let peer_port = cursor.take_u16()?;
        let received = cursor.take_u32()?;
        let sent = cursor.take_u32()?;
        let queue_len = cursor.take_u16()?;
        let source_ip = if version >= 2 {
            Some(cursor.take_u32()?)
        } else {
            None
        };
        peers.push(BusServerPeer {
            conn_id,
            ip,
            port: peer_port,
            received,
            sent,
            queue_len,
            source_ip,
        });
    }

    Ok(match version {
        1 => BusServerRecord::V1 { counters, peers },
        2 => BusServerRecord::V2 { counters, peers },
        3 => BusServerRecord::V3 { counters, peers },
        _ => BusServerRecord::V4 {
            counters,
            default_level,
            access_block,
            peers,
        },
    })
}

pub(crate) fn parse_socket_server(
    cursor: &mut ByteCursor<'_>,
) -> Result<SocketServerRecord, KnxMuxError> {
    let (version, mut body) = record_body(cursor, "socket server")?;
    if !(1..=5).contains(&version) {
        return Err(KnxMuxError::VersionMismatch {
            record: "socket server",
            version,
        });
    }
    let tcp_active = body.take_u8()? != 0;
    let pipe_active = body.take_u8()? != 0;
    let port = body.take_u16()?;
    let pipe_path = body.take_cstring()?;
    let max_peers = body.take_u8()?;
    let peer_count = body.take_u8()?;
    let counters = SocketServerCounters {
        tcp_active,
        pipe_active,
        port,
        pipe_path,
        max_peers,
        received: body.take_u32()?,
        sent: body.take_u32()?,
        queue_len: body.take_u16()?,
    };
    let authentication = match version {
        1 => false,
        2 => {
            body.skip(2)?;
            false
        }
        _ => body.take_u8()? != 0,
    };
    // The remainder of the fixed area is the peer-table byte count; peers
    // are walked entry by entry instead of trusting the aggregate.

    let mut peers = Vec::with_capacity(peer_count as usize);
    for _ in 0..peer_count {
        let conn_id = if version >= 5 {
            Some(cursor.take_u32()?)
        } else {
            None
        };
        let ip = cursor.take_u32()?;
        let peer_port = cursor.take_u16()?;
        let received = cursor.take_u32()?;
        let sent = cursor.take_u32()?;
        let identifier = if version >= 2 {
            cursor.take_nstring()?
        } else {
            None
        };
        let user = if version >= 4 { cursor.take_nstring()? } else { None };
        peers.push(SocketPeer {
            conn_id,
            ip,
            port: peer_port,
            received,
            sent,
            identifier,
            user,
        });
    }

    Ok(match version {
        1 => SocketServerRecord::V1 { counters, peers },
        2 => SocketServerRecord::V2 { counters, peers },
        3 => SocketServerRecord::V3 {
            counters,
            authentication,
            peers,
        },
        4 => SocketServerRecord::V4 {
            counters,
            authentication,
            peers,
        },
        _ => SocketServerRecord::V5 {
            counters,
            authentication,
            peers,
        },
    })
}

pub(crate) fn parse_bridge_server(
    cursor: &mut ByteCursor<'_>,
) -> Result<BridgeServerRecord, KnxMuxError> {
    let (version, mut body) = record_body(cursor, "bridge server")?;
    if version != 1 {
        return Err(KnxMuxError::VersionMismatch {
            record: "bridge server",
            version,
        });
    }
    let active = body.take_u8()? != 0;
    let port = body.take_u16()?;
    let max_peers = body.take_u8()?;
    let peer_count = body.take_u8()?;
    let received = body.take_u32()?;
    let sent = body.take_u32()?;
    let queue_len = body.take_u16()?;

    let mut peers = Vec::with_capacity(peer_count as usize);
    for _ in 0..peer_count {
        peers.push(BridgePeer {
            conn_id: cursor.take_u32()?,
            ip: cursor.take_u32()?,
            port: cursor.take_u16()?,
            received: cursor.take_u32()?,
            sent: cursor.take_u32()?,
        });
    }

    Ok(BridgeServerRecord::V1 {
        active,
        port,
        max_peers,
        received,
        sent,
        queue_len,
        peers,
    })
}
