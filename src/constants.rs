//! Gateway Socket Protocol Constants
//!
//! This module defines the command bytes and limits of the socket protocol
//! spoken by the KNX multiplexing gateway.

/// Default TCP port the gateway's socket server listens on.
pub const GATEWAY_TCP_PORT: u16 = 4390;

/// Size of the fixed acknowledgment header preceding every reply body.
pub const ACK_HEADER_LEN: usize = 3;

/// Maximum length of a client identifier accepted by the gateway.
pub const CLIENT_NAME_MAX_LENGTH: usize = 64;

/// Maximum length of an authentication password accepted by the gateway.
pub const PASSWORD_MAX_LENGTH: usize = 64;

// ----------------------------------------------------------------------------
// Command bytes (each request is command + 16-bit big-endian parameter)
// ----------------------------------------------------------------------------

/// Register the client identifier (handshake, first command on a connection).
pub const CMD_REGISTER: u8 = b'a';

/// Close the connection.
pub const CMD_EXIT: u8 = b'X';

/// Authenticate with username and password.
pub const CMD_AUTH: u8 = b'A';

/// Initiate key exchange. Reserved by the protocol, not implemented.
pub const CMD_KEY_EXCHANGE: u8 = b'K';

/// Read the value of a bus group.
pub const CMD_READ_GROUP: u8 = b'R';

/// Write a value to a bus group.
pub const CMD_WRITE_GROUP: u8 = b'W';

/// Switch the connection into bus monitoring mode.
pub const CMD_MONITOR: u8 = b'M';

/// Query the gateway's operational status.
pub const CMD_STATUS: u8 = b'S';

/// Retrieve the gateway's log level.
pub const CMD_GET_LOG_LEVEL: u8 = b'l';

/// Set the gateway's log level.
pub const CMD_SET_LOG_LEVEL: u8 = b'L';

/// Retrieve the gateway's access block level.
pub const CMD_GET_ACCESS_BLOCK: u8 = b'b';

/// Set the gateway's access block level.
pub const CMD_SET_ACCESS_BLOCK: u8 = b'B';

/// Connect or disconnect the gateway's upstream bus interface link.
pub const CMD_BUS_LINK: u8 = b'C';

/// Forcibly close another client session on the gateway.
pub const CMD_CLOSE_SESSION: u8 = b'c';

// ----------------------------------------------------------------------------
// Parameters of the session force-close command
// ----------------------------------------------------------------------------

/// Force-close target: an EIBnet/IP client session.
pub const SESSION_KIND_BUS_CLIENT: u16 = 1;

/// Force-close target: a socket client session.
pub const SESSION_KIND_SOCKET_CLIENT: u16 = 2;
