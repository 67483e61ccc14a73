//! # knxmux-rs - A Rust Client for KNX Multiplexing Gateways
//!
//! The knxmux-rs crate provides a Rust-based client for multiplexing
//! gateways that bridge a KNX building-automation bus to IP and expose a
//! simple length-prefixed socket protocol, allowing multiple applications
//! to share one bus connection.
//!
//! ## Features
//!
//! - Connect to a gateway over TCP and register a client identifier
//! - Read and write bus group values through the gateway
//! - Encode and decode typed bus values for all 15 datatype tags
//! - Monitor bus traffic for a group address mask
//! - Query the gateway's live status, decoding every historical layout
//!   version of its nested status records
//! - Management commands: log level, access block, bus link control,
//!   forced session close
//! - Support for logging and error handling
//!
//! ## Usage
//!
//! To use the knxmux-rs crate in your Rust project, add the following to
//! your Cargo.toml file:
//!
//! ```toml
//! [dependencies]
//! knxmux-rs = "1.0"
//! ```
//!
//! Then, in your Rust code, you can import the necessary modules and
//! functions:
//!
//! ```rust
//! use knxmux_rs::{
//!     connect, disconnect, read_group, write_group, get_status,
//!     GroupAddress, DataType, BusValue, KnxMuxError, init_logger,
//! };
//! ```

pub mod codec;
pub mod constants;
pub mod error;
pub mod logging;
pub mod session;
pub mod status;

pub use crate::error::{KnxMuxError, ServerError};
pub use crate::logging::{init_logger, log_info};

// Core protocol types
pub use codec::{decode, encode, BusValue, DataType, GroupAddress, RawFrame, ValueKind};
pub use session::{ByteChannel, GatewayHandle, SessionKind};
pub use status::{dotted_quad, parse_status, StatusSnapshot};

use tokio::net::TcpStream;

/// Connect to a gateway via TCP and register the client identifier.
///
/// # Arguments
/// * `host` - Gateway host name or address
/// * `port` - Gateway socket server port (4390 by default)
/// * `identifier` - Client name shown in the gateway's status listing
///
/// # Returns
/// * `Ok(GatewayHandle)` - Open session handle for communication
/// * `Err(KnxMuxError)` - Connection or registration failed
pub async fn connect(
    host: &str,
    port: u16,
    identifier: &str,
) -> Result<GatewayHandle<TcpStream>, KnxMuxError> {
    GatewayHandle::connect_to(host, port, identifier).await
}

/// Disconnect from the gateway.
///
/// # Arguments
/// * `handle` - Session handle to close
///
/// # Returns
/// * `Ok(())` - Successfully disconnected
/// * `Err(KnxMuxError)` - Handle was already closed or the farewell failed
pub async fn disconnect<C: ByteChannel>(handle: &mut GatewayHandle<C>) -> Result<(), KnxMuxError> {
    handle.close().await
}

/// Read the raw value of a bus group through the gateway.
///
/// # Arguments
/// * `handle` - Open session handle
/// * `address` - Bus group to read
///
/// # Returns
/// * `Ok(Vec<u8>)` - Raw payload; decode it with [`codec::decode`]
/// * `Err(KnxMuxError)` - Request failed
pub async fn read_group<C: ByteChannel>(
    handle: &mut GatewayHandle<C>,
    address: GroupAddress,
) -> Result<Vec<u8>, KnxMuxError> {
    handle.read_group(address).await
}

/// Write an encoded value to a bus group through the gateway.
///
/// # Arguments
/// * `handle` - Open session handle
/// * `address` - Bus group to write
/// * `frame` - Encoded value, as produced by [`codec::encode`]
///
/// # Returns
/// * `Ok(())` - Value accepted by the gateway
/// * `Err(KnxMuxError)` - Request failed
pub async fn write_group<C: ByteChannel>(
    handle: &mut GatewayHandle<C>,
    address: GroupAddress,
    frame: &RawFrame,
) -> Result<(), KnxMuxError> {
    handle.write_group(address, frame).await
}

/// Query the gateway's operational status.
///
/// # Arguments
/// * `handle` - Open session handle
///
/// # Returns
/// * `Ok(StatusSnapshot)` - Decoded status records
/// * `Err(KnxMuxError)` - Request or decoding failed
pub async fn get_status<C: ByteChannel>(
    handle: &mut GatewayHandle<C>,
) -> Result<StatusSnapshot, KnxMuxError> {
    handle.status().await
}
