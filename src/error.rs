//! # Gateway Client Error Handling
//!
//! This module defines the KnxMuxError enum, which represents the different
//! error types that can occur in the knxmux-rs crate, and the ServerError
//! taxonomy for numeric failure codes reported by the gateway.

use thiserror::Error;

/// Represents the different error types that can occur in the gateway client.
///
/// Two families exist: local errors, raised before any I/O and recoverable by
/// the caller, and transport or server errors carried back from the wire.
#[derive(Debug, Error)]
pub enum KnxMuxError {
    /// The session handle is closed; no command was sent.
    #[error("Not connected to a gateway")]
    NotConnected,

    /// An open was attempted on a handle that already holds a connection.
    #[error("Already connected to a gateway")]
    AlreadyConnected,

    /// The connection is dedicated to another request mode (e.g. monitoring).
    #[error("Connection already in use for a different command")]
    WrongUsage,

    /// The byte channel to the gateway could not be established.
    #[error("Unable to establish connection: {0}")]
    ConnectFailed(String),

    /// Indicates an invalid parameter passed to the library.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Indicates an error on the underlying byte channel. Terminal for the
    /// session; the caller must re-establish the connection.
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// The gateway reported a failure code in place of an echoed command byte.
    #[error("Gateway error: {0}")]
    Server(#[from] ServerError),

    /// Indicates a malformed or out-of-range group address.
    #[error("Invalid group address: {0}")]
    InvalidGroupAddress(String),

    /// Indicates an unknown datatype tag was encountered.
    #[error("Unknown datatype tag: {0}")]
    UnknownDataType(u8),

    /// A bus value payload was shorter than its datatype tag requires.
    #[error("Truncated payload: need {expected} bytes, got {actual}")]
    TruncatedPayload { expected: usize, actual: usize },

    /// The supplied value cannot be encoded for the given datatype tag.
    #[error("Invalid value for datatype: {0}")]
    InvalidValue(String),

    /// Indicates a date outside the encodable range (earliest year is 1990).
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// The operation is defined by the protocol but has no implementation.
    #[error("Not supported: {0}")]
    NotSupported(&'static str),

    /// A status record declared more bytes than the reply carries.
    #[error("Truncated status record: need {needed} bytes, {remaining} remaining")]
    TruncatedStatus { needed: usize, remaining: usize },

    /// A status sub-record reported a layout version this client cannot decode.
    #[error("Unsupported {record} status record version {version}")]
    VersionMismatch { record: &'static str, version: u8 },
}

/// Failure codes reported by the gateway in the acknowledgment header.
///
/// Codes 1 through 8 are fixed by the protocol; anything else is carried
/// through as [`ServerError::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ServerError {
    #[error("socket closed")]
    SocketClosed,

    #[error("no sockets available")]
    NoSocketsAvailable,

    #[error("bad request")]
    BadRequest,

    #[error("unknown command")]
    UnknownCommand,

    #[error("timeout")]
    Timeout,

    #[error("unauthorised")]
    Unauthorized,

    #[error("invalid password")]
    InvalidPassword,

    #[error("key exchange error")]
    KeyExchangeError,

    #[error("unknown error {0}")]
    Unknown(u16),
}

impl ServerError {
    /// Maps a numeric code from an acknowledgment header to the taxonomy.
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => ServerError::SocketClosed,
            2 => ServerError::NoSocketsAvailable,
            3 => ServerError::BadRequest,
            4 => ServerError::UnknownCommand,
            5 => ServerError::Timeout,
            6 => ServerError::Unauthorized,
            7 => ServerError::InvalidPassword,
            8 => ServerError::KeyExchangeError,
            other => ServerError::Unknown(other),
        }
    }

    /// The numeric code this error was mapped from.
    pub fn code(&self) -> u16 {
        match self {
            ServerError::SocketClosed => 1,
            ServerError::NoSocketsAvailable => 2,
            ServerError::BadRequest => 3,
            ServerError::UnknownCommand => 4,
            ServerError::Timeout => 5,
            ServerError::Unauthorized => 6,
            ServerError::InvalidPassword => 7,
            ServerError::KeyExchangeError => 8,
            ServerError::Unknown(code) => *code,
        }
    }
}

impl From<std::io::Error> for KnxMuxError {
    fn from(err: std::io::Error) -> Self {
        KnxMuxError::ChannelError(err.to_string())
    }
}
