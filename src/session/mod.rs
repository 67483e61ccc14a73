//! # Gateway Session Client
//!
//! This module implements the synchronous request/reply session with the
//! gateway's socket server: the register handshake, group reads and writes,
//! bus monitoring, the status query and the management commands.
//!
//! Every request is a command byte plus a 16-bit big-endian parameter,
//! optionally followed by a payload. Every reply starts with a fixed 3-byte
//! acknowledgment header whose status byte echoes the command on success;
//! otherwise its code field carries a gateway error. The protocol has no
//! pipelining and no timeouts: one request is in flight at a time, and a
//! stalled peer blocks the caller until the channel is torn down.

pub mod mock;
pub mod tcp;

use crate::codec::{GroupAddress, RawFrame};
use crate::constants::{
    ACK_HEADER_LEN, CLIENT_NAME_MAX_LENGTH, CMD_AUTH, CMD_BUS_LINK, CMD_CLOSE_SESSION, CMD_EXIT,
    CMD_GET_ACCESS_BLOCK, CMD_GET_LOG_LEVEL, CMD_MONITOR, CMD_READ_GROUP, CMD_REGISTER,
    CMD_SET_ACCESS_BLOCK, CMD_SET_LOG_LEVEL, CMD_STATUS, CMD_WRITE_GROUP, PASSWORD_MAX_LENGTH,
    SESSION_KIND_BUS_CLIENT, SESSION_KIND_SOCKET_CLIENT,
};
use crate::error::{KnxMuxError, ServerError};
use crate::status::{parse_status, StatusSnapshot};
use async_trait::async_trait;
use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// The byte channel the session runs over.
///
/// The gateway protocol needs exactly two primitives: write a buffer fully
/// and read an exact number of bytes. Any ordered reliable stream qualifies;
/// the blanket impl below covers tokio streams and the test mock alike.
#[async_trait]
pub trait ByteChannel: Send {
    async fn send_all(&mut self, buf: &[u8]) -> std::io::Result<()>;
    async fn recv_exact(&mut self, buf: &mut [u8]) -> std::io::Result<()>;
}

#[async_trait]
impl<T> ByteChannel for T
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.write_all(buf).await?;
        self.flush().await
    }

    async fn recv_exact(&mut self, buf: &mut [u8]) -> std::io::Result<()> {
        self.read_exact(buf).await.map(|_| ())
    }
}

/// What the open connection is currently dedicated to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkMode {
    /// Regular request/reply commands.
    Command,
    /// Bus monitoring; the gateway pushes event frames until close.
    Monitor,
}

enum SessionState<C> {
    Closed,
    Open { channel: C, mode: LinkMode },
}

/// Target of a forced session close on the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    BusClient,
    SocketClient,
}

impl SessionKind {
    fn code(&self) -> u16 {
        match self {
            SessionKind::BusClient => SESSION_KIND_BUS_CLIENT,
            SessionKind::SocketClient => SESSION_KIND_SOCKET_CLIENT,
        }
    }
}

/// A session with the gateway's socket server.
///
/// The handle is explicitly two-state: `Closed` holds no channel at all, so
/// no command can touch the wire before a successful handshake. Methods take
/// `&mut self`; a handle must not be shared between call sites without
/// external serialization, matching the protocol's single-request rule.
pub struct GatewayHandle<C> {
    state: SessionState<C>,
    identifier: String,
    peer: Option<String>,
}

impl<C: ByteChannel> GatewayHandle<C> {
    /// Creates a closed handle carrying the client identifier the gateway
    /// will display for this session.
    pub fn new(identifier: &str) -> Self {
        GatewayHandle {
            state: SessionState::Closed,
            identifier: identifier.to_string(),
            peer: None,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, SessionState::Open { .. })
    }

    /// The client identifier registered (or to be registered) with the gateway.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// `host:port` of the connected gateway, if the session was opened via TCP.
    pub fn peer(&self) -> Option<&str> {
        self.peer.as_deref()
    }

    /// Runs the register handshake over an established byte channel and
    /// makes the handle usable.
    ///
    /// Fails with `AlreadyConnected` if the handle is open, and with the
    /// mapped gateway error if the registration is refused — in which case
    /// the channel is dropped and the handle stays closed.
    pub async fn open_with(&mut self, mut channel: C) -> Result<(), KnxMuxError> {
        if self.is_open() {
            return Err(KnxMuxError::AlreadyConnected);
        }
        if self.identifier.is_empty() || self.identifier.len() > CLIENT_NAME_MAX_LENGTH {
            return Err(KnxMuxError::InvalidParameter(format!(
                "client identifier must be 1-{CLIENT_NAME_MAX_LENGTH} bytes"
            )));
        }

        let mut request = BytesMut::with_capacity(3 + self.identifier.len());
        request.put_u8(CMD_REGISTER);
        request.put_u16(self.identifier.len() as u16);
        request.put_slice(self.identifier.as_bytes());
        channel.send_all(&request).await?;

        let (status, code) = read_ack(&mut channel).await?;
        if status != CMD_REGISTER {
            crate::logging::log_error(&format!(
                "gateway refused client registration with code {code}"
            ));
            return Err(ServerError::from_code(code).into());
        }

        self.state = SessionState::Open {
            channel,
            mode: LinkMode::Command,
        };
        Ok(())
    }

    /// Closes the session: sends the exit command, discards its ack and
    /// releases the channel. The channel is released even if the farewell
    /// itself fails on the wire.
    pub async fn close(&mut self) -> Result<(), KnxMuxError> {
        match std::mem::replace(&mut self.state, SessionState::Closed) {
            SessionState::Closed => Err(KnxMuxError::NotConnected),
            SessionState::Open { mut channel, .. } => {
                self.peer = None;
                let mut request = BytesMut::with_capacity(3);
                request.put_u8(CMD_EXIT);
                request.put_u16(0);
                channel.send_all(&request).await?;
                let mut ack = [0u8; ACK_HEADER_LEN];
                channel.recv_exact(&mut ack).await?;
                Ok(())
            }
        }
    }

    /// Authenticates the session with a username and password.
    ///
    /// Both travel in the clear as NUL-terminated strings; the protocol
    /// reserves an encrypted path behind the key-exchange command, which
    /// remains unimplemented.
    pub async fn authenticate(&mut self, user: &str, password: &str) -> Result<(), KnxMuxError> {
        if user.len() > CLIENT_NAME_MAX_LENGTH || password.len() > PASSWORD_MAX_LENGTH {
            return Err(KnxMuxError::InvalidParameter(
                "username or password too long".into(),
            ));
        }
        let mut payload = Vec::with_capacity(user.len() + password.len() + 2);
        payload.extend_from_slice(user.as_bytes());
        payload.push(0);
        payload.extend_from_slice(password.as_bytes());
        payload.push(0);
        let length = payload.len() as u16;
        self.transact(CMD_AUTH, length, &payload).await?;
        Ok(())
    }

    /// Reads the current value of a bus group.
    ///
    /// Returns the raw payload bytes; interpret them with
    /// [`crate::codec::decode`] and the group's datatype tag.
    pub async fn read_group(&mut self, address: GroupAddress) -> Result<Vec<u8>, KnxMuxError> {
        let length = self.transact(CMD_READ_GROUP, address.raw(), &[]).await?;
        self.read_body(length as usize).await
    }

    /// Writes an encoded value to a bus group.
    pub async fn write_group(
        &mut self,
        address: GroupAddress,
        frame: &RawFrame,
    ) -> Result<(), KnxMuxError> {
        self.transact(CMD_WRITE_GROUP, address.raw(), &frame.to_wire())
            .await?;
        Ok(())
    }

    /// Receives the next bus event for the monitored address mask.
    ///
    /// The first call dedicates the connection to monitoring; later calls
    /// only wait for the next event. The returned bytes are the complete
    /// bus frame. While monitoring, every other command fails with
    /// `WrongUsage`; only `close` remains available.
    pub async fn monitor(&mut self, mask: GroupAddress) -> Result<Vec<u8>, KnxMuxError> {
        let (channel, mode) = match &mut self.state {
            SessionState::Closed => return Err(KnxMuxError::NotConnected),
            SessionState::Open { channel, mode } => (channel, mode),
        };
        if *mode == LinkMode::Command {
            let mut request = BytesMut::with_capacity(3);
            request.put_u8(CMD_MONITOR);
            request.put_u16(mask.raw());
            channel.send_all(&request).await?;
            *mode = LinkMode::Monitor;
        }

        let (status, code) = read_ack(channel).await?;
        if status != CMD_MONITOR {
            return Err(ServerError::from_code(code).into());
        }
        self.read_body(code as usize).await
    }

    /// Queries the gateway's operational status.
    ///
    /// The complete reply body is buffered before decoding, so the channel
    /// sits at a clean frame boundary afterwards even when a sub-record
    /// version is unsupported — the session stays usable for other commands.
    pub async fn status(&mut self) -> Result<StatusSnapshot, KnxMuxError> {
        let length = self.transact(CMD_STATUS, 0, &[]).await?;
        let body = self.read_body(length as usize).await?;
        parse_status(&body)
    }

    /// Retrieves the gateway's log level.
    pub async fn log_level(&mut self) -> Result<u16, KnxMuxError> {
        self.transact(CMD_GET_LOG_LEVEL, 0, &[]).await
    }

    /// Sets the gateway's log level; returns the level now in effect.
    pub async fn set_log_level(&mut self, level: u16) -> Result<u16, KnxMuxError> {
        self.transact(CMD_SET_LOG_LEVEL, level, &[]).await
    }

    /// Retrieves the gateway's access block level.
    pub async fn access_block(&mut self) -> Result<u16, KnxMuxError> {
        self.transact(CMD_GET_ACCESS_BLOCK, 0, &[]).await
    }

    /// Sets the gateway's access block level; returns the level now in effect.
    pub async fn set_access_block(&mut self, level: u16) -> Result<u16, KnxMuxError> {
        self.transact(CMD_SET_ACCESS_BLOCK, level, &[]).await
    }

    /// Connects or disconnects the gateway's upstream bus interface link.
    ///
    /// Disconnecting frees the single physical interface for other software
    /// without stopping the gateway; reconnect with `true` when done.
    pub async fn set_bus_link(&mut self, connected: bool) -> Result<(), KnxMuxError> {
        self.transact(CMD_BUS_LINK, connected as u16, &[]).await?;
        Ok(())
    }

    /// Forcibly closes another client session on the gateway.
    pub async fn close_session(
        &mut self,
        kind: SessionKind,
        session_id: u32,
    ) -> Result<(), KnxMuxError> {
        self.transact(CMD_CLOSE_SESSION, kind.code(), &session_id.to_be_bytes())
            .await?;
        Ok(())
    }

    /// Sends one command and reads its acknowledgment.
    ///
    /// Returns the ack code when the status byte echoes the command;
    /// otherwise maps the code through the server error taxonomy. The
    /// caller interprets the code (body length, management value, or zero).
    async fn transact(&mut self, cmd: u8, param: u16, payload: &[u8]) -> Result<u16, KnxMuxError> {
        let channel = match &mut self.state {
            SessionState::Closed => return Err(KnxMuxError::NotConnected),
            SessionState::Open { mode, .. } if *mode == LinkMode::Monitor => {
                return Err(KnxMuxError::WrongUsage)
            }
            SessionState::Open { channel, .. } => channel,
        };

        crate::logging::log_debug(&format!(
            "gateway request {:02x} param {param:#06x} payload [{}]",
            cmd,
            hex::encode(payload)
        ));

        let mut request = BytesMut::with_capacity(3 + payload.len());
        request.put_u8(cmd);
        request.put_u16(param);
        request.put_slice(payload);
        channel.send_all(&request).await?;

        let (status, code) = read_ack(channel).await?;
        if status != cmd {
            crate::logging::log_debug(&format!(
                "gateway answered {:02x} with error code {code}",
                cmd
            ));
            return Err(ServerError::from_code(code).into());
        }
        Ok(code)
    }

    /// Reads a variable-length reply body of exactly `length` bytes.
    async fn read_body(&mut self, length: usize) -> Result<Vec<u8>, KnxMuxError> {
        let channel = match &mut self.state {
            SessionState::Closed => return Err(KnxMuxError::NotConnected),
            SessionState::Open { channel, .. } => channel,
        };
        let mut body = vec![0u8; length];
        if length > 0 {
            channel.recv_exact(&mut body).await?;
        }
        Ok(body)
    }
}

async fn read_ack<C: ByteChannel + ?Sized>(channel: &mut C) -> Result<(u8, u16), KnxMuxError> {
    let mut ack = [0u8; ACK_HEADER_LEN];
    channel.recv_exact(&mut ack).await?;
    Ok((ack[0], u16::from_be_bytes([ack[1], ack[2]])))
}
