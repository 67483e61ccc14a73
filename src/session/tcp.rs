//! TCP transport convenience for the gateway session.
//!
//! The gateway's socket server listens on TCP (port 4390 by default). This
//! module dials it and runs the register handshake; everything else lives in
//! the transport-agnostic session code.

use super::GatewayHandle;
use crate::constants::GATEWAY_TCP_PORT;
use crate::error::KnxMuxError;
use tokio::net::TcpStream;

impl GatewayHandle<TcpStream> {
    /// Dials `host:port` and registers this client with the gateway.
    pub async fn open(&mut self, host: &str, port: u16) -> Result<(), KnxMuxError> {
        if self.is_open() {
            return Err(KnxMuxError::AlreadyConnected);
        }
        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|e| KnxMuxError::ConnectFailed(e.to_string()))?;
        self.open_with(stream).await?;
        self.peer = Some(format!("{host}:{port}"));
        crate::logging::log_info(&format!(
            "connected to gateway {host}:{port} as {:?}",
            self.identifier()
        ));
        Ok(())
    }

    /// Creates a handle and opens it against `host` on the default port.
    pub async fn connect(host: &str, identifier: &str) -> Result<Self, KnxMuxError> {
        Self::connect_to(host, GATEWAY_TCP_PORT, identifier).await
    }

    /// Creates a handle and opens it against `host:port`.
    pub async fn connect_to(
        host: &str,
        port: u16,
        identifier: &str,
    ) -> Result<Self, KnxMuxError> {
        let mut handle = GatewayHandle::new(identifier);
        handle.open(host, port).await?;
        Ok(handle)
    }
}
