use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::net::UdpSocket;

use crate::engine::{Pushed, Stage, StreamState};
use crate::error::{ProxyError, Result};
use crate::transports::READ_CHUNK;

/// UDP source: binds the given address and yields one datagram per pull.
/// Datagrams never signal end-of-transport; the pipeline runs until killed.
pub struct UdpSource {
    addr: SocketAddr,
    socket: Option<UdpSocket>,
}

impl UdpSource {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr, socket: None }
    }

    async fn bind(&mut self) -> Result<()> {
        if self.socket.is_none() {
            let socket = UdpSocket::bind(self.addr).await?;
            tracing::info!("udp: bound to {}", self.addr);
            self.socket = Some(socket);
        }
        Ok(())
    }
}

#[async_trait]
impl Stage for UdpSource {
    fn name(&self) -> &str {
        "udp"
    }

    async fn pull(&mut self) -> Result<Vec<u8>> {
        self.bind().await?;
        let Some(socket) = self.socket.as_ref() else {
            return Err(ProxyError::EndOfTransport);
        };

        let mut chunk = vec![0u8; READ_CHUNK];
        let (read, peer) = socket.recv_from(&mut chunk).await?;
        tracing::debug!("udp: {} bytes from {}", read, peer);
        chunk.truncate(read);
        Ok(chunk)
    }
}

/// UDP sink: sends one datagram per message to the configured peer.
pub struct UdpSink {
    addr: SocketAddr,
    socket: Option<UdpSocket>,
}

impl UdpSink {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr, socket: None }
    }

    async fn connect(&mut self) -> Result<()> {
        if self.socket.is_none() {
            let socket = UdpSocket::bind("0.0.0.0:0").await?;
            socket.connect(self.addr).await?;
            tracing::info!("udp: sending to {}", self.addr);
            self.socket = Some(socket);
        }
        Ok(())
    }
}

#[async_trait]
impl Stage for UdpSink {
    fn name(&self) -> &str {
        "udp"
    }

    async fn push(&mut self, _state: StreamState, input: Option<&[u8]>) -> Result<Pushed> {
        let Some(bytes) = input else {
            return Ok(Pushed::nothing());
        };

        self.connect().await?;
        if let Some(socket) = self.socket.as_ref() {
            socket.send(bytes).await?;
        }
        Ok(Pushed::nothing())
    }
}
