//! ZeroMQ transport on the pure-Rust `zeromq` crate.
//!
//! The socket MODE decides the stage's role: SUB, PULL and REP receive, so
//! they are sources; PUB, PUSH and REQ send, so they are sinks. Serving
//! modes (REP, PUB, PULL) bind their endpoint, the others connect. REQ/REP
//! alternation is honoured with an empty ack frame: REP acknowledges every
//! request, REQ drains and discards every reply.

use std::str::FromStr;

use async_trait::async_trait;
use zeromq::prelude::*;
use zeromq::{PubSocket, PullSocket, PushSocket, RepSocket, ReqSocket, SubSocket, ZmqMessage};

use crate::engine::{Pushed, Stage, StreamState};
use crate::error::{ProxyError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZmqMode {
    Req,
    Rep,
    Pub,
    Sub,
    Push,
    Pull,
}

impl ZmqMode {
    /// Receiving modes act as pipeline sources.
    pub fn is_source(self) -> bool {
        matches!(self, Self::Sub | Self::Pull | Self::Rep)
    }
}

impl FromStr for ZmqMode {
    type Err = ProxyError;

    fn from_str(mode: &str) -> Result<Self> {
        match mode {
            "REQ" => Ok(Self::Req),
            "REP" => Ok(Self::Rep),
            "PUB" => Ok(Self::Pub),
            "SUB" => Ok(Self::Sub),
            "PUSH" => Ok(Self::Push),
            "PULL" => Ok(Self::Pull),
            _ => Err(ProxyError::InvalidOption(format!(
                "unknown zmq mode '{mode}', expected REQ, REP, PUB, SUB, PUSH or PULL"
            ))),
        }
    }
}

enum SourceSocket {
    Sub(SubSocket),
    Pull(PullSocket),
    Rep(RepSocket),
}

/// ZMQ receiving stage. The socket is created lazily on first pull.
pub struct ZmqSource {
    mode: ZmqMode,
    endpoint: String,
    socket: Option<SourceSocket>,
}

impl ZmqSource {
    pub fn new(mode: ZmqMode, endpoint: impl Into<String>) -> Self {
        Self {
            mode,
            endpoint: endpoint.into(),
            socket: None,
        }
    }

    async fn ensure_socket(&mut self) -> Result<()> {
        if self.socket.is_some() {
            return Ok(());
        }
        let socket = match self.mode {
            ZmqMode::Sub => {
                let mut socket = SubSocket::new();
                socket.connect(&self.endpoint).await?;
                socket.subscribe("").await?;
                tracing::info!("zmq: SUB connected to {}", self.endpoint);
                SourceSocket::Sub(socket)
            }
            ZmqMode::Pull => {
                let mut socket = PullSocket::new();
                socket.bind(&self.endpoint).await?;
                tracing::info!("zmq: PULL bound to {}", self.endpoint);
                SourceSocket::Pull(socket)
            }
            ZmqMode::Rep => {
                let mut socket = RepSocket::new();
                socket.bind(&self.endpoint).await?;
                tracing::info!("zmq: REP bound to {}", self.endpoint);
                SourceSocket::Rep(socket)
            }
            _ => {
                return Err(ProxyError::InvalidOption(format!(
                    "zmq mode {:?} cannot receive",
                    self.mode
                )));
            }
        };
        self.socket = Some(socket);
        Ok(())
    }
}

#[async_trait]
impl Stage for ZmqSource {
    fn name(&self) -> &str {
        "zmq"
    }

    async fn pull(&mut self) -> Result<Vec<u8>> {
        self.ensure_socket().await?;
        let Some(socket) = self.socket.as_mut() else {
            return Err(ProxyError::EndOfTransport);
        };

        let message = match socket {
            SourceSocket::Sub(socket) => socket.recv().await?,
            SourceSocket::Pull(socket) => socket.recv().await?,
            SourceSocket::Rep(socket) => {
                let message = socket.recv().await?;
                // REQ/REP alternation: every request gets an empty ack.
                socket.send(ZmqMessage::from(Vec::<u8>::new())).await?;
                message
            }
        };
        Ok(flatten(message))
    }
}

enum SinkSocket {
    Pub(PubSocket),
    Push(PushSocket),
    Req(ReqSocket),
}

/// ZMQ sending stage. The socket is created lazily on first push.
pub struct ZmqSink {
    mode: ZmqMode,
    endpoint: String,
    socket: Option<SinkSocket>,
}

impl ZmqSink {
    pub fn new(mode: ZmqMode, endpoint: impl Into<String>) -> Self {
        Self {
            mode,
            endpoint: endpoint.into(),
            socket: None,
        }
    }

    async fn ensure_socket(&mut self) -> Result<()> {
        if self.socket.is_some() {
            return Ok(());
        }
        let socket = match self.mode {
            ZmqMode::Pub => {
                let mut socket = PubSocket::new();
                socket.bind(&self.endpoint).await?;
                tracing::info!("zmq: PUB bound to {}", self.endpoint);
                SinkSocket::Pub(socket)
            }
            ZmqMode::Push => {
                let mut socket = PushSocket::new();
                socket.connect(&self.endpoint).await?;
                tracing::info!("zmq: PUSH connected to {}", self.endpoint);
                SinkSocket::Push(socket)
            }
            ZmqMode::Req => {
                let mut socket = ReqSocket::new();
                socket.connect(&self.endpoint).await?;
                tracing::info!("zmq: REQ connected to {}", self.endpoint);
                SinkSocket::Req(socket)
            }
            _ => {
                return Err(ProxyError::InvalidOption(format!(
                    "zmq mode {:?} cannot send",
                    self.mode
                )));
            }
        };
        self.socket = Some(socket);
        Ok(())
    }
}

#[async_trait]
impl Stage for ZmqSink {
    fn name(&self) -> &str {
        "zmq"
    }

    async fn push(&mut self, _state: StreamState, input: Option<&[u8]>) -> Result<Pushed> {
        let Some(bytes) = input else {
            return Ok(Pushed::nothing());
        };

        self.ensure_socket().await?;
        let Some(socket) = self.socket.as_mut() else {
            return Ok(Pushed::nothing());
        };

        let message = ZmqMessage::from(bytes.to_vec());
        match socket {
            SinkSocket::Pub(socket) => socket.send(message).await?,
            SinkSocket::Push(socket) => socket.send(message).await?,
            SinkSocket::Req(socket) => {
                socket.send(message).await?;
                // REQ/REP alternation: drain the reply and drop it.
                let _ = socket.recv().await?;
            }
        }
        Ok(Pushed::nothing())
    }
}

/// A proxy treats messages as opaque bytes, so multipart frames are joined
/// back into one chunk in frame order.
fn flatten(message: ZmqMessage) -> Vec<u8> {
    let mut bytes = Vec::new();
    for frame in message.iter() {
        bytes.extend_from_slice(frame);
    }
    bytes
}
