use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::engine::{Pushed, Stage, StreamState};
use crate::error::{ProxyError, Result};
use crate::transports::READ_CHUNK;

/// TCP listener source. Binds on first pull, accepts one client at a time
/// and yields whatever chunks the kernel hands over. When the client
/// disconnects the source either accepts the next client (`keep_listening`)
/// or reports end-of-transport.
pub struct TcpSource {
    addr: SocketAddr,
    keep_listening: bool,
    listener: Option<TcpListener>,
    client: Option<TcpStream>,
}

impl TcpSource {
    pub fn new(addr: SocketAddr, keep_listening: bool) -> Self {
        Self {
            addr,
            keep_listening,
            listener: None,
            client: None,
        }
    }

    async fn accept(&mut self) -> Result<()> {
        if self.listener.is_none() {
            let listener = TcpListener::bind(self.addr).await?;
            tracing::info!("tcp: listening on {}", self.addr);
            self.listener = Some(listener);
        }
        if self.client.is_none() {
            if let Some(listener) = self.listener.as_ref() {
                let (stream, peer) = listener.accept().await?;
                tracing::info!("tcp: accepted connection from {}", peer);
                self.client = Some(stream);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Stage for TcpSource {
    fn name(&self) -> &str {
        "tcp"
    }

    async fn pull(&mut self) -> Result<Vec<u8>> {
        loop {
            self.accept().await?;

            let Some(client) = self.client.as_mut() else {
                continue;
            };
            let mut chunk = vec![0u8; READ_CHUNK];
            let read = client.read(&mut chunk).await?;
            if read == 0 {
                tracing::info!("tcp: client disconnected");
                self.client = None;
                if self.keep_listening {
                    continue;
                }
                return Err(ProxyError::EndOfTransport);
            }
            chunk.truncate(read);
            return Ok(chunk);
        }
    }
}

/// TCP connector sink. Connects on first push and writes every message to
/// the same stream.
pub struct TcpSink {
    addr: SocketAddr,
    stream: Option<TcpStream>,
}

impl TcpSink {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr, stream: None }
    }

    async fn connect(&mut self) -> Result<()> {
        if self.stream.is_none() {
            let stream = TcpStream::connect(self.addr).await?;
            tracing::info!("tcp: connected to {}", self.addr);
            self.stream = Some(stream);
        }
        Ok(())
    }
}

#[async_trait]
impl Stage for TcpSink {
    fn name(&self) -> &str {
        "tcp"
    }

    async fn push(&mut self, _state: StreamState, input: Option<&[u8]>) -> Result<Pushed> {
        if input.is_some() {
            self.connect().await?;
        }
        if let Some(stream) = self.stream.as_mut() {
            if let Some(bytes) = input {
                stream.write_all(bytes).await?;
            }
            stream.flush().await?;
        }
        Ok(Pushed::nothing())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_source_reads_until_disconnect() {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let listener = TcpListener::bind(addr).await.unwrap();
        let bound = listener.local_addr().unwrap();

        let mut source = TcpSource::new(bound, false);
        source.listener = Some(listener);

        let client = tokio::spawn(async move {
            let mut stream = TcpStream::connect(bound).await.unwrap();
            stream.write_all(b"hello").await.unwrap();
            stream.shutdown().await.unwrap();
        });

        let mut received = Vec::new();
        loop {
            match source.pull().await {
                Ok(chunk) => received.extend_from_slice(&chunk),
                Err(ProxyError::EndOfTransport) => break,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        client.await.unwrap();
        assert_eq!(received, b"hello");
    }

    #[tokio::test]
    async fn test_sink_writes_to_peer() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let bound = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            stream.read_to_end(&mut received).await.unwrap();
            received
        });

        let mut sink = TcpSink::new(bound);
        sink.push(StreamState::Active, Some(b"one")).await.unwrap();
        sink.push(StreamState::Active, Some(b"two")).await.unwrap();
        sink.push(StreamState::End, None).await.unwrap();
        drop(sink);

        assert_eq!(server.await.unwrap(), b"onetwo");
    }
}
