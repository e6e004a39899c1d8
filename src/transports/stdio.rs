use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::engine::{Pushed, Stage, StreamState};
use crate::error::{ProxyError, Result};
use crate::transports::READ_CHUNK;

/// Reads chunks from stdin until EOF.
pub struct StdinSource {
    stdin: tokio::io::Stdin,
}

impl StdinSource {
    pub fn new() -> Self {
        Self {
            stdin: tokio::io::stdin(),
        }
    }
}

impl Default for StdinSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Stage for StdinSource {
    fn name(&self) -> &str {
        "stdin"
    }

    async fn pull(&mut self) -> Result<Vec<u8>> {
        let mut chunk = vec![0u8; READ_CHUNK];
        let read = self.stdin.read(&mut chunk).await?;
        if read == 0 {
            return Err(ProxyError::EndOfTransport);
        }
        chunk.truncate(read);
        Ok(chunk)
    }
}

/// Writes every message to stdout, flushed per push so a downstream consumer
/// sees data as soon as it exists.
pub struct StdoutSink {
    stdout: tokio::io::Stdout,
}

impl StdoutSink {
    pub fn new() -> Self {
        Self {
            stdout: tokio::io::stdout(),
        }
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Stage for StdoutSink {
    fn name(&self) -> &str {
        "stdout"
    }

    async fn push(&mut self, _state: StreamState, input: Option<&[u8]>) -> Result<Pushed> {
        if let Some(bytes) = input {
            self.stdout.write_all(bytes).await?;
        }
        self.stdout.flush().await?;
        Ok(Pushed::nothing())
    }
}
