use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::engine::{Pushed, Stage, StreamState};
use crate::error::{ProxyError, Result};

/// Reads the whole file as a single chunk, then reports end-of-transport.
pub struct FileSource {
    path: PathBuf,
    consumed: bool,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            consumed: false,
        }
    }
}

#[async_trait]
impl Stage for FileSource {
    fn name(&self) -> &str {
        "file"
    }

    async fn pull(&mut self) -> Result<Vec<u8>> {
        if self.consumed {
            return Err(ProxyError::EndOfTransport);
        }
        self.consumed = true;

        let bytes = tokio::fs::read(&self.path).await?;
        tracing::debug!("file: read {} bytes from '{}'", bytes.len(), self.path.display());
        Ok(bytes)
    }
}

/// Appends every message to one file, created on first use.
pub struct FileSink {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
        }
    }

    async fn ensure_open(&mut self) -> Result<()> {
        if self.writer.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await?;
            tracing::info!("file: appending to '{}'", self.path.display());
            self.writer = Some(BufWriter::new(file));
        }
        Ok(())
    }
}

#[async_trait]
impl Stage for FileSink {
    fn name(&self) -> &str {
        "file"
    }

    async fn push(&mut self, _state: StreamState, input: Option<&[u8]>) -> Result<Pushed> {
        if input.is_some() {
            self.ensure_open().await?;
        }
        if let Some(writer) = self.writer.as_mut() {
            if let Some(bytes) = input {
                writer.write_all(bytes).await?;
            }
            writer.flush().await?;
        }
        Ok(Pushed::nothing())
    }
}
