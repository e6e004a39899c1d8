use std::path::PathBuf;

use async_trait::async_trait;

use crate::engine::{Pushed, Stage, StreamState};
use crate::error::{ProxyError, Result};

/// Iterates the files in a folder, one file per pull, then reports
/// end-of-transport. The listing is sorted by filename so the message order
/// does not depend on filesystem enumeration order.
pub struct FolderSource {
    dir: PathBuf,
    files: Option<Vec<PathBuf>>,
    index: usize,
}

impl FolderSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            files: None,
            index: 0,
        }
    }

    fn scan(&mut self) -> Result<()> {
        if self.files.is_none() {
            let pattern = self.dir.join("*");
            let pattern = pattern.to_string_lossy();
            let entries = glob::glob(&pattern).map_err(|e| {
                ProxyError::InvalidOption(format!("bad folder pattern '{pattern}': {e}"))
            })?;

            let mut files = Vec::new();
            for entry in entries {
                let path =
                    entry.map_err(|e| ProxyError::Io(std::io::Error::other(e.to_string())))?;
                if path.is_file() {
                    files.push(path);
                }
            }
            files.sort();
            tracing::info!("folder: {} file(s) under '{}'", files.len(), self.dir.display());
            self.files = Some(files);
        }
        Ok(())
    }
}

#[async_trait]
impl Stage for FolderSource {
    fn name(&self) -> &str {
        "folder"
    }

    async fn pull(&mut self) -> Result<Vec<u8>> {
        self.scan()?;
        let files = self.files.as_deref().unwrap_or_default();
        let Some(path) = files.get(self.index).cloned() else {
            return Err(ProxyError::EndOfTransport);
        };
        self.index += 1;

        let bytes = tokio::fs::read(&path).await?;
        tracing::debug!("folder: read {} bytes from '{}'", bytes.len(), path.display());
        Ok(bytes)
    }
}

/// Writes each message to a new file with a monotonically increasing,
/// zero-padded suffix. The folder is created on first use.
pub struct FolderSink {
    dir: PathBuf,
    created: bool,
    next_index: u64,
}

impl FolderSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            created: false,
            next_index: 0,
        }
    }
}

#[async_trait]
impl Stage for FolderSink {
    fn name(&self) -> &str {
        "folder"
    }

    async fn push(&mut self, _state: StreamState, input: Option<&[u8]>) -> Result<Pushed> {
        let Some(bytes) = input else {
            return Ok(Pushed::nothing());
        };

        if !self.created {
            tokio::fs::create_dir_all(&self.dir).await?;
            self.created = true;
        }

        let path = self.dir.join(format!("{:06}", self.next_index));
        self.next_index += 1;
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!("folder: wrote {} bytes to '{}'", bytes.len(), path.display());
        Ok(Pushed::nothing())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_source_yields_files_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("b"), b"second").await.unwrap();
        tokio::fs::write(dir.path().join("a"), b"first").await.unwrap();
        tokio::fs::write(dir.path().join("c"), b"third").await.unwrap();

        let mut source = FolderSource::new(dir.path());
        assert_eq!(source.pull().await.unwrap(), b"first");
        assert_eq!(source.pull().await.unwrap(), b"second");
        assert_eq!(source.pull().await.unwrap(), b"third");
        assert!(matches!(
            source.pull().await,
            Err(ProxyError::EndOfTransport)
        ));
    }

    #[tokio::test]
    async fn test_empty_folder_ends_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = FolderSource::new(dir.path());
        assert!(matches!(
            source.pull().await,
            Err(ProxyError::EndOfTransport)
        ));
    }

    #[tokio::test]
    async fn test_sink_writes_one_file_per_message() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");

        let mut sink = FolderSink::new(&out);
        sink.push(StreamState::Active, Some(b"m1")).await.unwrap();
        sink.push(StreamState::Active, Some(b"m2")).await.unwrap();
        sink.push(StreamState::End, None).await.unwrap();

        assert_eq!(tokio::fs::read(out.join("000000")).await.unwrap(), b"m1");
        assert_eq!(tokio::fs::read(out.join("000001")).await.unwrap(), b"m2");
        assert!(!out.join("000002").exists());
    }
}
