use async_trait::async_trait;

use crate::engine::{Pushed, Stage, StreamState};
use crate::error::Result;

/// Forwards input unchanged while writing label, state, a monotonic counter
/// and the data to the diagnostic stream. Never touches the data path.
pub struct LogStage {
    label: String,
    count: u64,
}

impl LogStage {
    pub fn new(label: Option<&str>) -> Self {
        Self {
            label: label.unwrap_or("log").to_string(),
            count: 0,
        }
    }
}

#[async_trait]
impl Stage for LogStage {
    fn name(&self) -> &str {
        &self.label
    }

    async fn push(&mut self, state: StreamState, input: Option<&[u8]>) -> Result<Pushed> {
        match input {
            Some(bytes) => {
                self.count += 1;
                tracing::info!(
                    "{}: [{:?}] #{} ({} bytes) {}",
                    self.label,
                    state,
                    self.count,
                    bytes.len(),
                    String::from_utf8_lossy(bytes)
                );
                Ok(Pushed::emit(bytes.to_vec()))
            }
            None => {
                tracing::info!(
                    "{}: [{:?}] draining after {} message(s)",
                    self.label,
                    state,
                    self.count
                );
                Ok(Pushed::nothing())
            }
        }
    }
}
