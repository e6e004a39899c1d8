use async_trait::async_trait;

use crate::error::{ProxyError, Result};

/// Stream state handed to every `push` call.
///
/// `End` means the source has reported end-of-transport and the engine is
/// draining the pipeline; a stage holding buffered data should emit it now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Active,
    End,
}

/// Result of offering input to a stage.
///
/// `emitted` is forwarded downstream; `remainder` is the suffix of the input
/// the stage did not consume, which the engine caches and prepends to the
/// stage's next input. Returning the input untouched as `remainder` declares
/// "I need more bytes" and stops the engine calling the stage again until
/// more arrive.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Pushed {
    pub emitted: Option<Vec<u8>>,
    pub remainder: Option<Vec<u8>>,
}

impl Pushed {
    /// Nothing to forward, nothing left over.
    pub fn nothing() -> Self {
        Self::default()
    }

    /// Forward `emitted`, consuming the whole input.
    pub fn emit(emitted: Vec<u8>) -> Self {
        Self {
            emitted: Some(emitted),
            remainder: None,
        }
    }

    /// Consume nothing: hand the whole input back and wait for more.
    pub fn hold(input: &[u8]) -> Self {
        Self {
            emitted: None,
            remainder: Some(input.to_vec()),
        }
    }

    /// Forward `emitted` and hand back the unconsumed suffix.
    pub fn split(emitted: Vec<u8>, remainder: Vec<u8>) -> Self {
        Self {
            emitted: Some(emitted),
            remainder: Some(remainder),
        }
    }
}

/// A pipeline stage.
///
/// The stage at position 0 is the source and implements `pull`; every other
/// stage implements `push`. The factory guarantees stages only ever sit at a
/// position they support, so the defaults here are unreachable in a built
/// pipeline and exist to keep the trait object-safe with a single vtable.
#[async_trait]
pub trait Stage: Send {
    fn name(&self) -> &str;

    /// Block until the next chunk is available. `Err(EndOfTransport)` once
    /// the transport is exhausted. An empty chunk means "no data this round".
    async fn pull(&mut self) -> Result<Vec<u8>> {
        Err(ProxyError::InvalidOption(format!(
            "stage '{}' cannot act as a source",
            self.name()
        )))
    }

    /// Offer `input` to the stage. `input` is always non-empty, except during
    /// the flush pass when it is absent.
    async fn push(&mut self, _state: StreamState, _input: Option<&[u8]>) -> Result<Pushed> {
        Err(ProxyError::InvalidOption(format!(
            "stage '{}' cannot act as a transformer or sink",
            self.name()
        )))
    }
}
