use crate::engine::stage::{Pushed, Stage, StreamState};
use crate::error::{ProxyError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EngineState {
    Start,
    Active,
    End,
}

/// A linear pipeline: one source at position 0, a sink at the end, and any
/// number of transformer stages between them.
///
/// The engine owns a residual cache per non-source stage. Whatever suffix a
/// stage hands back as `remainder` is stored there and prepended to that
/// stage's next input, so stages see a contiguous byte stream no matter how
/// the transports fragment it.
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
    cache: Vec<Option<Vec<u8>>>,
    state: EngineState,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stages.len())
            .field("state", &self.state)
            .finish()
    }
}

impl Pipeline {
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Result<Self> {
        if stages.len() < 2 {
            return Err(ProxyError::InvalidOption(format!(
                "a pipeline needs at least a source and a sink, got {} stage(s)",
                stages.len()
            )));
        }

        let cache = stages.iter().map(|_| None).collect();
        Ok(Self {
            stages,
            cache,
            state: EngineState::Start,
        })
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Drive the pipeline until the source reports end-of-transport.
    ///
    /// Any other error escaping a stage aborts the run and is returned to the
    /// caller; the stream is too corrupt to continue safely.
    pub async fn run(&mut self) -> Result<()> {
        tracing::info!("pipeline running with {} stages", self.stages.len());
        self.state = EngineState::Active;

        loop {
            match self.stages[0].pull().await {
                Ok(chunk) => {
                    // An empty chunk means "no data this round".
                    if chunk.is_empty() {
                        continue;
                    }
                    self.dispatch(Some(chunk), 1).await?;
                }
                Err(ProxyError::EndOfTransport) => {
                    tracing::info!("source exhausted, draining pipeline");
                    self.state = EngineState::End;
                    self.flush().await?;
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One final traversal after source exhaustion: every stage observes
    /// `StreamState::End` at least once and may emit trailing buffered data.
    async fn flush(&mut self) -> Result<()> {
        for index in 1..self.stages.len() {
            self.dispatch(None, index).await?;
        }
        Ok(())
    }

    /// Feed `chunk` into the stage at `start` and drive every emission down
    /// the rest of the pipeline, level by level.
    ///
    /// Emissions from stage `i` are queued in order as the inputs of stage
    /// `i + 1`, which preserves the byte order each stage observes while
    /// avoiding a self-recursive dispatch.
    async fn dispatch(&mut self, chunk: Option<Vec<u8>>, start: usize) -> Result<()> {
        let state = self.stream_state();
        let mut inbox: Vec<Option<Vec<u8>>> = vec![chunk];

        for index in start..self.stages.len() {
            let mut outbox: Vec<Option<Vec<u8>>> = Vec::new();

            for incoming in inbox {
                // Coalesce: the stage sees its cached residual followed by
                // the newly arriving bytes, in that order.
                let mut input: Option<Vec<u8>> = match (self.cache[index].take(), incoming) {
                    (Some(mut held), Some(fresh)) => {
                        held.extend_from_slice(&fresh);
                        Some(held)
                    }
                    (Some(held), None) => Some(held),
                    (None, fresh) => fresh,
                };
                input = input.filter(|bytes| !bytes.is_empty());

                loop {
                    if state != StreamState::End && input.is_none() {
                        break;
                    }

                    let Pushed { emitted, remainder } =
                        self.stages[index].push(state, input.as_deref()).await?;

                    if let Some(emitted) = emitted {
                        if !emitted.is_empty() {
                            outbox.push(Some(emitted));
                        }
                    }

                    // Fixed point: the stage handed back exactly what it was
                    // offered, so it is blocked until more input arrives.
                    if remainder.as_deref() == input.as_deref() {
                        input = remainder;
                        break;
                    }
                    input = remainder.filter(|bytes| !bytes.is_empty());
                }

                self.cache[index] = input.filter(|bytes| !bytes.is_empty());
            }

            // The terminal stage is the sink; anything past it is discarded.
            if outbox.is_empty() {
                break;
            }
            inbox = outbox;
        }

        Ok(())
    }

    fn stream_state(&self) -> StreamState {
        match self.state {
            EngineState::End => StreamState::End,
            _ => StreamState::Active,
        }
    }
}
