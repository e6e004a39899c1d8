pub mod factory;
pub mod pipeline;
pub mod stage;

pub use pipeline::Pipeline;
pub use stage::{Pushed, Stage, StreamState};

use crate::config;
use crate::error::Result;

/// Build a pipeline from ordered stage tokens (`name` or `name:options`).
/// Token position decides the role: the stage at position 0 is the source.
pub fn build_pipeline(tokens: &[String]) -> Result<Pipeline> {
    let mut stages: Vec<Box<dyn Stage>> = Vec::with_capacity(tokens.len());
    for (position, token) in tokens.iter().enumerate() {
        let token = config::parse_token(token)?;
        stages.push(factory::create_stage(&token, position)?);
    }
    Pipeline::new(stages)
}
