//! Framing and byte-transformation codecs.
//!
//! A codec is either an [`Encode`] (whole message in, bytes out — one-shot
//! transforms land here too) or a [`Decode`] (byte stream in, at most one
//! framed message plus the unconsumed remainder out). The two adapters
//! [`as_encoder`] and [`as_decoder`] lift a codec into a pipeline [`Stage`];
//! buffering across calls is the engine's job, so decoders stay free of any
//! residual bookkeeping of their own.

mod delim;
mod escape;
mod length;
mod logger;
mod markup;
mod simple;
mod url;

pub use delim::{DelimDecode, DelimEncode};
pub use escape::{EscapeNewlines, UnescapeNewlines};
pub use length::{LengthDecode, LengthEncode};
pub use logger::LogStage;
pub use markup::{JsonToXml, XmlToJson};
pub use simple::{NullCodec, SkipCodec, StripCodec};
pub use url::{UrlDecode, UrlEncode};

use async_trait::async_trait;

use crate::engine::{Pushed, Stage, StreamState};
use crate::error::Result;

/// Message-to-bytes codec. Always consumes the whole input.
pub trait Encode: Send {
    fn encode(&mut self, message: &[u8]) -> Result<Vec<u8>>;
}

/// Bytes-to-message codec. Returns at most one message per call; whatever it
/// does not consume comes back as the remainder.
pub trait Decode: Send {
    fn decode(&mut self, state: StreamState, input: &[u8]) -> Result<Decoded>;
}

/// One framing step: an extracted message (if a whole one was available) and
/// the unconsumed suffix.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Decoded {
    pub message: Option<Vec<u8>>,
    pub remainder: Option<Vec<u8>>,
}

impl Decoded {
    /// A complete message with nothing left over.
    pub fn message(message: Vec<u8>) -> Self {
        Self {
            message: Some(message),
            remainder: None,
        }
    }

    /// A complete message followed by unconsumed bytes.
    pub fn split(message: Vec<u8>, remainder: Vec<u8>) -> Self {
        Self {
            message: Some(message),
            remainder: Some(remainder),
        }
    }

    /// No complete message yet; the whole input waits for more bytes.
    pub fn incomplete(input: &[u8]) -> Self {
        Self {
            message: None,
            remainder: Some(input.to_vec()),
        }
    }
}

struct EncoderStage<E> {
    name: String,
    codec: E,
}

#[async_trait]
impl<E: Encode> Stage for EncoderStage<E> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn push(&mut self, _state: StreamState, input: Option<&[u8]>) -> Result<Pushed> {
        match input {
            Some(message) => Ok(Pushed::emit(self.codec.encode(message)?)),
            // Flush pass with nothing cached: encoders hold no partial state
            // that outlives a call.
            None => Ok(Pushed::nothing()),
        }
    }
}

struct DecoderStage<D> {
    name: String,
    codec: D,
}

#[async_trait]
impl<D: Decode> Stage for DecoderStage<D> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn push(&mut self, state: StreamState, input: Option<&[u8]>) -> Result<Pushed> {
        match input {
            Some(bytes) => {
                let Decoded { message, remainder } = self.codec.decode(state, bytes)?;
                Ok(Pushed {
                    emitted: message,
                    remainder,
                })
            }
            None => Ok(Pushed::nothing()),
        }
    }
}

/// Lift a message-to-bytes codec into a stage.
pub fn as_encoder<E: Encode + 'static>(name: &str, codec: E) -> Box<dyn Stage> {
    Box::new(EncoderStage {
        name: name.to_string(),
        codec,
    })
}

/// Lift a framing codec into a stage.
pub fn as_decoder<D: Decode + 'static>(name: &str, codec: D) -> Box<dyn Stage> {
    Box::new(DecoderStage {
        name: name.to_string(),
        codec,
    })
}
