use thiserror::Error;

/// Errors raised by stages and the pipeline engine.
///
/// `EndOfTransport` is not a failure: it is the normal termination signal a
/// source raises once its transport is exhausted, and the engine answers it
/// with the flush pass. Everything else aborts the run.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("end of transport")]
    EndOfTransport,

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("zeromq error: {0}")]
    Zmq(#[from] zeromq::ZmqError),
}

pub type Result<T> = std::result::Result<T, ProxyError>;
