//! Transport stages: I/O on an external channel. Sources implement `pull`,
//! sinks implement `push`; each stage exclusively owns its socket or file
//! handle and opens it lazily on first use.

pub mod file;
pub mod folder;
pub mod stdio;
pub mod tcp;
pub mod udp;
pub mod zmq;

pub use file::{FileSink, FileSource};
pub use folder::{FolderSink, FolderSource};
pub use stdio::{StdinSource, StdoutSink};
pub use tcp::{TcpSink, TcpSource};
pub use udp::{UdpSink, UdpSource};
pub use zmq::{ZmqMode, ZmqSink, ZmqSource};

/// Read size for chunked transports. Transports may fragment arbitrarily;
/// the engine's residual caches reassemble frames downstream.
pub(crate) const READ_CHUNK: usize = 64 * 1024;
