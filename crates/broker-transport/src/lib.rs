//! Non-blocking TCP transport for the broker, built on `mio`.
//!
//! This crate knows nothing about the wire protocol carried over the
//! sockets it manages. It owns exactly two things: the pair of listening
//! sockets (one for sources, one for listeners) and the per-connection
//! read/write state needed to assemble whole source frames and to buffer
//! outbound bytes when a peer's socket isn't immediately writable.
//!
//! Callers drive everything through [`Transport::poll_with`], which blocks
//! in the kernel until there is IO to do and reports it via [`PollEvent`].

mod listener;
mod outbound;
mod source;
mod transport;

pub use listener::ListenerConn;
pub use mio::Token;
pub use outbound::ConnState;
pub use source::{HEADER_SIZE, MAX_FRAME_SIZE, RECORD_SIZE, SourceConn};
pub use transport::{PollEvent, Transport};
