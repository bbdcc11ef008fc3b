use std::{
    collections::VecDeque,
    io::{self, Write},
};

use mio::{Interest, Registry, Token, net::TcpStream};
use tracing::debug;

/// Outcome of an operation performed against a live connection.
///
/// `Disconnected` means the peer is gone; the caller must tear the
/// connection down and is not expected to retry the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Alive,
    Disconnected,
}

/// Best-effort, order-preserving outbound byte queue for one socket.
///
/// `send` writes immediately when the socket isn't backed up; anything that
/// doesn't fit is copied into `backlog` and flushed later from
/// [`OutboundBuffer::drain`], which the caller should invoke on every
/// writable readiness event. `backlog` is a queue of whole or partial
/// messages rather than one contiguous buffer so that large messages don't
/// require repeatedly shifting already-sent bytes out of a shared buffer.
#[derive(Default)]
pub(crate) struct OutboundBuffer {
    backlog: VecDeque<Vec<u8>>,
    writable_armed: bool,
}

impl OutboundBuffer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Writes `bytes` now if the backlog is empty and the socket accepts
    /// them, otherwise queues the unwritten remainder.
    pub(crate) fn send(
        &mut self,
        stream: &mut TcpStream,
        registry: &Registry,
        token: Token,
        bytes: &[u8],
    ) -> ConnState {
        if !self.backlog.is_empty() {
            return self.enqueue(stream, registry, token, bytes.to_vec());
        }

        match stream.write(bytes) {
            Ok(0) if !bytes.is_empty() => ConnState::Disconnected,
            Ok(n) if n == bytes.len() => ConnState::Alive,
            Ok(n) => self.enqueue(stream, registry, token, bytes[n..].to_vec()),
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                self.enqueue(stream, registry, token, bytes.to_vec())
            }
            Err(err) => {
                debug!(?err, "tcp: write failed");
                ConnState::Disconnected
            }
        }
    }

    /// Flushes queued bytes until the kernel blocks or the backlog drains.
    /// Drops WRITABLE interest once the backlog is empty.
    pub(crate) fn drain(
        &mut self,
        stream: &mut TcpStream,
        registry: &Registry,
        token: Token,
    ) -> ConnState {
        while let Some(front) = self.backlog.front_mut() {
            match stream.write(front) {
                Ok(0) => return ConnState::Disconnected,
                Ok(n) if n == front.len() => {
                    self.backlog.pop_front();
                }
                Ok(n) => {
                    front.drain(..n);
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(err) => {
                    debug!(?err, "tcp: backlog write failed");
                    return ConnState::Disconnected;
                }
            }
        }

        if self.backlog.is_empty() && self.writable_armed {
            if let Err(err) = registry.reregister(stream, token, Interest::READABLE) {
                debug!(?err, "tcp: reregister drop writable");
                return ConnState::Disconnected;
            }
            self.writable_armed = false;
        }

        ConnState::Alive
    }

    fn enqueue(
        &mut self,
        stream: &mut TcpStream,
        registry: &Registry,
        token: Token,
        data: Vec<u8>,
    ) -> ConnState {
        self.backlog.push_back(data);
        if !self.writable_armed {
            if let Err(err) =
                registry.reregister(stream, token, Interest::READABLE | Interest::WRITABLE)
            {
                debug!(?err, "tcp: reregister arm writable");
                return ConnState::Disconnected;
            }
            self.writable_armed = true;
        }
        ConnState::Alive
    }
}
