use std::{
    io::{self, Read},
    net::SocketAddr,
};

use mio::{Registry, Token, net::TcpStream};
use tracing::debug;

use crate::outbound::{ConnState, OutboundBuffer};

/// One listener's TCP connection. Listeners are write-only from the
/// broker's point of view; any bytes a listener sends are read and
/// discarded so the socket's receive buffer never fills up and stalls a
/// well-behaved peer's close.
pub struct ListenerConn {
    stream: TcpStream,
    peer_addr: SocketAddr,
    out: OutboundBuffer,
}

impl ListenerConn {
    pub(crate) fn new(stream: TcpStream, peer_addr: SocketAddr) -> io::Result<Self> {
        stream.set_nodelay(true)?;
        Ok(Self { stream, peer_addr, out: OutboundBuffer::new() })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub(crate) fn send(&mut self, registry: &Registry, token: Token, bytes: &[u8]) -> ConnState {
        self.out.send(&mut self.stream, registry, token, bytes)
    }

    pub(crate) fn on_writable(&mut self, registry: &Registry, token: Token) -> ConnState {
        self.out.drain(&mut self.stream, registry, token)
    }

    /// Drains and discards everything currently readable. Returns
    /// `Disconnected` once the peer has closed its end.
    pub(crate) fn discard_readable(&mut self) -> ConnState {
        let mut scratch = [0u8; 512];
        loop {
            match self.stream.read(&mut scratch) {
                Ok(0) => return ConnState::Disconnected,
                Ok(_) => continue,
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => return ConnState::Alive,
                Err(err) => {
                    debug!(?err, "tcp: listener read failed");
                    return ConnState::Disconnected;
                }
            }
        }
    }

    pub(crate) fn close(&mut self, registry: &Registry) {
        debug!(peer = ?self.peer_addr, "closing listener connection");
        let _ = registry.deregister(&mut self.stream);
        let _ = self.stream.shutdown(std::net::Shutdown::Both);
    }
}
