use std::{
    io::{self, Read},
    net::SocketAddr,
};

use mio::{Registry, Token, net::TcpStream};
use tracing::debug;

use crate::outbound::{ConnState, OutboundBuffer};

/// Size of the fixed meta block that precedes every source frame's
/// telemetry payload: header byte, 2-byte serial, 8-byte source id,
/// 1-byte state, 1-byte record count.
pub const HEADER_SIZE: usize = 13;
/// Size of one telemetry record: 8-byte name, 4-byte value, 1-byte XOR.
pub const RECORD_SIZE: usize = 13;
/// `N` (the record count) is a single byte, so a frame can never exceed this.
pub const MAX_FRAME_SIZE: usize = HEADER_SIZE + u8::MAX as usize * RECORD_SIZE;

enum RxState {
    /// Waiting for the fixed meta block. `have` bytes of it have arrived.
    Header { have: usize },
    /// Meta block is in, now reading `need` bytes of telemetry records.
    Payload { need: usize, have: usize },
}

pub(crate) enum ReadOutcome<'a> {
    FrameReady(&'a [u8]),
    WouldBlock,
    Disconnected,
}

/// One source's TCP connection: the fixed two-step frame reader described
/// in the wire protocol (meta block, then `meta[12] * RECORD_SIZE` bytes of
/// telemetry) plus a best-effort outbound queue for acks.
pub struct SourceConn {
    stream: TcpStream,
    peer_addr: SocketAddr,
    rx_state: RxState,
    buf: Vec<u8>,
    out: OutboundBuffer,
}

impl SourceConn {
    pub(crate) fn new(stream: TcpStream, peer_addr: SocketAddr) -> io::Result<Self> {
        stream.set_nodelay(true)?;
        Ok(Self {
            stream,
            peer_addr,
            rx_state: RxState::Header { have: 0 },
            buf: vec![0; HEADER_SIZE],
            out: OutboundBuffer::new(),
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Sends (or enqueues) the ack frame for a just-handled source frame.
    pub(crate) fn send_ack(&mut self, registry: &Registry, token: Token, ack: &[u8]) -> ConnState {
        self.out.send(&mut self.stream, registry, token, ack)
    }

    pub(crate) fn on_writable(&mut self, registry: &Registry, token: Token) -> ConnState {
        self.out.drain(&mut self.stream, registry, token)
    }

    /// Reads exactly one complete frame, a buffer re-used across calls: the
    /// returned slice is only valid until the next call into this connection.
    pub(crate) fn read_frame(&mut self) -> ReadOutcome<'_> {
        loop {
            match self.rx_state {
                RxState::Header { mut have } => {
                    while have < HEADER_SIZE {
                        match self.stream.read(&mut self.buf[have..HEADER_SIZE]) {
                            Ok(0) => return ReadOutcome::Disconnected,
                            Ok(n) => have += n,
                            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                                self.rx_state = RxState::Header { have };
                                return ReadOutcome::WouldBlock;
                            }
                            Err(err) => {
                                debug!(?err, "tcp: read source header");
                                return ReadOutcome::Disconnected;
                            }
                        }
                    }
                    let record_count = self.buf[12] as usize;
                    let need = record_count * RECORD_SIZE;
                    self.buf.resize(HEADER_SIZE + need, 0);
                    self.rx_state = RxState::Payload { need, have: 0 };
                }

                RxState::Payload { need, mut have } => {
                    while have < need {
                        match self.stream.read(&mut self.buf[HEADER_SIZE + have..HEADER_SIZE + need]) {
                            Ok(0) => return ReadOutcome::Disconnected,
                            Ok(n) => have += n,
                            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                                self.rx_state = RxState::Payload { need, have };
                                return ReadOutcome::WouldBlock;
                            }
                            Err(err) => {
                                debug!(?err, "tcp: read source payload");
                                return ReadOutcome::Disconnected;
                            }
                        }
                    }
                    self.rx_state = RxState::Header { have: 0 };
                    return ReadOutcome::FrameReady(&self.buf[..HEADER_SIZE + need]);
                }
            }
        }
    }

    pub(crate) fn close(&mut self, registry: &Registry) {
        debug!(peer = ?self.peer_addr, "closing source connection");
        let _ = registry.deregister(&mut self.stream);
        let _ = self.stream.shutdown(std::net::Shutdown::Both);
    }
}
