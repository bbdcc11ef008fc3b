use std::{io, net::SocketAddr};

use indexmap::IndexMap;
use mio::{
    Events, Interest, Poll, Token,
    net::TcpListener,
};
use tracing::{error, info};

use crate::{
    listener::ListenerConn,
    outbound::ConnState,
    source::{ReadOutcome, SourceConn},
};

/// Event emitted by [`Transport::poll_with`] for a single notable IO
/// occurrence. Borrowed frame data is only valid for the duration of the
/// callback that receives it.
pub enum PollEvent<'a> {
    SourceAccepted { token: Token, peer_addr: SocketAddr },
    SourceFrame { token: Token, frame: &'a [u8] },
    SourceClosed { token: Token },
    ListenerAccepted { token: Token, peer_addr: SocketAddr },
    ListenerClosed { token: Token },
}

/// Owns both listening sockets and every accepted connection, driving all
/// of them from a single `mio::Poll`. There is exactly one owner for this
/// state (the caller that holds the `Transport`), matching the single
/// writer per connection-table mandated by the dispatch design.
pub struct Transport {
    poll: Poll,
    events: Events,
    sources_listener: Option<(Token, TcpListener)>,
    listeners_listener: Option<(Token, TcpListener)>,
    source_conns: IndexMap<Token, SourceConn>,
    listener_conns: IndexMap<Token, ListenerConn>,
    next_token: usize,
}

impl Transport {
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            poll: Poll::new()?,
            events: Events::with_capacity(256),
            sources_listener: None,
            listeners_listener: None,
            source_conns: IndexMap::new(),
            listener_conns: IndexMap::new(),
            next_token: 0,
        })
    }

    fn alloc_token(&mut self) -> Token {
        let token = Token(self.next_token);
        self.next_token += 1;
        token
    }

    /// Starts listening for source connections on `addr`.
    pub fn bind_sources(&mut self, addr: SocketAddr) -> io::Result<Token> {
        let mut listener = TcpListener::bind(addr)?;
        let token = self.alloc_token();
        self.poll.registry().register(&mut listener, token, Interest::READABLE)?;
        self.sources_listener = Some((token, listener));
        Ok(token)
    }

    /// Starts listening for listener connections on `addr`.
    pub fn bind_listeners(&mut self, addr: SocketAddr) -> io::Result<Token> {
        let mut listener = TcpListener::bind(addr)?;
        let token = self.alloc_token();
        self.poll.registry().register(&mut listener, token, Interest::READABLE)?;
        self.listeners_listener = Some((token, listener));
        Ok(token)
    }

    /// Writes (or enqueues) an ack to a source connection.
    /// Returns `false` if the connection was dead and has been torn down;
    /// callers should not expect a matching [`PollEvent::SourceClosed`] for
    /// this specific call, the teardown already happened synchronously.
    pub fn ack_source(&mut self, token: Token, ack: &[u8]) -> bool {
        let Some(conn) = self.source_conns.get_mut(&token) else { return false };
        if conn.send_ack(self.poll.registry(), token, ack) == ConnState::Disconnected {
            self.drop_source(token);
            return false;
        }
        true
    }

    /// Writes (or enqueues) a line to a listener connection.
    /// Returns `false` on the same terms as [`Transport::ack_source`].
    pub fn send_listener(&mut self, token: Token, bytes: &[u8]) -> bool {
        let Some(conn) = self.listener_conns.get_mut(&token) else { return false };
        if conn.send(self.poll.registry(), token, bytes) == ConnState::Disconnected {
            self.drop_listener(token);
            return false;
        }
        true
    }

    fn drop_source(&mut self, token: Token) {
        if let Some(mut conn) = self.source_conns.shift_remove(&token) {
            conn.close(self.poll.registry());
        }
    }

    fn drop_listener(&mut self, token: Token) {
        if let Some(mut conn) = self.listener_conns.shift_remove(&token) {
            conn.close(self.poll.registry());
        }
    }

    /// Blocks until at least one IO event is ready, then dispatches every
    /// event collected in that wakeup to `handler`. There is no timeout:
    /// an idle broker sleeps in the kernel rather than spinning.
    pub fn poll_with<F>(&mut self, mut handler: F) -> io::Result<()>
    where
        F: for<'a> FnMut(PollEvent<'a>),
    {
        self.poll.poll(&mut self.events, None)?;
        let tokens: Vec<Token> = self.events.iter().map(|e| e.token()).collect();

        for token in tokens {
            if self.sources_listener.as_ref().is_some_and(|(t, _)| *t == token) {
                self.accept_sources(&mut handler);
            } else if self.listeners_listener.as_ref().is_some_and(|(t, _)| *t == token) {
                self.accept_listeners(&mut handler);
            } else if self.source_conns.contains_key(&token) {
                self.service_source(token, &mut handler);
            } else if self.listener_conns.contains_key(&token) {
                self.service_listener(token, &mut handler);
            }
        }
        Ok(())
    }

    fn accept_sources<F>(&mut self, handler: &mut F)
    where
        F: for<'a> FnMut(PollEvent<'a>),
    {
        let Some((_, listener)) = &self.sources_listener else { return };
        loop {
            match listener.accept() {
                Ok((mut stream, peer_addr)) => {
                    let token = self.alloc_token();
                    if let Err(err) =
                        self.poll.registry().register(&mut stream, token, Interest::READABLE)
                    {
                        error!(?err, "couldn't register source connection");
                        continue;
                    }
                    match SourceConn::new(stream, peer_addr) {
                        Ok(conn) => {
                            info!(?peer_addr, "source connected");
                            self.source_conns.insert(token, conn);
                            handler(PollEvent::SourceAccepted { token, peer_addr });
                        }
                        Err(err) => error!(?err, "couldn't set up source connection"),
                    }
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(err) => {
                    error!(?err, "error accepting source connection");
                    break;
                }
            }
        }
    }

    fn accept_listeners<F>(&mut self, handler: &mut F)
    where
        F: for<'a> FnMut(PollEvent<'a>),
    {
        let Some((_, listener)) = &self.listeners_listener else { return };
        loop {
            match listener.accept() {
                Ok((mut stream, peer_addr)) => {
                    let token = self.alloc_token();
                    if let Err(err) =
                        self.poll.registry().register(&mut stream, token, Interest::READABLE)
                    {
                        error!(?err, "couldn't register listener connection");
                        continue;
                    }
                    match ListenerConn::new(stream, peer_addr) {
                        Ok(conn) => {
                            info!(?peer_addr, "listener connected");
                            self.listener_conns.insert(token, conn);
                            handler(PollEvent::ListenerAccepted { token, peer_addr });
                        }
                        Err(err) => error!(?err, "couldn't set up listener connection"),
                    }
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(err) => {
                    error!(?err, "error accepting listener connection");
                    break;
                }
            }
        }
    }

    fn service_source<F>(&mut self, token: Token, handler: &mut F)
    where
        F: for<'a> FnMut(PollEvent<'a>),
    {
        loop {
            let Some(conn) = self.source_conns.get_mut(&token) else { return };
            match conn.read_frame() {
                ReadOutcome::FrameReady(frame) => {
                    handler(PollEvent::SourceFrame { token, frame });
                }
                ReadOutcome::WouldBlock => break,
                ReadOutcome::Disconnected => {
                    self.drop_source(token);
                    handler(PollEvent::SourceClosed { token });
                    return;
                }
            }
        }

        if let Some(conn) = self.source_conns.get_mut(&token)
            && conn.on_writable(self.poll.registry(), token) == ConnState::Disconnected
        {
            self.drop_source(token);
            handler(PollEvent::SourceClosed { token });
        }
    }

    fn service_listener<F>(&mut self, token: Token, handler: &mut F)
    where
        F: for<'a> FnMut(PollEvent<'a>),
    {
        if let Some(conn) = self.listener_conns.get_mut(&token)
            && conn.discard_readable() == ConnState::Disconnected
        {
            self.drop_listener(token);
            handler(PollEvent::ListenerClosed { token });
            return;
        }

        if let Some(conn) = self.listener_conns.get_mut(&token)
            && conn.on_writable(self.poll.registry(), token) == ConnState::Disconnected
        {
            self.drop_listener(token);
            handler(PollEvent::ListenerClosed { token });
        }
    }
}
