use std::time::Instant;

use broker_registry::{ListenerId, ListenerRegistry, SourceId, SourceRegistry};
use broker_transport::{PollEvent, Token};
use broker_wire::{Ack, TelemetryItem, encode_ack, parse_source_frame};
use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::{
    actions::{Action, ActionQueue},
    lines::{announce_line, telemetry_line},
};

/// Owns both registries and the source-id/listener-id ↔ `Token` mappings
/// that realize §3's "connection tables" on top of the transport's opaque
/// tokens, and turns every transport event into registry mutations plus
/// queued outbound bytes.
#[derive(Default)]
pub struct Dispatcher {
    sources: SourceRegistry,
    listeners: ListenerRegistry,

    source_conns: IndexMap<SourceId, Token>,
    source_tokens: IndexMap<Token, SourceId>,

    listener_conns: IndexMap<ListenerId, Token>,
    listener_tokens: IndexMap<Token, ListenerId>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one transport event into the dispatcher's state, queuing any
    /// resulting writes into `actions`. `now` is threaded through from the
    /// caller rather than read here, keeping this function free of wall-clock
    /// side effects (and trivially testable).
    pub fn handle_event(&mut self, event: PollEvent<'_>, now: Instant, actions: &mut ActionQueue) {
        match event {
            PollEvent::SourceAccepted { peer_addr, .. } => {
                info!(?peer_addr, "source accepted, awaiting first frame");
            }
            PollEvent::SourceFrame { token, frame } => self.on_source_frame(token, frame, now, actions),
            PollEvent::SourceClosed { token } => self.on_source_closed(token),
            PollEvent::ListenerAccepted { token, peer_addr } => {
                info!(?peer_addr, "listener accepted");
                self.on_listener_accepted(token, now, actions);
            }
            PollEvent::ListenerClosed { token } => self.on_listener_closed(token),
        }
    }

    fn on_source_frame(&mut self, token: Token, bytes: &[u8], now: Instant, actions: &mut ActionQueue) {
        let frame = match parse_source_frame(bytes) {
            Ok(frame) => frame,
            Err(err) => {
                debug!(?err, "rejecting malformed source frame");
                actions.push(Action::AckSource { token, ack: encode_ack(Ack::Failure) });
                return;
            }
        };

        self.sources.update(frame.source_id, frame.serial_num, frame.state, now);

        // Overwrite unconditionally: a source may re-announce on a fresh TCP
        // connection, and the newest connection always wins (§4.4, §7).
        let previous = self.source_conns.insert(frame.source_id, token);
        if previous.is_some_and(|prev| prev != token) {
            debug!(source = ?frame.source_id, "source reconnected on a new socket");
        }
        self.source_tokens.insert(token, frame.source_id);

        actions.push(Action::AckSource {
            token,
            ack: encode_ack(Ack::Success { serial_num: frame.serial_num }),
        });

        self.fan_out(frame.source_id, &frame.items, now, actions);
    }

    fn fan_out(&mut self, source_id: SourceId, items: &[TelemetryItem], now: Instant, actions: &mut ActionQueue) {
        let Some(record) = self.sources.get(&source_id).copied() else { return };

        for listener in self.listeners.snapshot() {
            let Some(&token) = self.listener_conns.get(&listener.id) else { continue };

            if !self.listeners.is_notified(listener.id, &source_id) {
                actions.push(Action::SendListener { token, bytes: announce_line(&record, now) });
                self.listeners.mark_notified(listener.id, source_id);
            }

            for item in items {
                if let TelemetryItem::Valid { name, value } = item {
                    actions.push(Action::SendListener {
                        token,
                        bytes: telemetry_line(&source_id, name, *value),
                    });
                }
            }
        }
    }

    fn on_source_closed(&mut self, token: Token) {
        let Some(source_id) = self.source_tokens.shift_remove(&token) else { return };
        // Only remove the connection-table entry if it still points at the
        // connection that just closed — a newer reconnect may have already
        // overwritten it (see `DESIGN.md`, §9's connection-table note).
        if self.source_conns.get(&source_id) == Some(&token) {
            self.source_conns.shift_remove(&source_id);
        }
        // Source Registry entry is retained deliberately (§4.4).
    }

    fn on_listener_accepted(&mut self, token: Token, now: Instant, actions: &mut ActionQueue) {
        let listener_id = self.listeners.add();
        self.listener_conns.insert(listener_id, token);
        self.listener_tokens.insert(token, listener_id);

        let snapshot = self.sources.snapshot();
        if snapshot.is_empty() {
            return;
        }

        let mut backfill = Vec::new();
        for record in &snapshot {
            backfill.extend_from_slice(&announce_line(record, now));
        }
        actions.push(Action::SendListener { token, bytes: backfill });

        for record in snapshot {
            self.listeners.mark_notified(listener_id, record.id);
        }
    }

    fn on_listener_closed(&mut self, token: Token) {
        let Some(listener_id) = self.listener_tokens.shift_remove(&token) else {
            warn!(?token, "closed token was not a tracked listener");
            return;
        };
        self.listener_conns.shift_remove(&listener_id);
        self.listeners.remove(listener_id);
    }
}
