use std::time::Instant;

use broker_wire::SourceState;
use indexmap::IndexMap;

/// Opaque 8-byte source identifier, passed through unchanged from the wire.
pub type SourceId = [u8; 8];

/// What the broker currently knows about one source.
///
/// Created on a source's first valid frame, overwritten wholesale on every
/// later one. Never removed by a disconnect: late-joining listeners must
/// still be able to learn about sources seen recently (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceRecord {
    pub id: SourceId,
    pub serial_num: u16,
    pub state: SourceState,
    pub last_received: Instant,
}

/// Upsert-only map from source id to its last reported state, ordered by
/// first-seen so a fresh listener's backfill replays sources in the order
/// the broker first heard from them.
#[derive(Default)]
pub struct SourceRegistry {
    sources: IndexMap<SourceId, SourceRecord>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a new source or overwrites every field of an existing one.
    pub fn update(&mut self, id: SourceId, serial_num: u16, state: SourceState, now: Instant) {
        self.sources.insert(id, SourceRecord { id, serial_num, state, last_received: now });
    }

    pub fn get(&self, id: &SourceId) -> Option<&SourceRecord> {
        self.sources.get(id)
    }

    /// All known sources, in first-seen order.
    pub fn snapshot(&self) -> Vec<SourceRecord> {
        self.sources.values().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> SourceId {
        let mut out = [0u8; 8];
        out.copy_from_slice(s.as_bytes());
        out
    }

    #[test]
    fn update_then_get_round_trips() {
        let mut reg = SourceRegistry::new();
        let now = Instant::now();
        reg.update(id("aaaaaaaa"), 3, SourceState::Active, now);
        let got = reg.get(&id("aaaaaaaa")).unwrap();
        assert_eq!(got.serial_num, 3);
        assert_eq!(got.state, SourceState::Active);
        assert_eq!(got.last_received, now);
    }

    #[test]
    fn update_overwrites_all_fields() {
        let mut reg = SourceRegistry::new();
        let t0 = Instant::now();
        reg.update(id("aaaaaaaa"), 1, SourceState::Idle, t0);
        let t1 = Instant::now();
        reg.update(id("aaaaaaaa"), 2, SourceState::Recharge, t1);
        let got = reg.get(&id("aaaaaaaa")).unwrap();
        assert_eq!(got.serial_num, 2);
        assert_eq!(got.state, SourceState::Recharge);
        assert_eq!(got.last_received, t1);
    }

    #[test]
    fn snapshot_preserves_first_seen_order() {
        let mut reg = SourceRegistry::new();
        let now = Instant::now();
        reg.update(id("bbbbbbbb"), 1, SourceState::Idle, now);
        reg.update(id("aaaaaaaa"), 1, SourceState::Idle, now);
        reg.update(id("bbbbbbbb"), 2, SourceState::Active, now); // re-update, same slot
        let ids: Vec<SourceId> = reg.snapshot().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![id("bbbbbbbb"), id("aaaaaaaa")]);
    }

    #[test]
    fn missing_source_is_none() {
        let reg = SourceRegistry::new();
        assert!(reg.get(&id("zzzzzzzz")).is_none());
    }
}
