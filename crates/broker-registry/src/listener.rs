use std::collections::HashSet;

use indexmap::IndexMap;

use crate::source::SourceId;

/// Broker-assigned, strictly increasing listener identifier.
pub type ListenerId = u64;

/// One connected listener's view of which sources it has already been told
/// about.
#[derive(Debug, Clone, Default)]
pub struct ListenerRecord {
    pub id: ListenerId,
    pub sources_notified: HashSet<SourceId>,
}

/// Tracks every live listener and, per listener, the set of sources it has
/// already been sent an announce line for.
///
/// Ids are assigned in strictly increasing order and never reused, so
/// insertion order into the backing map always matches ascending id order
/// even across removals — `snapshot` relies on this instead of sorting.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: IndexMap<ListenerId, ListenerRecord>,
    next_id: ListenerId,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh listener id with an empty notified set.
    pub fn add(&mut self) -> ListenerId {
        let id = self.next_id;
        self.next_id += 1;
        self.listeners.insert(id, ListenerRecord { id, sources_notified: HashSet::new() });
        id
    }

    /// Idempotent: a no-op if `listener_id` is already gone.
    pub fn remove(&mut self, listener_id: ListenerId) {
        self.listeners.shift_remove(&listener_id);
    }

    /// No-op if `source_id` is already in the listener's notified set.
    pub fn mark_notified(&mut self, listener_id: ListenerId, source_id: SourceId) {
        if let Some(record) = self.listeners.get_mut(&listener_id) {
            record.sources_notified.insert(source_id);
        }
    }

    pub fn is_notified(&self, listener_id: ListenerId, source_id: &SourceId) -> bool {
        self.listeners.get(&listener_id).is_some_and(|r| r.sources_notified.contains(source_id))
    }

    /// Every live listener, ascending by id.
    pub fn snapshot(&self) -> Vec<ListenerRecord> {
        self.listeners.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid(s: &str) -> SourceId {
        let mut out = [0u8; 8];
        out.copy_from_slice(s.as_bytes());
        out
    }

    #[test]
    fn add_allocates_strictly_increasing_ids() {
        let mut reg = ListenerRegistry::new();
        assert_eq!(reg.add(), 0);
        assert_eq!(reg.add(), 1);
        assert_eq!(reg.add(), 2);
    }

    #[test]
    fn remove_is_idempotent() {
        let mut reg = ListenerRegistry::new();
        let id = reg.add();
        reg.remove(id);
        reg.remove(id); // second call is a no-op, not a panic
        assert!(reg.snapshot().is_empty());
    }

    #[test]
    fn mark_notified_and_is_notified() {
        let mut reg = ListenerRegistry::new();
        let id = reg.add();
        assert!(!reg.is_notified(id, &sid("aaaaaaaa")));
        reg.mark_notified(id, sid("aaaaaaaa"));
        assert!(reg.is_notified(id, &sid("aaaaaaaa")));
        // duplicate mark is a no-op
        reg.mark_notified(id, sid("aaaaaaaa"));
        assert_eq!(reg.snapshot()[0].sources_notified.len(), 1);
    }

    #[test]
    fn mark_notified_on_unknown_listener_is_noop() {
        let mut reg = ListenerRegistry::new();
        reg.mark_notified(999, sid("aaaaaaaa")); // must not panic
    }

    #[test]
    fn snapshot_is_ascending_by_id_even_after_removal() {
        let mut reg = ListenerRegistry::new();
        let a = reg.add();
        let b = reg.add();
        let c = reg.add();
        reg.remove(a);
        let d = reg.add();
        let ids: Vec<ListenerId> = reg.snapshot().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![b, c, d]);
    }
}
