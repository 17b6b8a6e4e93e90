//! Id-based suppression of redundant frame application.
//!
//! The live feed and the history pull both feed one cache per session, so a
//! reconciled message's later live echo is suppressed and a live-rendered
//! message is not re-applied by a history pass.

use std::collections::{HashSet, VecDeque};

use spotline_proto::MessageId;

/// Default id capacity.
///
/// Room sessions are short-lived; the bound is a safety valve for long-lived
/// sessions, not a correctness lever.
pub const DEFAULT_DEDUP_CAPACITY: usize = 1024;

/// Bounded set of seen server-assigned message ids.
///
/// Ids are evicted oldest-first once the bound is reached.
#[derive(Debug, Clone)]
pub struct DedupCache {
    seen: HashSet<MessageId>,
    order: VecDeque<MessageId>,
    capacity: usize,
}

impl DedupCache {
    /// Cache bounded to `capacity` ids (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            seen: HashSet::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Whether a frame carrying this id should be applied.
    ///
    /// `None` (system, enter, leave, and id-less chat frames) always
    /// applies and records nothing; those are never deduplicated by id.
    /// A known id is rejected; an unknown id is recorded and accepted.
    pub fn should_apply(&mut self, id: Option<MessageId>) -> bool {
        match id {
            None => true,
            Some(id) => self.insert(id),
        }
    }

    /// Records a history-sourced id so a later live echo is suppressed.
    pub fn record(&mut self, id: MessageId) {
        self.insert(id);
    }

    /// Ids currently tracked.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Whether no id has been recorded.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    fn insert(&mut self, id: MessageId) -> bool {
        if !self.seen.insert(id) {
            return false;
        }
        self.order.push_back(id);
        if self.order.len() > self.capacity
            && let Some(evicted) = self.order.pop_front()
        {
            self.seen.remove(&evicted);
        }
        true
    }
}

impl Default for DedupCache {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_CAPACITY)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn absent_ids_always_apply() {
        let mut cache = DedupCache::default();
        assert!(cache.should_apply(None));
        assert!(cache.should_apply(None));
        assert!(cache.is_empty());
    }

    #[test]
    fn first_sighting_applies_later_sightings_do_not() {
        let mut cache = DedupCache::default();
        assert!(cache.should_apply(Some(2)));
        assert!(!cache.should_apply(Some(2)));
        assert!(!cache.should_apply(Some(2)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn recorded_history_ids_suppress_live_echoes() {
        let mut cache = DedupCache::default();
        cache.record(1);
        cache.record(2);
        assert!(!cache.should_apply(Some(2)));
        assert!(cache.should_apply(Some(3)));
    }

    #[test]
    fn eviction_is_oldest_first() {
        let mut cache = DedupCache::new(2);
        cache.record(1);
        cache.record(2);
        cache.record(3);

        // Id 1 was evicted; 2 and 3 remain tracked.
        assert!(cache.should_apply(Some(1)));
        assert!(!cache.should_apply(Some(3)));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut cache = DedupCache::new(0);
        assert!(cache.should_apply(Some(1)));
        assert!(!cache.should_apply(Some(1)));
    }
}
