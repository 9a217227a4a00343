//! Bounded set of message ids whose deletion we caused ourselves.
//!
//! When a user resubmits, their previous chat message is deleted by us. The
//! platform reports that deletion like any other, so the id is parked here
//! first and the matching delete event consumes it instead of being treated
//! as a withdrawal.

use crate::types::MessageId;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct SuppressionSet {
    entries: HashMap<MessageId, Instant>,
    /// Insertion order, may contain ids that were already consumed
    order: VecDeque<(MessageId, Instant)>,
    capacity: usize,
    ttl: Duration,
}

impl SuppressionSet {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, message_id: &str) -> bool {
        self.entries.contains_key(message_id)
    }

    pub fn insert(&mut self, message_id: MessageId) {
        self.insert_at(message_id, Instant::now());
    }

    /// Remove the entry if present. Returns true when the id was suppressed.
    pub fn consume(&mut self, message_id: &str) -> bool {
        self.consume_at(message_id, Instant::now())
    }

    fn insert_at(&mut self, message_id: MessageId, now: Instant) {
        self.prune(now);
        self.entries.insert(message_id.clone(), now);
        self.order.push_back((message_id, now));

        while self.entries.len() > self.capacity {
            let Some((oldest, inserted)) = self.order.pop_front() else {
                break;
            };
            if self.entries.get(&oldest) == Some(&inserted) {
                self.entries.remove(&oldest);
                tracing::warn!(
                    "Suppression set full ({}), evicted message {}",
                    self.capacity,
                    oldest
                );
            }
        }
    }

    fn consume_at(&mut self, message_id: &str, now: Instant) -> bool {
        self.prune(now);
        self.entries.remove(message_id).is_some()
    }

    /// Drop expired entries and stale order records from the front
    fn prune(&mut self, now: Instant) {
        while let Some((id, inserted)) = self.order.front() {
            let live = self.entries.get(id) == Some(inserted);
            let expired = now.saturating_duration_since(*inserted) >= self.ttl;

            if live && !expired {
                break;
            }
            if live {
                tracing::debug!("Suppression for message {} expired", id);
                self.entries.remove(id);
            }
            self.order.pop_front();
        }
    }
}
