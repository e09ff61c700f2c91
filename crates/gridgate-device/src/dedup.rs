//! Duplicate detection for ledger inbox messages.
//!
//! The ledger inbox is polled on an interval and the same message may be
//! observed repeatedly until a newer one lands on the device address. The
//! deduplicator remembers recently seen message digests so each message is
//! handled at most once.

use std::collections::{HashSet, VecDeque};

use gridgate_ledger::MessageDigest;

/// Default number of digests retained before the oldest are evicted.
pub const DEFAULT_DEDUP_CAPACITY: usize = 1024;

/// Bounded set of recently seen message digests, evicted oldest-first.
#[derive(Debug)]
pub struct MessageDeduplicator {
    capacity: usize,
    order: VecDeque<MessageDigest>,
    seen: HashSet<MessageDigest>,
}

impl MessageDeduplicator {
    /// Creates a deduplicator retaining at most `capacity` digests.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            order: VecDeque::with_capacity(capacity.max(1)),
            seen: HashSet::with_capacity(capacity.max(1)),
        }
    }

    /// Returns true if the digest has been marked and not yet evicted.
    pub fn seen(&self, digest: &MessageDigest) -> bool {
        self.seen.contains(digest)
    }

    /// Records a digest, evicting the oldest entry when at capacity.
    pub fn mark(&mut self, digest: MessageDigest) {
        if !self.seen.insert(digest) {
            return;
        }
        self.order.push_back(digest);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
    }

    /// Number of digests currently retained.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true when no digests are retained.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for MessageDeduplicator {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_CAPACITY)
    }
}
