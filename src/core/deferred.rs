//! FIFO of lookups waiting for a peer to bond.

use std::collections::{vec_deque, VecDeque};
use std::time::{Duration, Instant};

use super::query::{FindNodeQuery, QueryId};

#[derive(Debug)]
/// Deferred queries of a single peer, in insertion order.
pub struct DeferredQueries {
    queue: VecDeque<FindNodeQuery>,
    capacity: usize,
}

impl DeferredQueries {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            capacity,
        }
    }

    // === Getters ===

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Ids of the queued queries, oldest first.
    pub fn ids(&self) -> impl Iterator<Item = QueryId> + '_ {
        self.queue.iter().map(|query| query.id())
    }

    // === Public Methods ===

    /// Append a query, or hand it back if the queue is full.
    pub fn push(&mut self, query: FindNodeQuery) -> Result<(), FindNodeQuery> {
        if self.queue.len() >= self.capacity {
            return Err(query);
        }

        self.queue.push_back(query);

        Ok(())
    }

    /// Remove a query by id, leaving the order of the rest untouched.
    pub fn withdraw(&mut self, id: QueryId) -> Option<FindNodeQuery> {
        let index = self.queue.iter().position(|query| query.id() == id)?;

        self.queue.remove(index)
    }

    /// Remove every query, oldest first.
    pub fn drain(&mut self) -> vec_deque::Drain<'_, FindNodeQuery> {
        self.queue.drain(..)
    }

    /// Remove queries that waited at least `timeout`.
    pub fn take_expired(&mut self, now: Instant, timeout: Duration) -> Vec<FindNodeQuery> {
        let mut expired = Vec::new();

        // `queued_at` never decreases along the queue.
        while let Some(oldest) = self.queue.front() {
            if now.saturating_duration_since(oldest.queued_at()) < timeout {
                break;
            }

            if let Some(query) = self.queue.pop_front() {
                expired.push(query);
            }
        }

        expired
    }

    /// Drop queries whose callers stopped waiting, returns their ids.
    pub fn remove_abandoned(&mut self) -> Vec<QueryId> {
        let mut removed = Vec::new();

        self.queue.retain(|query| {
            if query.is_abandoned() {
                removed.push(query.id());
                false
            } else {
                true
            }
        });

        removed
    }
}
