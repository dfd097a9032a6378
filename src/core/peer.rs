//! Network state of a single peer, owned by the discovery loop.

use std::time::{Duration, Instant};

use crate::common::Node;

use super::deferred::DeferredQueries;
use super::query::{FindNodeQuery, QueryError, QueryId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Bonding status of a peer as far as lookups are concerned.
pub enum PeerState {
    /// Liveness not confirmed yet, lookups are deferred.
    Unbonded,
    /// Lookups are dispatched right away.
    Bonded,
    /// Dropped from the table, pending lookups were discarded.
    Evicted,
}

#[derive(Debug)]
/// What to do with a query submitted to a [Peer].
pub enum Submission {
    /// The peer is bonded, send the query now.
    Dispatch(FindNodeQuery),
    /// Queued until the peer bonds.
    Deferred,
    /// Not accepted, the query should be failed with the error.
    Rejected(FindNodeQuery, QueryError),
}

#[derive(Debug)]
/// A [Node] together with its bonding state and deferred lookups.
///
/// Not `Clone` and never shared: the discovery loop owns every `Peer` and
/// other threads only reach it through [crate::Discovery] messages.
pub struct Peer {
    node: Node,
    state: PeerState,
    deferred: DeferredQueries,
}

impl Peer {
    /// A new, unbonded peer.
    pub fn new(node: Node, max_deferred_queries: usize) -> Self {
        Self {
            node,
            state: PeerState::Unbonded,
            deferred: DeferredQueries::new(max_deferred_queries),
        }
    }

    // === Getters ===

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn state(&self) -> PeerState {
        self.state
    }

    pub fn deferred(&self) -> &DeferredQueries {
        &self.deferred
    }

    // === Public Methods ===

    /// Queue a query until this peer bonds.
    ///
    /// Hands the query back if the queue is full, or if the peer is not
    /// [PeerState::Unbonded]: a bonded peer would never replay it and an
    /// evicted one already discarded its queue. Use [Peer::submit] to route a
    /// query by state.
    pub fn defer_query(&mut self, query: FindNodeQuery) -> Result<(), FindNodeQuery> {
        if self.state != PeerState::Unbonded {
            return Err(query);
        }

        self.deferred.push(query)
    }

    /// Route a query according to the current state.
    pub fn submit(&mut self, query: FindNodeQuery) -> Submission {
        match self.state {
            PeerState::Bonded => Submission::Dispatch(query),
            PeerState::Evicted => Submission::Rejected(query, QueryError::Evicted),
            PeerState::Unbonded => match self.defer_query(query) {
                Ok(()) => Submission::Deferred,
                Err(query) => {
                    let capacity = self.deferred.capacity();
                    Submission::Rejected(query, QueryError::QueueFull(capacity))
                }
            },
        }
    }

    pub fn withdraw(&mut self, id: QueryId) -> Option<FindNodeQuery> {
        self.deferred.withdraw(id)
    }

    /// Unbonded -> Bonded.
    ///
    /// Returns the deferred queries in insertion order, they must be dispatched
    /// before any query submitted afterwards. Empty if the peer was not unbonded.
    pub fn bond(&mut self) -> Vec<FindNodeQuery> {
        if self.state != PeerState::Unbonded {
            return Vec::new();
        }

        self.state = PeerState::Bonded;

        self.deferred.drain().collect()
    }

    /// Any state -> Evicted, returns the discarded queries.
    pub fn evict(&mut self) -> Vec<FindNodeQuery> {
        self.state = PeerState::Evicted;

        self.deferred.drain().collect()
    }

    pub fn take_expired(&mut self, now: Instant, timeout: Duration) -> Vec<FindNodeQuery> {
        self.deferred.take_expired(now, timeout)
    }

    pub fn remove_abandoned(&mut self) -> Vec<QueryId> {
        self.deferred.remove_abandoned()
    }
}
