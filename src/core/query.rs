//! Lookup requests that may have to wait for a peer to bond.

use std::{
    fmt::{self, Display, Formatter},
    time::{Duration, Instant},
};

use flume::Sender;

use crate::common::{Node, NodeId};
use crate::discovery::DiscoveryWasShutdown;

/// What the caller of a lookup eventually receives.
pub type QueryReply = Result<Vec<Node>, QueryError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// Identifies a lookup for as long as it is pending, assigned by the discovery loop.
pub struct QueryId(pub(crate) u64);

impl Display for QueryId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug)]
/// A `find_node` request for `target`, addressed to one peer.
///
/// The reply channel is opaque to the deferred queue, only the dispatcher that
/// finally sends the request, or the loop when giving up on it, answers it.
pub struct FindNodeQuery {
    id: QueryId,
    target: NodeId,
    reply: Sender<QueryReply>,
    queued_at: Instant,
}

impl FindNodeQuery {
    pub fn new(id: QueryId, target: NodeId, reply: Sender<QueryReply>) -> Self {
        Self {
            id,
            target,
            reply,
            queued_at: Instant::now(),
        }
    }

    // === Getters ===

    pub fn id(&self) -> QueryId {
        self.id
    }

    pub fn target(&self) -> &NodeId {
        &self.target
    }

    /// When the query was handed to the discovery loop.
    pub fn queued_at(&self) -> Instant {
        self.queued_at
    }

    /// Returns `true` if nobody is waiting for the reply anymore.
    pub fn is_abandoned(&self) -> bool {
        self.reply.is_disconnected()
    }

    // === Public Methods ===

    /// Answer with the nodes the remote peer returned.
    pub fn respond(self, nodes: Vec<Node>) {
        let _ = self.reply.send(Ok(nodes));
    }

    /// Answer with an error.
    pub fn fail(self, error: QueryError) {
        let _ = self.reply.send(Err(error));
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
/// Reasons a lookup did not get dispatched, or did not get an answer.
pub enum QueryError {
    #[error("peer {0} is not known")]
    UnknownPeer(NodeId),

    #[error("peer was evicted before the query was dispatched")]
    Evicted,

    #[error("query was not dispatched within {0:?}")]
    Timeout(Duration),

    #[error("deferred query queue is full ({0} queries)")]
    QueueFull(usize),

    #[error("query was withdrawn")]
    Withdrawn,

    #[error(transparent)]
    Shutdown(#[from] DiscoveryWasShutdown),
}
