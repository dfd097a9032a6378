//! Handle to a discovery loop running on its own thread.

use std::{net::SocketAddr, thread, time::Duration};

use flume::{Receiver, RecvTimeoutError, Sender};

use crate::{
    actor::{config::Config, Actor, ActorMessage, Info},
    common::{Node, NodeId, ProximityHash},
    core::{PeerState, QueryDispatcher, QueryError, QueryId, QueryReply},
};

#[derive(Debug, Clone)]
/// Cloneable handle to the discovery loop.
///
/// The loop thread owns every peer's bonding state and deferred queries;
/// this handle only sends it messages. The loop stops when [Discovery::shutdown]
/// is called or when the last handle is dropped.
pub struct Discovery(pub(crate) Sender<ActorMessage>);

#[derive(Debug, Default, Clone)]
/// Discovery builder
pub struct DiscoveryBuilder(Config);

impl DiscoveryBuilder {
    /// Set bootstrapping nodes, replacing any set before.
    pub fn bootstrap<T: ToString>(&mut self, bootstrap: &[T]) -> &mut Self {
        self.0.bootstrap = bootstrap.iter().map(|b| b.to_string()).collect();

        self
    }

    /// Add more bootstrap nodes to the ones already set.
    pub fn extra_bootstrap<T: ToString>(&mut self, extra_bootstrap: &[T]) -> &mut Self {
        self.0
            .bootstrap
            .extend(extra_bootstrap.iter().map(|b| b.to_string()));

        self
    }

    /// Set how long a lookup may wait for its peer to bond.
    pub fn deferred_query_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.0.deferred_query_timeout = timeout;

        self
    }

    /// Set the maximum number of deferred lookups per peer.
    pub fn max_deferred_queries(&mut self, max: usize) -> &mut Self {
        self.0.max_deferred_queries = max;

        self
    }

    /// Set the maximum time the loop blocks waiting for a message.
    pub fn tick_interval(&mut self, interval: Duration) -> &mut Self {
        self.0.tick_interval = interval;

        self
    }

    /// Spawn the discovery loop with the given dispatcher.
    pub fn build<D: QueryDispatcher>(&self, dispatcher: D) -> Result<Discovery, std::io::Error> {
        Discovery::new(self.0.clone(), dispatcher)
    }
}

impl Discovery {
    /// Returns a builder to edit settings before spawning the loop.
    pub fn builder() -> DiscoveryBuilder {
        DiscoveryBuilder::default()
    }

    /// Spawn a discovery loop thread, dispatching lookups through `dispatcher`.
    pub fn new<D: QueryDispatcher>(config: Config, dispatcher: D) -> Result<Self, std::io::Error> {
        let (sender, receiver) = flume::unbounded();

        let actor = Actor::new(config, Box::new(dispatcher));

        thread::Builder::new()
            .name("discovery-actor".to_string())
            .spawn(move || actor.run(receiver))?;

        Ok(Discovery(sender))
    }

    // === Getters ===

    /// Information and statistics about the discovery loop.
    pub fn info(&self) -> Result<Info, DiscoveryWasShutdown> {
        self.request(ActorMessage::Info)
    }

    /// UDP endpoint of a known peer.
    pub fn address(&self, id: &NodeId) -> Result<Option<SocketAddr>, DiscoveryWasShutdown> {
        self.request(|sender| ActorMessage::Address(*id, sender))
    }

    /// Bonding state of a known peer, `None` if unknown or evicted.
    pub fn peer_state(&self, id: &NodeId) -> Result<Option<PeerState>, DiscoveryWasShutdown> {
        self.request(|sender| ActorMessage::State(*id, sender))
    }

    /// Up to `count` known peers ordered nearest-first to `target`.
    pub fn closest(
        &self,
        target: ProximityHash,
        count: usize,
    ) -> Result<Vec<Node>, DiscoveryWasShutdown> {
        self.request(|sender| ActorMessage::Closest(target, count, sender))
    }

    // === Public Methods ===

    /// Start tracking a peer, unbonded. Returns `false` if it was already known.
    pub fn add_node(&self, node: Node) -> Result<bool, DiscoveryWasShutdown> {
        self.request(|sender| ActorMessage::AddNode(node, sender))
    }

    /// Ask the peer `via` for the nodes closest to `target`.
    ///
    /// If `via` is not bonded yet the query waits in that peer's queue, and is
    /// sent once [Discovery::bonded] is called for it.
    pub fn find_node(&self, via: &NodeId, target: NodeId) -> Result<PendingQuery, QueryError> {
        let (reply, receiver) = flume::bounded(1);

        let id = self.request(|sender| ActorMessage::FindNode {
            via: *via,
            target,
            reply,
            sender,
        })??;

        Ok(PendingQuery { id, receiver })
    }

    /// Withdraw a query that is still deferred.
    ///
    /// Returns `false` if it was already dispatched, answered or expired.
    pub fn withdraw(&self, id: QueryId) -> Result<bool, DiscoveryWasShutdown> {
        self.request(|sender| ActorMessage::Withdraw(id, sender))
    }

    /// Notify the loop that the peer `id` is bonded, replaying its deferred queries.
    ///
    /// Returns how many queries were replayed, or `None` if the peer is unknown.
    pub fn bonded(&self, id: &NodeId) -> Result<Option<usize>, DiscoveryWasShutdown> {
        self.request(|sender| ActorMessage::Bonded(*id, sender))
    }

    /// Forget a peer, its deferred queries fail with [QueryError::Evicted].
    pub fn evict(&self, id: &NodeId) -> Result<bool, DiscoveryWasShutdown> {
        self.request(|sender| ActorMessage::Evict(*id, sender))
    }

    /// Shutdown the loop and wait for it to stop.
    pub fn shutdown(&self) {
        let _ = self.request(ActorMessage::Shutdown);
    }

    // === Private Methods ===

    fn request<T>(
        &self,
        message: impl FnOnce(Sender<T>) -> ActorMessage,
    ) -> Result<T, DiscoveryWasShutdown> {
        let (sender, receiver) = flume::bounded::<T>(1);

        self.0
            .send(message(sender))
            .map_err(|_| DiscoveryWasShutdown)?;

        receiver.recv().map_err(|_| DiscoveryWasShutdown)
    }
}

#[derive(Debug)]
/// A `find_node` handed to the discovery loop, deferred or already dispatched.
pub struct PendingQuery {
    pub(crate) id: QueryId,
    pub(crate) receiver: Receiver<QueryReply>,
}

impl PendingQuery {
    pub fn id(&self) -> QueryId {
        self.id
    }

    /// Block until the query is answered or given up on.
    pub fn recv(&self) -> QueryReply {
        self.receiver.recv().unwrap_or(Err(QueryError::Shutdown(DiscoveryWasShutdown)))
    }

    /// Like [PendingQuery::recv], but returns `None` if nothing arrived within `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<QueryReply> {
        match self.receiver.recv_timeout(timeout) {
            Ok(reply) => Some(reply),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                Some(Err(QueryError::Shutdown(DiscoveryWasShutdown)))
            }
        }
    }

    #[cfg(feature = "async")]
    /// Async version of [PendingQuery::recv].
    pub async fn recv_async(&self) -> QueryReply {
        self.receiver
            .recv_async()
            .await
            .unwrap_or(Err(QueryError::Shutdown(DiscoveryWasShutdown)))
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("The discovery loop was shutdown")]
/// The discovery loop thread is gone.
pub struct DiscoveryWasShutdown;
