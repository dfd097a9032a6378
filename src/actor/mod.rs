//! The discovery loop, sole owner of every peer's network state.
//!
//! Runs on its own thread, see [crate::Discovery]. Other threads talk to it
//! through [ActorMessage]s only.

pub(crate) mod config;
mod info;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;

use flume::{Receiver, RecvTimeoutError, Sender};
use tracing::{debug, info, trace, warn};

use crate::common::{ClosestNodes, Node, NodeId, ProximityHash};
use crate::core::{
    FindNodeQuery, Peer, PeerState, QueryDispatcher, QueryError, QueryId, QueryReply, Submission,
};
use crate::discovery::DiscoveryWasShutdown;

pub use config::{Config, MIN_TICK_INTERVAL};
pub use info::Info;

#[derive(Debug)]
pub(crate) struct Actor {
    config: Config,
    peers: HashMap<NodeId, Peer>,
    /// Which peer holds each deferred query.
    deferred_owners: HashMap<QueryId, NodeId>,
    dispatcher: Box<dyn QueryDispatcher>,
    next_query_id: u64,
    last_tick: Instant,
}

impl Actor {
    /// Create the loop state and load the bootstrap nodes as unbonded peers.
    pub fn new(mut config: Config, dispatcher: Box<dyn QueryDispatcher>) -> Self {
        let bootstrap = config.bootstrap.clone();

        if config.tick_interval < MIN_TICK_INTERVAL {
            warn!(
                tick_interval = ?config.tick_interval,
                "Raising tick interval to {:?}",
                MIN_TICK_INTERVAL
            );
            config.tick_interval = MIN_TICK_INTERVAL;
        }

        let mut actor = Actor {
            config,
            peers: HashMap::new(),
            deferred_owners: HashMap::new(),
            dispatcher,
            next_query_id: 0,
            last_tick: Instant::now(),
        };

        for entry in bootstrap {
            match entry.parse::<Node>() {
                Ok(node) => {
                    actor.add_node(node);
                }
                Err(error) => {
                    warn!(?entry, %error, "Skipping invalid bootstrap node");
                }
            }
        }

        actor
    }

    // === Getters ===

    pub fn peers(&self) -> impl Iterator<Item = &Peer> {
        self.peers.values()
    }

    pub fn info(&self) -> Info {
        Info::from(self)
    }

    pub fn address(&self, id: &NodeId) -> Option<SocketAddr> {
        self.peers.get(id).map(|peer| peer.node().addr())
    }

    pub fn state(&self, id: &NodeId) -> Option<PeerState> {
        self.peers.get(id).map(|peer| peer.state())
    }

    /// Up to `count` known peers, nearest to `target` first.
    pub fn closest(&self, target: &ProximityHash, count: usize) -> Vec<Node> {
        let mut closest = ClosestNodes::with_capacity(*target, count.min(self.peers.len()));

        closest.extend(self.peers.values().map(|peer| peer.node().clone()));

        closest.into_iter().collect()
    }

    // === Public Methods ===

    /// Process messages until shutdown, or until every handle is dropped.
    pub fn run(mut self, receiver: Receiver<ActorMessage>) {
        info!(peers = self.peers.len(), "Discovery loop started");

        loop {
            match receiver.recv_timeout(self.config.tick_interval) {
                Ok(message) => {
                    if !self.handle(message) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("Discovery loop stopped after every handle was dropped");
                    self.shutdown();
                    break;
                }
            }

            self.tick(Instant::now());
        }
    }

    /// Returns `false` once the loop should stop.
    fn handle(&mut self, message: ActorMessage) -> bool {
        match message {
            ActorMessage::AddNode(node, sender) => {
                let _ = sender.send(self.add_node(node));
            }
            ActorMessage::FindNode {
                via,
                target,
                reply,
                sender,
            } => {
                let _ = sender.send(self.find_node(&via, target, reply));
            }
            ActorMessage::Withdraw(id, sender) => {
                let _ = sender.send(self.withdraw(id));
            }
            ActorMessage::Bonded(id, sender) => {
                let _ = sender.send(self.bonded(&id));
            }
            ActorMessage::Evict(id, sender) => {
                let _ = sender.send(self.evict(&id));
            }
            ActorMessage::Address(id, sender) => {
                let _ = sender.send(self.address(&id));
            }
            ActorMessage::State(id, sender) => {
                let _ = sender.send(self.state(&id));
            }
            ActorMessage::Closest(target, count, sender) => {
                let _ = sender.send(self.closest(&target, count));
            }
            ActorMessage::Info(sender) => {
                let _ = sender.send(self.info());
            }
            ActorMessage::Shutdown(sender) => {
                self.shutdown();
                let _ = sender.send(());

                return false;
            }
        }

        true
    }

    /// Start tracking a peer as unbonded, returns `false` if it is already known.
    pub fn add_node(&mut self, node: Node) -> bool {
        if self.peers.contains_key(node.id()) {
            return false;
        }

        debug!(id = %node.id(), addr = ?node.addr(), "Added peer");

        self.peers
            .insert(*node.id(), Peer::new(node, self.config.max_deferred_queries));

        true
    }

    /// Send a `find_node` for `target` to the peer `via`, deferring it until
    /// that peer bonds if necessary.
    pub fn find_node(
        &mut self,
        via: &NodeId,
        target: NodeId,
        reply: Sender<QueryReply>,
    ) -> Result<QueryId, QueryError> {
        let peer = self
            .peers
            .get_mut(via)
            .ok_or(QueryError::UnknownPeer(*via))?;

        let id = QueryId(self.next_query_id);
        self.next_query_id += 1;

        match peer.submit(FindNodeQuery::new(id, target, reply)) {
            Submission::Dispatch(query) => {
                trace!(%id, to = ?peer.node().addr(), "Dispatching find_node");
                self.dispatcher.dispatch(peer.node(), query);
            }
            Submission::Deferred => {
                trace!(%id, to = ?peer.node().addr(), "Deferring find_node until bonded");
                self.deferred_owners.insert(id, *via);
            }
            Submission::Rejected(_, error) => {
                debug!(%id, %error, "Rejected find_node");
                return Err(error);
            }
        }

        Ok(id)
    }

    /// Withdraw a deferred query, returns `false` if it was already dispatched or gone.
    pub fn withdraw(&mut self, id: QueryId) -> bool {
        let Some(owner) = self.deferred_owners.remove(&id) else {
            return false;
        };

        match self
            .peers
            .get_mut(&owner)
            .and_then(|peer| peer.withdraw(id))
        {
            Some(query) => {
                trace!(%id, "Withdrew deferred find_node");
                query.fail(QueryError::Withdrawn);
                true
            }
            None => false,
        }
    }

    /// Bonding confirmation for `id`: replay its deferred queries in order.
    ///
    /// Returns the number of replayed queries, or `None` for an unknown peer.
    pub fn bonded(&mut self, id: &NodeId) -> Option<usize> {
        let peer = self.peers.get_mut(id)?;

        let replay = peer.bond();
        let count = replay.len();

        for query in replay {
            self.deferred_owners.remove(&query.id());
            self.dispatcher.dispatch(peer.node(), query);
        }

        debug!(%id, replayed = count, "Peer bonded");

        Some(count)
    }

    /// Forget a peer and fail its deferred queries, returns `false` if unknown.
    pub fn evict(&mut self, id: &NodeId) -> bool {
        let Some(mut peer) = self.peers.remove(id) else {
            return false;
        };

        let discarded = peer.evict();

        debug!(%id, discarded = discarded.len(), "Evicted peer");

        for query in discarded {
            self.deferred_owners.remove(&query.id());
            query.fail(QueryError::Evicted);
        }

        true
    }

    /// Expire deferred queries that waited too long, and drop abandoned ones.
    pub fn tick(&mut self, now: Instant) {
        if now.saturating_duration_since(self.last_tick) < self.config.tick_interval {
            return;
        }
        self.last_tick = now;

        let timeout = self.config.deferred_query_timeout;

        for peer in self.peers.values_mut() {
            for id in peer.remove_abandoned() {
                self.deferred_owners.remove(&id);
            }

            let expired = peer.take_expired(now, timeout);

            if !expired.is_empty() {
                debug!(
                    id = %peer.node().id(),
                    expired = expired.len(),
                    "Deferred find_node queries timed out"
                );
            }

            for query in expired {
                self.deferred_owners.remove(&query.id());
                query.fail(QueryError::Timeout(timeout));
            }
        }
    }

    /// Fail every deferred query, the loop is going away.
    fn shutdown(&mut self) {
        for (_, mut peer) in self.peers.drain() {
            for query in peer.evict() {
                query.fail(QueryError::Shutdown(DiscoveryWasShutdown));
            }
        }

        self.deferred_owners.clear();

        info!("Discovery loop shutdown");
    }
}

#[derive(Debug)]
pub(crate) enum ActorMessage {
    AddNode(Node, Sender<bool>),
    FindNode {
        via: NodeId,
        target: NodeId,
        reply: Sender<QueryReply>,
        sender: Sender<Result<QueryId, QueryError>>,
    },
    Withdraw(QueryId, Sender<bool>),
    Bonded(NodeId, Sender<Option<usize>>),
    Evict(NodeId, Sender<bool>),
    Address(NodeId, Sender<Option<SocketAddr>>),
    State(NodeId, Sender<Option<PeerState>>),
    Closest(ProximityHash, usize, Sender<Vec<Node>>),
    Info(Sender<Info>),
    Shutdown(Sender<()>),
}
