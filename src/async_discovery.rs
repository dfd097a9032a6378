//! AsyncDiscovery handle.

use std::net::SocketAddr;

use flume::Sender;

use crate::{
    actor::{ActorMessage, Info},
    common::{Node, NodeId, ProximityHash},
    core::{PeerState, QueryError, QueryId},
    discovery::{Discovery, DiscoveryWasShutdown, PendingQuery},
};

impl Discovery {
    /// Return an async version of the Discovery handle.
    pub fn as_async(self) -> AsyncDiscovery {
        AsyncDiscovery(self)
    }
}

#[derive(Debug, Clone)]
/// Async version of the [Discovery] handle.
pub struct AsyncDiscovery(Discovery);

impl AsyncDiscovery {
    // === Getters ===

    /// Information and statistics about the discovery loop.
    pub async fn info(&self) -> Result<Info, DiscoveryWasShutdown> {
        self.request(ActorMessage::Info).await
    }

    /// UDP endpoint of a known peer.
    pub async fn address(&self, id: &NodeId) -> Result<Option<SocketAddr>, DiscoveryWasShutdown> {
        self.request(|sender| ActorMessage::Address(*id, sender))
            .await
    }

    /// Bonding state of a known peer, `None` if unknown or evicted.
    pub async fn peer_state(
        &self,
        id: &NodeId,
    ) -> Result<Option<PeerState>, DiscoveryWasShutdown> {
        self.request(|sender| ActorMessage::State(*id, sender))
            .await
    }

    /// Up to `count` known peers ordered nearest-first to `target`.
    pub async fn closest(
        &self,
        target: ProximityHash,
        count: usize,
    ) -> Result<Vec<Node>, DiscoveryWasShutdown> {
        self.request(|sender| ActorMessage::Closest(target, count, sender))
            .await
    }

    // === Public Methods ===

    /// See [Discovery::add_node].
    pub async fn add_node(&self, node: Node) -> Result<bool, DiscoveryWasShutdown> {
        self.request(|sender| ActorMessage::AddNode(node, sender))
            .await
    }

    /// See [Discovery::find_node], await the answer with [PendingQuery::recv_async].
    pub async fn find_node(&self, via: &NodeId, target: NodeId) -> Result<PendingQuery, QueryError> {
        let (reply, receiver) = flume::bounded(1);

        let id = self
            .request(|sender| ActorMessage::FindNode {
                via: *via,
                target,
                reply,
                sender,
            })
            .await??;

        Ok(PendingQuery { id, receiver })
    }

    /// See [Discovery::withdraw].
    pub async fn withdraw(&self, id: QueryId) -> Result<bool, DiscoveryWasShutdown> {
        self.request(|sender| ActorMessage::Withdraw(id, sender))
            .await
    }

    /// See [Discovery::bonded].
    pub async fn bonded(&self, id: &NodeId) -> Result<Option<usize>, DiscoveryWasShutdown> {
        self.request(|sender| ActorMessage::Bonded(*id, sender))
            .await
    }

    /// See [Discovery::evict].
    pub async fn evict(&self, id: &NodeId) -> Result<bool, DiscoveryWasShutdown> {
        self.request(|sender| ActorMessage::Evict(*id, sender))
            .await
    }

    /// Shutdown the loop and wait for it to stop.
    pub async fn shutdown(&self) {
        let _ = self.request(ActorMessage::Shutdown).await;
    }

    // === Private Methods ===

    async fn request<T>(
        &self,
        message: impl FnOnce(Sender<T>) -> ActorMessage,
    ) -> Result<T, DiscoveryWasShutdown> {
        let (sender, receiver) = flume::bounded::<T>(1);

        self.0
             .0
            .send_async(message(sender))
            .await
            .map_err(|_| DiscoveryWasShutdown)?;

        receiver.recv_async().await.map_err(|_| DiscoveryWasShutdown)
    }
}
