//! Seam between the discovery loop and the wire protocol.

use std::fmt::Debug;

use flume::Sender;
use tracing::debug;

use crate::common::Node;

use super::query::FindNodeQuery;

/// Sends `find_node` requests to bonded peers.
///
/// Implemented by the wire-protocol layer. Only ever called from the discovery
/// loop thread, in the order queries become dispatchable.
pub trait QueryDispatcher: Debug + Send + 'static {
    /// Send `query` to `to`. The implementation owns the query from now on and
    /// is responsible for answering it.
    fn dispatch(&mut self, to: &Node, query: FindNodeQuery);
}

/// Forward dispatchable queries over a channel, for transports running on
/// their own thread.
impl QueryDispatcher for Sender<(Node, FindNodeQuery)> {
    fn dispatch(&mut self, to: &Node, query: FindNodeQuery) {
        if let Err(error) = self.send((to.clone(), query)) {
            let (node, query) = error.into_inner();
            // Dropping the query disconnects the caller's reply channel.
            debug!(id = %query.id(), to = ?node.addr(), "Transport is gone, dropping query");
        }
    }
}
