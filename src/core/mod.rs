//! Per-peer network state, no I/O.
//!
//! [Peer] holds the bonding state and the deferred `find_node` queries of one
//! peer. The discovery loop in `actor/` owns every `Peer` and calls into this
//! module; nothing here is shared between threads.

mod deferred;
mod dispatcher;
mod peer;
mod query;

pub use deferred::DeferredQueries;
pub use dispatcher::QueryDispatcher;
pub use peer::{Peer, PeerState, Submission};
pub use query::{FindNodeQuery, QueryError, QueryId, QueryReply};
