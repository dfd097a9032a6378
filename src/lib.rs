#![doc = include_str!("../README.md")]
//! ## Feature flags
#![doc = document_features::document_features!()]
//!

mod actor;
mod common;
mod discovery;
mod error;

#[cfg(feature = "async")]
pub mod async_discovery;
pub mod core;

pub use crate::actor::{Config, Info};
pub use crate::common::{
    distance_cmp, sort_by_proximity, ClosestNodes, DecodeIdError, Node, NodeId, NodeParseError,
    ProximityHash, PublicKeyLengthError, PublicKeyMaterial, HASH_SIZE, MAX_LOG_DISTANCE,
    NODE_ID_HEX_LEN, NODE_ID_SIZE,
};
pub use crate::core::{FindNodeQuery, PeerState, QueryDispatcher, QueryError, QueryId};
pub use discovery::{Discovery, DiscoveryBuilder, DiscoveryWasShutdown, PendingQuery};
pub use error::Error;
