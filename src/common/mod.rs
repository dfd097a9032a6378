//! Identities, the distance metric and peer records shared by the whole crate.

mod closest_nodes;
mod distance;
mod id;
mod node;

pub use closest_nodes::*;
pub use distance::*;
pub use id::*;
pub use node::*;
