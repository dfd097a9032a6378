use super::Actor;
use crate::core::PeerState;

/// Information and statistics about the discovery loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Info {
    peers: usize,
    bonded: usize,
    deferred_queries: usize,
}

impl Info {
    /// Number of known peers, bonded or not.
    pub fn peers(&self) -> usize {
        self.peers
    }

    /// Number of peers whose liveness was confirmed.
    pub fn bonded(&self) -> usize {
        self.bonded
    }

    /// Number of unbonded peers.
    pub fn unbonded(&self) -> usize {
        self.peers - self.bonded
    }

    /// Number of lookups waiting for their peer to bond.
    pub fn deferred_queries(&self) -> usize {
        self.deferred_queries
    }
}

impl From<&Actor> for Info {
    fn from(actor: &Actor) -> Self {
        let mut info = Info {
            peers: 0,
            bonded: 0,
            deferred_queries: 0,
        };

        for peer in actor.peers() {
            info.peers += 1;

            if peer.state() == PeerState::Bonded {
                info.bonded += 1;
            }

            info.deferred_queries += peer.deferred().len();
        }

        info
    }
}
