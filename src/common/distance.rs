//! XOR distance over Keccak-256 hashes of node ids.
//!
//! Raw public keys are not uniformly distributed over the id space, so every
//! closeness decision is made on the hash of the id instead.
use rand::RngCore;
use sha3::{Digest, Keccak256};
use std::{
    cmp::Ordering,
    fmt::{self, Debug, Formatter},
};

use super::NodeId;

/// The size of a [ProximityHash] in bytes.
pub const HASH_SIZE: usize = 32;
/// The largest possible [ProximityHash::log_distance].
pub const MAX_LOG_DISTANCE: u16 = HASH_SIZE as u16 * 8;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// Keccak-256 digest of a [NodeId], or a lookup target in the same space.
pub struct ProximityHash([u8; HASH_SIZE]);

impl ProximityHash {
    /// Hash a node id.
    pub fn of(id: &NodeId) -> ProximityHash {
        let digest = Keccak256::digest(id.as_bytes());

        let mut bytes = [0; HASH_SIZE];
        bytes.copy_from_slice(&digest);

        ProximityHash(bytes)
    }

    pub fn random() -> ProximityHash {
        let mut bytes = [0; HASH_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);

        ProximityHash(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    pub fn xor(&self, other: &ProximityHash) -> ProximityHash {
        let mut result = [0_u8; HASH_SIZE];

        for (i, (a, b)) in self.0.iter().zip(other.0).enumerate() {
            result[i] = a ^ b;
        }

        ProximityHash(result)
    }

    /// Logarithmic XOR distance between this hash and another.
    ///
    /// The distance is the number of significant bits in the XOR result.
    ///
    /// Distance to self is 0
    /// Distance to the furthest hash is 256
    /// Distance to a hash with 5 leading matching bits is 251
    pub fn log_distance(&self, other: &ProximityHash) -> u16 {
        for i in 0..HASH_SIZE {
            let xor = self.0[i] ^ other.0[i];

            if xor != 0 {
                // leading zeros so far + leading zeros of this byte
                let leading_zeros = i as u16 * 8 + xor.leading_zeros() as u16;

                return MAX_LOG_DISTANCE - leading_zeros;
            }
        }

        0
    }
}

impl From<[u8; HASH_SIZE]> for ProximityHash {
    fn from(bytes: [u8; HASH_SIZE]) -> Self {
        ProximityHash(bytes)
    }
}

impl Debug for ProximityHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "ProximityHash({})", hex::encode(self.0))
    }
}

/// Compare the distances of `a` and `b` to `target`.
///
/// Returns [Ordering::Less] if `a` is closer to `target` than `b`,
/// [Ordering::Greater] if it is farther, and [Ordering::Equal] for equal distances.
pub fn distance_cmp(target: &ProximityHash, a: &ProximityHash, b: &ProximityHash) -> Ordering {
    for i in 0..HASH_SIZE {
        let da = a.0[i] ^ target.0[i];
        let db = b.0[i] ^ target.0[i];

        match da.cmp(&db) {
            Ordering::Equal => continue,
            ordering => return ordering,
        }
    }

    Ordering::Equal
}
