//! Node identity derived from a secp256k1 public key.
use rand::RngCore;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::{
    fmt::{self, Debug, Display, Formatter},
    str::FromStr,
};

use k256::elliptic_curve::sec1::ToEncodedPoint;

use super::ProximityHash;

/// The size of node IDs in bytes.
pub const NODE_ID_SIZE: usize = 64;
/// Number of hex characters in the canonical text form of a [NodeId].
pub const NODE_ID_HEX_LEN: usize = NODE_ID_SIZE * 2;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// 512 bit node identity, the `X || Y` coordinates of the node's public key.
pub struct NodeId([u8; NODE_ID_SIZE]);

impl NodeId {
    /// Derive a [NodeId] from a public key.
    ///
    /// The key is encoded as an uncompressed SEC1 point and the leading format
    /// byte is stripped. Any other length means the key belongs to the wrong
    /// curve, or was encoded the wrong way, which is a bug in the caller. The
    /// returned [PublicKeyLengthError] is fatal, see [PublicKeyLengthError::is_fatal].
    pub fn from_public_key<K: PublicKeyMaterial + ?Sized>(
        key: &K,
    ) -> Result<NodeId, PublicKeyLengthError> {
        let encoded = key.sec1_bytes();

        if encoded.len() != NODE_ID_SIZE + 1 {
            return Err(PublicKeyLengthError {
                expected_bits: (NODE_ID_SIZE + 1) * 8,
                got_bits: encoded.len() * 8,
            });
        }

        let mut bytes = [0; NODE_ID_SIZE];
        bytes.copy_from_slice(&encoded[1..]);

        Ok(NodeId(bytes))
    }

    /// Create a new NodeId from some bytes. Returns Err if `bytes` is not of length
    /// [NODE_ID_SIZE].
    pub fn from_bytes<T: AsRef<[u8]>>(bytes: T) -> Result<NodeId, DecodeIdError> {
        let bytes = bytes.as_ref();
        if bytes.len() != NODE_ID_SIZE {
            return Err(DecodeIdError::InvalidByteLength {
                expected_bytes: NODE_ID_SIZE,
                got: bytes.len(),
            });
        }

        let mut tmp: [u8; NODE_ID_SIZE] = [0; NODE_ID_SIZE];
        tmp.copy_from_slice(bytes);

        Ok(NodeId(tmp))
    }

    /// Parse a hex encoded NodeId, with or without a `0x` prefix.
    pub fn from_hex(text: &str) -> Result<NodeId, DecodeIdError> {
        let digits = text.strip_prefix("0x").unwrap_or(text);
        let bytes = hex::decode(digits)?;

        if bytes.len() != NODE_ID_SIZE {
            return Err(DecodeIdError::InvalidLength {
                expected_chars: NODE_ID_HEX_LEN,
            });
        }

        NodeId::from_bytes(bytes)
    }

    /// Like [NodeId::from_hex] but panics on malformed input.
    ///
    /// Only meant for literals that are known to be valid, such as hardcoded
    /// bootstrap nodes and test vectors. Never call this on untrusted input.
    pub fn must_from_hex(text: &str) -> NodeId {
        match NodeId::from_hex(text) {
            Ok(id) => id,
            Err(error) => panic!("invalid node id literal {text:?}: {error}"),
        }
    }

    pub fn random() -> NodeId {
        let mut bytes = [0; NODE_ID_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);

        NodeId(bytes)
    }

    /// Lowercase hex encoding, without a `0x` prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; NODE_ID_SIZE] {
        &self.0
    }

    /// Keccak-256 of this id, the coordinate used for distance comparisons.
    pub fn proximity_hash(&self) -> ProximityHash {
        ProximityHash::of(self)
    }
}

impl From<[u8; NODE_ID_SIZE]> for NodeId {
    fn from(bytes: [u8; NODE_ID_SIZE]) -> Self {
        NodeId(bytes)
    }
}

impl FromStr for NodeId {
    type Err = DecodeIdError;

    fn from_str(s: &str) -> Result<NodeId, DecodeIdError> {
        NodeId::from_hex(s)
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Debug for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.to_hex())
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;

        NodeId::from_hex(&text).map_err(de::Error::custom)
    }
}

/// Public key types a [NodeId] can be derived from.
pub trait PublicKeyMaterial {
    /// The SEC1 encoding of the key, format byte included.
    fn sec1_bytes(&self) -> Vec<u8>;
}

impl PublicKeyMaterial for k256::PublicKey {
    fn sec1_bytes(&self) -> Vec<u8> {
        self.as_affine().to_encoded_point(false).as_bytes().to_vec()
    }
}

impl PublicKeyMaterial for k256::ecdsa::VerifyingKey {
    fn sec1_bytes(&self) -> Vec<u8> {
        self.as_affine().to_encoded_point(false).as_bytes().to_vec()
    }
}

/// Passed through as is, a compressed point will not derive a [NodeId].
impl PublicKeyMaterial for k256::EncodedPoint {
    fn sec1_bytes(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
/// Errors parsing the text form of a [NodeId].
pub enum DecodeIdError {
    #[error("invalid hex: {0}")]
    /// Non hex characters or an odd number of digits.
    InvalidHex(#[from] hex::FromHexError),

    #[error("wrong length, want {expected_chars} hex chars")]
    /// Hex text that decoded to the wrong number of bytes.
    InvalidLength { expected_chars: usize },

    #[error("wrong length, want {expected_bytes} bytes, got {got}")]
    /// Raw bytes of the wrong length, see [NodeId::from_bytes].
    InvalidByteLength { expected_bytes: usize, got: usize },
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("need {expected_bits} bit pubkey, got {got_bits} bits")]
/// A public key that does not encode to a 512 bit node id.
///
/// This can only happen when the caller hands over a key of the wrong curve or
/// encoding, so there is nothing to retry.
pub struct PublicKeyLengthError {
    pub expected_bits: usize,
    pub got_bits: usize,
}

impl PublicKeyLengthError {
    /// Always `true`, continuing with a truncated id corrupts every later lookup.
    pub fn is_fatal(&self) -> bool {
        true
    }
}
