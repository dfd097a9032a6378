//! Main Crate Error

use crate::common::{DecodeIdError, NodeParseError, PublicKeyLengthError};
use crate::core::QueryError;
use crate::discovery::DiscoveryWasShutdown;

#[derive(thiserror::Error, Debug)]
/// Kadpeer crate error enum.
pub enum Error {
    #[error(transparent)]
    /// Malformed node id text.
    DecodeId(#[from] DecodeIdError),

    #[error(transparent)]
    /// Malformed node text.
    NodeParse(#[from] NodeParseError),

    #[error(transparent)]
    /// A public key of the wrong curve or encoding, see [Error::is_fatal].
    PublicKeyLength(#[from] PublicKeyLengthError),

    #[error(transparent)]
    /// A lookup was not dispatched or answered.
    Query(#[from] QueryError),

    #[error(transparent)]
    /// The discovery loop is gone.
    Shutdown(#[from] DiscoveryWasShutdown),

    #[error(transparent)]
    /// Transparent [std::io::Error]
    IO(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` for caller bugs that must not be recovered from.
    ///
    /// Malformed input and lookup failures are recoverable: skip the peer or
    /// retry. A [PublicKeyLengthError] is not.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::PublicKeyLength(error) => error.is_fatal(),
            _ => false,
        }
    }
}
