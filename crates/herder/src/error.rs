//! Herder error types.

use thiserror::Error;

/// Errors from the consensus coordinator.
///
/// Note that most "failures" in this crate are not errors: rejected
/// transactions surface as [`AddResult`](crate::tx_queue::AddResult),
/// invalid peer input fails its validation callback, and a missing artifact
/// just defers work. `HerderError` covers local misuse and misconfiguration.
#[derive(Debug, Error)]
pub enum HerderError {
    /// An operation that requires `start_new_network` was invoked without it.
    #[error("node is not configured to bootstrap a new network")]
    NotBootstrapped,

    /// The configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// XDR encoding or decoding failed on a local artifact.
    #[error(transparent)]
    Xdr(#[from] drover_xdr::XdrError),

    /// Key material was unusable.
    #[error(transparent)]
    Crypto(#[from] drover_crypto::CryptoError),

    /// An internal invariant does not hold.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result alias for herder operations.
pub type Result<T> = std::result::Result<T, HerderError>;
