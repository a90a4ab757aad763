use thiserror::Error;

/// Failures surfaced by a [`SessionStore`](super::store::SessionStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The session id is unknown, already consumed, or past its expiry. The
    /// store never says which.
    #[error("session not found")]
    NotFound,
    #[error("session store unavailable")]
    Unavailable(#[from] sqlx::Error),
    #[error("failed to encode or decode handshake state")]
    Codec(#[from] serde_json::Error),
}

/// Failures surfaced by the exchange coordinator.
///
/// Unknown, expired, and already-consumed sessions all collapse into
/// [`SrpError::HandshakeNotFound`]; telling them apart would let a caller
/// probe session state. A proof mismatch is reported distinctly because at
/// that point the session's existence is already established.
#[derive(Debug, Error)]
pub enum SrpError {
    #[error("handshake not found")]
    HandshakeNotFound,
    #[error("invalid client proof")]
    InvalidClientProof,
    #[error("session store unavailable")]
    StoreUnavailable(#[source] StoreError),
}
