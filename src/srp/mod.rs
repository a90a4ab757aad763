//! Zero-knowledge password exchange (SRP).
//!
//! The server never sees a plaintext password. Registration stores a salted
//! verifier; authentication is a two-phase exchange:
//!
//! 1. [`SrpService::begin_exchange`] — a fresh server ephemeral is generated
//!    and the handshake state parked in a [`SessionStore`] under an opaque
//!    session id with a bounded lifetime.
//! 2. [`SrpService::complete_exchange`] — the state is taken *and
//!    invalidated* in one step, the client proof checked, and a mutual proof
//!    plus shared key derived.
//!
//! Unknown identities go through [`SrpService::fake_exchange`] so the caller
//! never has to answer "does this user exist" by response shape or timing.

use serde::{Deserialize, Serialize};

use crate::users::User;

pub mod error;
pub mod primitives;
pub mod service;
pub mod store;

pub use error::{SrpError, StoreError};
pub use service::{ExchangeResult, ExchangeStart, SrpService, DEFAULT_HANDSHAKE_TTL};
pub use store::{spawn_sweeper, MemorySessionStore, PgSessionStore, SessionStore};

/// Everything `complete_exchange` needs, created by `begin_exchange` and
/// consumed exactly once. Held only by the session store for its lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakeState {
    pub user: User,
    pub server_secret_ephemeral: Vec<u8>,
}
