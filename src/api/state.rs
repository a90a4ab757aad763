//! Shared application state and configuration.

use std::time::Duration;

use crate::srp::{PgSessionStore, SrpService, DEFAULT_HANDSHAKE_TTL};
use crate::users::PgUserStore;

#[derive(Clone, Debug)]
pub struct AppConfig {
    handshake_ttl: Duration,
}

impl AppConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            handshake_ttl: DEFAULT_HANDSHAKE_TTL,
        }
    }

    #[must_use]
    pub fn with_handshake_ttl_seconds(mut self, seconds: u64) -> Self {
        self.handshake_ttl = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn handshake_ttl(&self) -> Duration {
        self.handshake_ttl
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Constructed once at startup; handlers receive it behind an `Arc`.
///
/// [`AppConfig`] is consumed while wiring the services up, so the state only
/// carries the configured services themselves.
pub struct AppState {
    srp: SrpService<PgSessionStore>,
    users: PgUserStore,
}

impl AppState {
    #[must_use]
    pub fn new(srp: SrpService<PgSessionStore>, users: PgUserStore) -> Self {
        Self { srp, users }
    }

    #[must_use]
    pub fn srp(&self) -> &SrpService<PgSessionStore> {
        &self.srp
    }

    #[must_use]
    pub fn users(&self) -> &PgUserStore {
        &self.users
    }
}
