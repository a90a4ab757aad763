//! Session stores bridging the two phases of an SRP exchange.
//!
//! A stored handshake is retrievable at most once: `take_and_invalidate`
//! removes the entry in the same operation that reads it, so a replayed or
//! double-completed session is indistinguishable from one that never existed.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use sqlx::{PgPool, Row};
use tokio::sync::Mutex;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn, Instrument};
use uuid::Uuid;

use super::{error::StoreError, HandshakeState};

/// Key/value store with per-entry expiry and single-use retrieval.
///
/// Session ids are UUIDv4: 122 bits of randomness, so possession of an id is
/// a capability in its own right.
pub trait SessionStore: Send + Sync {
    /// Store `state` under a fresh unpredictable id, expiring after `ttl`.
    fn put(
        &self,
        state: HandshakeState,
        ttl: Duration,
    ) -> impl Future<Output = Result<Uuid, StoreError>> + Send;

    /// Atomically retrieve and delete the entry for `id`.
    ///
    /// There is no window in which a concurrent caller could observe the same
    /// entry; a second call fails with [`StoreError::NotFound`] exactly like
    /// an id that was never issued.
    fn take_and_invalidate(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<HandshakeState, StoreError>> + Send;
}

/// Postgres-backed session store.
///
/// Handshake state is an opaque JSON blob; it never outlives a single process
/// generation's handshake, so the encoding is not a compatibility surface.
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Delete handshakes whose expiry passed without a completion attempt.
    ///
    /// Correctness does not depend on this: `take_and_invalidate` checks the
    /// expiry itself. This only keeps abandoned rows from accumulating.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete cannot be executed.
    pub async fn purge_expired(&self) -> Result<u64, StoreError> {
        let query = "DELETE FROM srp_handshakes WHERE expires_at <= NOW()";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .execute(&self.pool)
            .instrument(span)
            .await?;
        Ok(result.rows_affected())
    }
}

impl SessionStore for PgSessionStore {
    async fn put(&self, state: HandshakeState, ttl: Duration) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        let blob = serde_json::to_vec(&state)?;
        let ttl_seconds = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);

        let query = r"
            INSERT INTO srp_handshakes (id, state, expires_at)
            VALUES ($1, $2, NOW() + ($3 * INTERVAL '1 second'))
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(id)
            .bind(&blob)
            .bind(ttl_seconds)
            .execute(&self.pool)
            .instrument(span)
            .await?;

        Ok(id)
    }

    async fn take_and_invalidate(&self, id: Uuid) -> Result<HandshakeState, StoreError> {
        // One statement: the row is gone the moment it is read, which is what
        // closes the replay window. Expiry is checked in the same predicate so
        // an expired row reads exactly like a missing one.
        let query = r"
            DELETE FROM srp_handshakes
            WHERE id = $1 AND expires_at > NOW()
            RETURNING state
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?
            .ok_or(StoreError::NotFound)?;

        let blob: Vec<u8> = row.get("state");
        Ok(serde_json::from_slice(&blob)?)
    }
}

/// Spawn a background task purging expired handshakes every `every`.
pub fn spawn_sweeper(store: PgSessionStore, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            match store.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => debug!("Purged {purged} expired SRP handshakes"),
                Err(err) => warn!("Failed to purge expired SRP handshakes: {err}"),
            }
        }
    })
}

/// In-memory session store.
///
/// Used by tests and embedded deployments; entries live behind a single mutex,
/// so retrieval and invalidation are one indivisible step.
#[derive(Default)]
pub struct MemorySessionStore {
    entries: Mutex<HashMap<Uuid, StoredEntry>>,
}

struct StoredEntry {
    state: HandshakeState,
    deadline: Instant,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    async fn put(&self, state: HandshakeState, ttl: Duration) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        // Sweep opportunistically; there is no background task for this store.
        entries.retain(|_, entry| entry.deadline > now);
        entries.insert(
            id,
            StoredEntry {
                state,
                deadline: now + ttl,
            },
        );
        Ok(id)
    }

    async fn take_and_invalidate(&self, id: Uuid) -> Result<HandshakeState, StoreError> {
        let mut entries = self.entries.lock().await;
        match entries.remove(&id) {
            Some(entry) if entry.deadline > Instant::now() => Ok(entry.state),
            // Expired entries fail exactly like unknown ids.
            _ => Err(StoreError::NotFound),
        }
    }
}
