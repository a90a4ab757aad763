//! The SRP exchange coordinator.
//!
//! A handshake moves through `begin_exchange` (server ephemeral generated,
//! state stored under a fresh session id) and `complete_exchange` (state
//! consumed, proofs derived and checked). There is no path back from a
//! completed, expired, or failed handshake; starting over means a new
//! `begin_exchange` and a new session id.

use std::time::Duration;

use rand::{distributions::Alphanumeric, rngs::OsRng, Rng, RngCore};
use tracing::instrument;
use uuid::Uuid;

use super::{
    error::{SrpError, StoreError},
    primitives,
    store::SessionStore,
    HandshakeState,
};
use crate::users::{PasswordPayload, User};

/// How long a pending handshake stays completable. Long enough for a normal
/// client round trip, short enough to bound what an observer of the first
/// message can do with it.
pub const DEFAULT_HANDSHAKE_TTL: Duration = Duration::from_secs(60 * 60);

/// First-phase response: the session id and the server's public ephemeral.
#[derive(Debug)]
pub struct ExchangeStart {
    pub session_id: Uuid,
    pub server_public_ephemeral: Vec<u8>,
}

/// Second-phase response: the authenticated user, the server proof the client
/// uses to verify the server in turn, and the derived shared key.
///
/// Returned to the caller and never persisted here.
pub struct ExchangeResult {
    pub user: User,
    pub server_proof: Vec<u8>,
    pub shared_key: Vec<u8>,
}

/// Coordinates the two-phase SRP exchange over an injected session store.
pub struct SrpService<S> {
    store: S,
    handshake_ttl: Duration,
}

impl<S: SessionStore> SrpService<S> {
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            handshake_ttl: DEFAULT_HANDSHAKE_TTL,
        }
    }

    #[must_use]
    pub fn with_handshake_ttl(mut self, ttl: Duration) -> Self {
        self.handshake_ttl = ttl;
        self
    }

    /// Start an exchange for a known user.
    ///
    /// Generates a fresh server ephemeral (never reused across sessions) and
    /// stores the handshake state under a new session id.
    ///
    /// # Errors
    ///
    /// Fails only if the session store is unavailable.
    #[instrument(skip_all, fields(email = %user.email))]
    pub async fn begin_exchange(&self, user: User) -> Result<ExchangeStart, SrpError> {
        let ephemeral = primitives::generate_server_ephemeral(&user.password.verifier);

        let state = HandshakeState {
            user,
            server_secret_ephemeral: ephemeral.secret,
        };
        let session_id = self
            .store
            .put(state, self.handshake_ttl)
            .await
            .map_err(SrpError::StoreUnavailable)?;

        Ok(ExchangeStart {
            session_id,
            server_public_ephemeral: ephemeral.public,
        })
    }

    /// Complete an exchange: consume the stored handshake, verify the client
    /// proof, and derive the mutual proof and shared key.
    ///
    /// # Errors
    ///
    /// - [`SrpError::HandshakeNotFound`] if the session id is unknown,
    ///   expired, or already consumed — one undifferentiated kind.
    /// - [`SrpError::InvalidClientProof`] if the proof does not match.
    /// - [`SrpError::StoreUnavailable`] on a store backend failure.
    #[instrument(skip_all, fields(session_id = %session_id))]
    pub async fn complete_exchange(
        &self,
        session_id: Uuid,
        client_public_ephemeral: &[u8],
        client_proof: &[u8],
    ) -> Result<ExchangeResult, SrpError> {
        let state = match self.store.take_and_invalidate(session_id).await {
            Ok(state) => state,
            Err(StoreError::NotFound) => return Err(SrpError::HandshakeNotFound),
            Err(err) => return Err(SrpError::StoreUnavailable(err)),
        };

        let session = primitives::derive_server_session(
            &state.server_secret_ephemeral,
            client_public_ephemeral,
            &state.user.password.verifier,
            client_proof,
        )
        .map_err(|_| SrpError::InvalidClientProof)?;

        Ok(ExchangeResult {
            user: state.user,
            server_proof: session.proof,
            shared_key: session.key,
        })
    }

    /// Start an exchange for an identity that does not exist.
    ///
    /// Synthesizes a throwaway credential with a genuinely derived verifier
    /// and runs the identical `begin_exchange` path, so an attacker probing
    /// identities sees the same response shape and the same work being done.
    /// Completing the returned session fails with
    /// [`SrpError::InvalidClientProof`] through the same code path as a real
    /// user presenting a wrong password.
    ///
    /// # Errors
    ///
    /// Fails only if the session store is unavailable.
    #[instrument(skip_all)]
    pub async fn fake_exchange(&self) -> Result<ExchangeStart, SrpError> {
        self.begin_exchange(throwaway_user()).await
    }
}

/// A credential no one holds the password for: random identity, random salt,
/// and a verifier derived from a random password that is dropped on return.
fn throwaway_user() -> User {
    let email = format!(
        "{}@{}.{}",
        random_string(15),
        random_string(5),
        random_string(3)
    );
    let password = random_string(20);
    let mut salt = [0u8; 16];
    OsRng.fill_bytes(&mut salt);

    let verifier = primitives::derive_verifier(&email, &password, &salt);

    User {
        id: Uuid::new_v4(),
        email,
        verified: false,
        password: PasswordPayload {
            salt: salt.to_vec(),
            verifier,
        },
        custom_attributes: serde_json::Map::new(),
    }
}

fn random_string(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| char::from(rng.sample(Alphanumeric)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::srp::store::MemorySessionStore;
    use anyhow::Result;
    use sha2::Sha256;
    use srp::{client::SrpClient, groups::G_2048};

    struct TestClient {
        email: String,
        password: String,
        salt: Vec<u8>,
    }

    impl TestClient {
        fn new() -> Self {
            let mut salt = [0u8; 16];
            OsRng.fill_bytes(&mut salt);
            Self {
                email: "alice@example.com".to_string(),
                password: "correct horse battery staple".to_string(),
                salt: salt.to_vec(),
            }
        }

        fn user(&self) -> User {
            let verifier =
                primitives::derive_verifier(&self.email, &self.password, &self.salt);
            let mut attributes = serde_json::Map::new();
            attributes.insert("bio".to_string(), serde_json::json!("tests things"));
            User {
                id: Uuid::new_v4(),
                email: self.email.clone(),
                verified: true,
                password: PasswordPayload {
                    salt: self.salt.clone(),
                    verifier,
                },
                custom_attributes: attributes,
            }
        }

        /// Play the client side: public ephemeral plus the proof for
        /// `password`, derived against the server's public ephemeral.
        fn reply(
            &self,
            password: &str,
            server_public: &[u8],
        ) -> Result<(Vec<u8>, srp::client::SrpClientVerifier<Sha256>)> {
            let client = SrpClient::<Sha256>::new(&G_2048);
            let mut a = [0u8; 64];
            OsRng.fill_bytes(&mut a);
            let a_pub = client.compute_public_ephemeral(&a);
            let verifier = client
                .process_reply(
                    &a,
                    self.email.as_bytes(),
                    password.as_bytes(),
                    &self.salt,
                    server_public,
                )
                .map_err(|err| anyhow::anyhow!("client derivation failed: {err}"))?;
            Ok((a_pub, verifier))
        }
    }

    fn service() -> SrpService<MemorySessionStore> {
        SrpService::new(MemorySessionStore::new())
    }

    #[tokio::test]
    async fn honest_exchange_authenticates_both_sides() -> Result<()> {
        let client = TestClient::new();
        let user = client.user();
        let srp = service();

        let start = srp.begin_exchange(user.clone()).await?;
        let (a_pub, client_verifier) = client.reply(&client.password, &start.server_public_ephemeral)?;

        let result = srp
            .complete_exchange(start.session_id, &a_pub, client_verifier.proof())
            .await?;

        assert_eq!(result.user, user);
        // Mutual authentication: the client checks the server proof and both
        // sides end up with the same shared key.
        client_verifier
            .verify_server(&result.server_proof)
            .map_err(|err| anyhow::anyhow!("server proof rejected: {err}"))?;
        assert_eq!(result.shared_key, client_verifier.key());
        Ok(())
    }

    #[tokio::test]
    async fn completed_session_cannot_be_replayed() -> Result<()> {
        let client = TestClient::new();
        let srp = service();

        let start = srp.begin_exchange(client.user()).await?;
        let (a_pub, client_verifier) = client.reply(&client.password, &start.server_public_ephemeral)?;

        srp.complete_exchange(start.session_id, &a_pub, client_verifier.proof())
            .await?;

        // Same id, same (correct) proof: the session is gone.
        assert!(matches!(
            srp.complete_exchange(start.session_id, &a_pub, client_verifier.proof())
                .await,
            Err(SrpError::HandshakeNotFound)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn wrong_proof_fails_and_consumes_the_session() -> Result<()> {
        let client = TestClient::new();
        let srp = service();

        let start = srp.begin_exchange(client.user()).await?;
        let (a_pub, wrong_verifier) = client.reply("not the password", &start.server_public_ephemeral)?;

        assert!(matches!(
            srp.complete_exchange(start.session_id, &a_pub, wrong_verifier.proof())
                .await,
            Err(SrpError::InvalidClientProof)
        ));

        // The failed attempt consumed the session; even the correct proof is
        // too late now.
        let (a_pub, correct_verifier) = client.reply(&client.password, &start.server_public_ephemeral)?;
        assert!(matches!(
            srp.complete_exchange(start.session_id, &a_pub, correct_verifier.proof())
                .await,
            Err(SrpError::HandshakeNotFound)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn unknown_session_id_is_not_found() {
        let srp = service();
        assert!(matches!(
            srp.complete_exchange(Uuid::new_v4(), &[1u8; 256], &[2u8; 32]).await,
            Err(SrpError::HandshakeNotFound)
        ));
    }

    #[tokio::test]
    async fn expired_session_is_not_found() -> Result<()> {
        let client = TestClient::new();
        let srp = service().with_handshake_ttl(Duration::from_millis(10));

        let start = srp.begin_exchange(client.user()).await?;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(matches!(
            srp.complete_exchange(start.session_id, &[1u8; 256], &[2u8; 32])
                .await,
            Err(SrpError::HandshakeNotFound)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn fake_exchange_is_indistinguishable_from_a_real_one() -> Result<()> {
        let client = TestClient::new();
        let srp = service();

        let real = srp.begin_exchange(client.user()).await?;
        let fake = srp.fake_exchange().await?;

        // Same shape: a session id and a public ephemeral of the same kind.
        assert_ne!(fake.session_id, real.session_id);
        assert!(!fake.server_public_ephemeral.is_empty());
        assert!(fake.server_public_ephemeral.len() <= real.server_public_ephemeral.len() + 1);
        Ok(())
    }

    #[tokio::test]
    async fn fake_session_fails_with_invalid_proof() -> Result<()> {
        let client = TestClient::new();
        let srp = service();

        let fake = srp.fake_exchange().await?;
        // No one knows the throwaway password, so any proof must fail the
        // same way a wrong password does for a real user.
        let (a_pub, verifier) = client.reply(&client.password, &fake.server_public_ephemeral)?;
        assert!(matches!(
            srp.complete_exchange(fake.session_id, &a_pub, verifier.proof())
                .await,
            Err(SrpError::InvalidClientProof)
        ));
        Ok(())
    }

    #[test]
    fn throwaway_users_do_not_repeat() {
        let first = throwaway_user();
        let second = throwaway_user();
        assert_ne!(first.email, second.email);
        assert_ne!(first.password.salt, second.password.salt);
        assert_ne!(first.password.verifier, second.password.verifier);
    }
}
