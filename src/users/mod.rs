//! User records and the identity store.
//!
//! The SRP coordinator never looks users up itself; its caller resolves the
//! identity through [`IdentityLookup`] and decides between a real and a fake
//! exchange. The store only ever hands out immutable records.

use std::future::Future;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

mod store;
pub use store::{CreateOutcome, PgUserStore, VerifyOutcome};

/// Salted password verifier, both derived client-side at registration. The
/// server never sees the password itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordPayload {
    pub salt: Vec<u8>,
    pub verifier: Vec<u8>,
}

/// A registered user. The email is the stable identity key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub verified: bool,
    pub password: PasswordPayload,
    pub custom_attributes: serde_json::Map<String, serde_json::Value>,
}

/// The subset of a user safe to return over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub verified: bool,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            verified: user.verified,
        }
    }
}

/// Lookup-by-identity, the one capability the login flow needs.
pub trait IdentityLookup: Send + Sync {
    /// Find the credential record for `email`, if any.
    fn lookup(
        &self,
        email: &str,
    ) -> impl Future<Output = anyhow::Result<Option<User>>> + Send;
}
