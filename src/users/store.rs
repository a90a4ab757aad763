//! Postgres-backed user store.

use anyhow::{Context, Result};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::{IdentityLookup, PasswordPayload, User, UserSummary};

/// Outcome when attempting to create a new user.
#[derive(Debug)]
pub enum CreateOutcome {
    Created(UserSummary),
    /// A user with that email already exists.
    Conflict,
}

/// Outcome when marking a user as verified.
#[derive(Debug, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified,
    AlreadyVerified,
    Unknown,
}

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a user with a client-derived password payload.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure; a duplicate email is reported as
    /// [`CreateOutcome::Conflict`], not an error.
    pub async fn create(
        &self,
        email: &str,
        password: &PasswordPayload,
        custom_attributes: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<CreateOutcome> {
        let attributes = serde_json::to_string(custom_attributes)
            .context("failed to serialize custom attributes")?;

        let query = r"
            INSERT INTO users (email, salt, verifier, custom_attributes)
            VALUES ($1, $2, $3, $4::jsonb)
            RETURNING id
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(email)
            .bind(&password.salt)
            .bind(&password.verifier)
            .bind(attributes)
            .fetch_one(&self.pool)
            .instrument(span)
            .await;

        match row {
            Ok(row) => Ok(CreateOutcome::Created(UserSummary {
                id: row.get("id"),
                email: email.to_string(),
                verified: false,
            })),
            Err(err) if is_unique_violation(&err) => Ok(CreateOutcome::Conflict),
            Err(err) => Err(err).context("failed to insert user"),
        }
    }

    /// Mark a user as verified, once.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub async fn mark_verified(&self, email: &str) -> Result<VerifyOutcome> {
        let query = "UPDATE users SET verified = true WHERE email = $1 AND NOT verified";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(email)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to mark user as verified")?;

        if result.rows_affected() == 1 {
            return Ok(VerifyOutcome::Verified);
        }
        // Nothing updated: either the user is unknown or already verified.
        Ok(match self.lookup(email).await? {
            Some(_) => VerifyOutcome::AlreadyVerified,
            None => VerifyOutcome::Unknown,
        })
    }

    /// Replace the password payload after an account recovery.
    ///
    /// Returns `false` if no user exists for `email`.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub async fn reset_password(&self, email: &str, password: &PasswordPayload) -> Result<bool> {
        let query = "UPDATE users SET salt = $2, verifier = $3 WHERE email = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(email)
            .bind(&password.salt)
            .bind(&password.verifier)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to reset password payload")?;

        Ok(result.rows_affected() == 1)
    }

    /// Fetch a user by id.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub async fn by_id(&self, id: Uuid) -> Result<Option<User>> {
        let query = r"
            SELECT id, email, verified, salt, verifier, custom_attributes::text AS custom_attributes
            FROM users WHERE id = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to fetch user by id")?;

        row.map(user_from_row).transpose()
    }
}

impl IdentityLookup for PgUserStore {
    async fn lookup(&self, email: &str) -> Result<Option<User>> {
        let query = r"
            SELECT id, email, verified, salt, verifier, custom_attributes::text AS custom_attributes
            FROM users WHERE email = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup user")?;

        row.map(user_from_row).transpose()
    }
}

fn user_from_row(row: sqlx::postgres::PgRow) -> Result<User> {
    let attributes: String = row.get("custom_attributes");
    let custom_attributes =
        serde_json::from_str(&attributes).context("invalid custom attributes")?;

    Ok(User {
        id: row.get("id"),
        email: row.get("email"),
        verified: row.get("verified"),
        password: PasswordPayload {
            salt: row.get("salt"),
            verifier: row.get("verifier"),
        },
        custom_attributes,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}
