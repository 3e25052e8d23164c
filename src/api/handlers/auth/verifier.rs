//! Credential verification against the opaque `UserStore` capability.

use anyhow::{Context, Result};
use argon2::{Argon2, PasswordHash, PasswordVerifier};
use async_trait::async_trait;
use regex::Regex;
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::error::AuthError;

/// Identity as the core sees it: the store owns credentials, we only read
/// the id, email, and role set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub roles: Vec<String>,
}

/// Persistent user/credential storage, including password hashing.
///
/// Both lookup and password check carry the pool's acquire timeout; neither
/// may block indefinitely.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>>;
    async fn verify_password(&self, id: Uuid, password: &str) -> Result<bool>;
}

/// Normalize an email for lookup/uniqueness checks.
pub(super) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub(super) fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

/// Check email/password and return the identity plus roles.
///
/// Constant-shape failure: an unknown email, a malformed email, and a wrong
/// password all collapse into [`AuthError::InvalidCredentials`] so the
/// response never reveals which factor failed.
///
/// # Errors
///
/// [`AuthError::InvalidCredentials`] on any mismatch; [`AuthError::Internal`]
/// when the store itself fails.
pub async fn verify_credentials(
    users: &dyn UserStore,
    email: &str,
    password: &str,
) -> Result<UserRecord, AuthError> {
    let email = normalize_email(email);
    if !valid_email(&email) {
        return Err(AuthError::InvalidCredentials);
    }

    let Some(user) = users.find_by_email(&email).await? else {
        return Err(AuthError::InvalidCredentials);
    };

    if !users.verify_password(user.id, password).await? {
        return Err(AuthError::InvalidCredentials);
    }

    Ok(user)
}

/// Postgres-backed user store; passwords are Argon2id hashes.
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let query = "SELECT id, email, roles FROM users WHERE email = $1";
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
            .context("failed to lookup user by email")?;

        Ok(row.map(|row| UserRecord {
            id: row.get("id"),
            email: row.get("email"),
            roles: row.get("roles"),
        }))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>> {
        let query = "SELECT id, email, roles FROM users WHERE id = $1";
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
            .context("failed to lookup user by id")?;

        Ok(row.map(|row| UserRecord {
            id: row.get("id"),
            email: row.get("email"),
            roles: row.get("roles"),
        }))
    }

    async fn verify_password(&self, id: Uuid, password: &str) -> Result<bool> {
        let query = "SELECT password_hash FROM users WHERE id = $1";
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
            .context("failed to lookup password hash")?;

        let Some(row) = row else {
            return Ok(false);
        };
        let stored: String = row.get("password_hash");
        let parsed = PasswordHash::new(&stored)
            .map_err(|err| anyhow::anyhow!("stored password hash is malformed: {err}"))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}

/// In-memory user store for deterministic tests and local development.
#[derive(Default)]
pub struct MemoryUserStore {
    users: std::sync::RwLock<Vec<(UserRecord, String)>>,
}

impl MemoryUserStore {
    pub fn insert(&self, user: UserRecord, password: &str) {
        let mut users = self.users.write().expect("user store lock poisoned");
        users.retain(|(existing, _)| existing.id != user.id);
        users.push((user, password.to_string()));
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let users = self.users.read().expect("user store lock poisoned");
        Ok(users
            .iter()
            .find(|(user, _)| user.email == email)
            .map(|(user, _)| user.clone()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>> {
        let users = self.users.read().expect("user store lock poisoned");
        Ok(users
            .iter()
            .find(|(user, _)| user.id == id)
            .map(|(user, _)| user.clone()))
    }

    async fn verify_password(&self, id: Uuid, password: &str) -> Result<bool> {
        let users = self.users.read().expect("user store lock poisoned");
        Ok(users
            .iter()
            .any(|(user, stored)| user.id == id && stored == password))
    }
}
