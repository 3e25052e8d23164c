//! Session registry: one refresh-token row per user, replace-on-rotate.
//!
//! The registry is the only cross-request shared mutable state. Every
//! mutation is atomic at the storage layer (a single conditional statement in
//! Postgres, a single mutex-guarded map operation in memory) so rotation
//! never read-modify-writes across statements and multiple server processes
//! can cooperate without an application-level lock.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::Instrument;
use uuid::Uuid;

use super::token::hash_refresh_token;

/// One logical session row. The refresh token itself travels separately:
/// stores persist only its hash and look rows up by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub user_id: Uuid,
    /// Absolute unix-seconds expiry; the session is invalid at/after this.
    pub refresh_expires_at: i64,
    /// Remember-me flag; governs the TTL applied on the next rotation.
    pub persistent: bool,
}

/// Keyed store for session rows.
///
/// Invariant: at most one valid refresh token per user. `put` and
/// `replace_if_current` always overwrite, never append.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create or overwrite the user's session row (login).
    async fn put(&self, session: &Session, refresh_token: &str) -> Result<()>;

    /// Look up a session by the presented refresh token. Expiry is NOT
    /// filtered here; the rotation controller distinguishes expired rows
    /// from unknown tokens.
    async fn find_by_token(&self, refresh_token: &str) -> Result<Option<Session>>;

    /// Atomically replace the row keyed on the currently stored token
    /// (compare-and-swap). Returns `false` when `current_token` is no longer
    /// current, i.e. a concurrent rotation already won.
    async fn replace_if_current(
        &self,
        current_token: &str,
        next: &Session,
        next_token: &str,
    ) -> Result<bool>;

    /// Remove the user's session row (logout). Idempotent.
    async fn clear(&self, user_id: Uuid) -> Result<()>;
}

/// Postgres-backed registry. Tokens are stored as SHA-256 hashes; the
/// unique index on the hash column is what makes token-keyed lookup and
/// the CAS update sound.
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn put(&self, session: &Session, refresh_token: &str) -> Result<()> {
        let query = r"
            INSERT INTO user_sessions (user_id, refresh_token_hash, expires_at, persistent)
            VALUES ($1, $2, to_timestamp($3::double precision), $4)
            ON CONFLICT (user_id) DO UPDATE
            SET refresh_token_hash = EXCLUDED.refresh_token_hash,
                expires_at = EXCLUDED.expires_at,
                persistent = EXCLUDED.persistent
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(session.user_id)
            .bind(hash_refresh_token(refresh_token))
            .bind(session.refresh_expires_at)
            .bind(session.persistent)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to upsert session")?;
        Ok(())
    }

    async fn find_by_token(&self, refresh_token: &str) -> Result<Option<Session>> {
        let query = r"
            SELECT user_id, CAST(EXTRACT(EPOCH FROM expires_at) AS BIGINT) AS expires_at, persistent
            FROM user_sessions
            WHERE refresh_token_hash = $1
            LIMIT 1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(hash_refresh_token(refresh_token))
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup session by token")?;

        Ok(row.map(|row| Session {
            user_id: row.get("user_id"),
            refresh_expires_at: row.get("expires_at"),
            persistent: row.get("persistent"),
        }))
    }

    async fn replace_if_current(
        &self,
        current_token: &str,
        next: &Session,
        next_token: &str,
    ) -> Result<bool> {
        // Single UPDATE keyed on the old hash: the row either swaps in one
        // statement or the caller lost the race. A client disconnect cannot
        // leave a partial row.
        let query = r"
            UPDATE user_sessions
            SET refresh_token_hash = $2,
                expires_at = to_timestamp($3::double precision),
                persistent = $4
            WHERE refresh_token_hash = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(hash_refresh_token(current_token))
            .bind(hash_refresh_token(next_token))
            .bind(next.refresh_expires_at)
            .bind(next.persistent)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to rotate session")?;

        Ok(result.rows_affected() == 1)
    }

    async fn clear(&self, user_id: Uuid) -> Result<()> {
        // Logout is idempotent; it's fine if no rows are deleted.
        let query = "DELETE FROM user_sessions WHERE user_id = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(user_id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to clear session")?;
        Ok(())
    }
}

/// In-memory registry for tests and single-process development. One mutex
/// guards the whole map, so `replace_if_current` is atomic by construction.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<Uuid, (String, Session)>>,
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn put(&self, session: &Session, refresh_token: &str) -> Result<()> {
        let mut sessions = self.sessions.lock().await;
        sessions.insert(session.user_id, (refresh_token.to_string(), *session));
        Ok(())
    }

    async fn find_by_token(&self, refresh_token: &str) -> Result<Option<Session>> {
        let sessions = self.sessions.lock().await;
        Ok(sessions
            .values()
            .find(|(stored, _)| stored == refresh_token)
            .map(|(_, session)| *session))
    }

    async fn replace_if_current(
        &self,
        current_token: &str,
        next: &Session,
        next_token: &str,
    ) -> Result<bool> {
        let mut sessions = self.sessions.lock().await;
        let Some((stored, _)) = sessions.get(&next.user_id) else {
            return Ok(false);
        };
        if stored != current_token {
            return Ok(false);
        }
        sessions.insert(next.user_id, (next_token.to_string(), *next));
        Ok(true)
    }

    async fn clear(&self, user_id: Uuid) -> Result<()> {
        let mut sessions = self.sessions.lock().await;
        sessions.remove(&user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(user_id: Uuid, expires_at: i64) -> Session {
        Session {
            user_id,
            refresh_expires_at: expires_at,
            persistent: false,
        }
    }

    #[tokio::test]
    async fn put_overwrites_never_appends() -> Result<()> {
        let store = MemorySessionStore::default();
        let user_id = Uuid::new_v4();

        store.put(&session(user_id, 100), "first").await?;
        store.put(&session(user_id, 200), "second").await?;

        assert!(store.find_by_token("first").await?.is_none());
        let found = store.find_by_token("second").await?;
        assert_eq!(found.map(|s| s.refresh_expires_at), Some(200));
        Ok(())
    }

    #[tokio::test]
    async fn replace_if_current_swaps_once() -> Result<()> {
        let store = MemorySessionStore::default();
        let user_id = Uuid::new_v4();
        store.put(&session(user_id, 100), "old").await?;

        let next = session(user_id, 300);
        assert!(store.replace_if_current("old", &next, "new").await?);
        // Old token is no longer current: the same swap must lose.
        assert!(!store.replace_if_current("old", &next, "newer").await?);

        assert!(store.find_by_token("old").await?.is_none());
        assert!(store.find_by_token("new").await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn clear_is_idempotent() -> Result<()> {
        let store = MemorySessionStore::default();
        let user_id = Uuid::new_v4();
        store.put(&session(user_id, 100), "token").await?;

        store.clear(user_id).await?;
        store.clear(user_id).await?;

        assert!(store.find_by_token("token").await?.is_none());
        Ok(())
    }
}
