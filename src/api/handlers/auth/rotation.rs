//! Session lifecycle: establish on login, rotate on refresh, clear on logout.
//!
//! Rotation is the trickiest state machine in the crate. The presented
//! refresh token is the lookup key, so an already-rotated token simply fails
//! lookup; the replace step is a compare-and-swap keyed on that same token,
//! so two concurrent refreshes of one valid token cannot both succeed.

use tracing::debug;
use uuid::Uuid;

use super::error::AuthError;
use super::registry::Session;
use super::state::AuthState;
use super::token::{generate_csrf_token, generate_refresh_token};
use super::verifier::UserRecord;

/// The credential triple handed back to the caller as cookies, plus the
/// session attributes the cookie layer needs.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub access_token: String,
    pub refresh_token: String,
    pub csrf_token: String,
    pub persistent: bool,
    pub refresh_expires_at: i64,
}

fn refresh_ttl_seconds(state: &AuthState, persistent: bool) -> i64 {
    if persistent {
        state.config().persistent_refresh_ttl_seconds()
    } else {
        state.config().ephemeral_refresh_ttl_seconds()
    }
}

fn mint(
    state: &AuthState,
    user: &UserRecord,
    persistent: bool,
    now: i64,
) -> Result<IssuedSession, AuthError> {
    let access_token = state.signer().issue(
        &user.id.to_string(),
        &user.email,
        &user.roles,
        now,
    )?;
    let refresh_token = generate_refresh_token()?;
    let csrf_token = generate_csrf_token()?;

    Ok(IssuedSession {
        access_token,
        refresh_token,
        csrf_token,
        persistent,
        refresh_expires_at: now + refresh_ttl_seconds(state, persistent),
    })
}

/// Create (or overwrite) the user's session after successful credential
/// verification.
///
/// # Errors
///
/// Fails only on token generation or registry errors; credential checks
/// happen before this is called.
pub async fn establish_session(
    state: &AuthState,
    user: &UserRecord,
    remember_me: bool,
    now: i64,
) -> Result<IssuedSession, AuthError> {
    let issued = mint(state, user, remember_me, now)?;

    let session = Session {
        user_id: user.id,
        refresh_expires_at: issued.refresh_expires_at,
        persistent: issued.persistent,
    };
    state.sessions().put(&session, &issued.refresh_token).await?;

    debug!(user_id = %user.id, persistent = remember_me, "session established");
    Ok(issued)
}

/// Rotate the presented refresh token into a fresh access/refresh/CSRF triple.
///
/// State machine:
/// 1. empty token -> [`AuthError::MissingToken`]
/// 2. unknown token (wrong, forged, or already rotated) -> [`AuthError::InvalidToken`]
/// 3. expiry passed -> [`AuthError::ExpiredToken`]; the caller must clear all
///    session cookies, forcing a full re-login
/// 4. otherwise the row is swapped atomically; losing the swap to a
///    concurrent rotation -> [`AuthError::ConcurrentRotation`]
///
/// The new expiry derives from the session's stored `persistent` flag, never
/// from anything the caller sends.
///
/// # Errors
///
/// See the state machine above; registry/store failures surface as
/// [`AuthError::Internal`].
pub async fn refresh_session(
    state: &AuthState,
    presented: &str,
    now: i64,
) -> Result<(UserRecord, IssuedSession), AuthError> {
    if presented.is_empty() {
        return Err(AuthError::MissingToken);
    }

    let Some(session) = state.sessions().find_by_token(presented).await? else {
        return Err(AuthError::InvalidToken);
    };

    if now >= session.refresh_expires_at {
        return Err(AuthError::ExpiredToken);
    }

    // The row can outlive the identity it points at; treat that as an
    // unknown token rather than an internal error.
    let Some(user) = state.users().find_by_id(session.user_id).await? else {
        return Err(AuthError::InvalidToken);
    };

    let issued = mint(state, &user, session.persistent, now)?;
    let next = Session {
        user_id: user.id,
        refresh_expires_at: issued.refresh_expires_at,
        persistent: issued.persistent,
    };

    let swapped = state
        .sessions()
        .replace_if_current(presented, &next, &issued.refresh_token)
        .await?;
    if !swapped {
        return Err(AuthError::ConcurrentRotation);
    }

    debug!(user_id = %user.id, "session rotated");
    Ok((user, issued))
}

/// Clear the user's session row. Idempotent: logging out twice, or with no
/// active session, succeeds.
///
/// # Errors
///
/// Fails only when the registry itself fails.
pub async fn terminate_session(state: &AuthState, user_id: Uuid) -> Result<(), AuthError> {
    state.sessions().clear(user_id).await?;
    debug!(user_id = %user_id, "session terminated");
    Ok(())
}
