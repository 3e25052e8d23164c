//! Auth module tests: session lifecycle properties over the in-memory stores.

use super::csrf::{requires_validation, tokens_match};
use super::error::AuthError;
use super::rotation::{establish_session, refresh_session, terminate_session};
use super::state::{AuthConfig, AuthState};
use super::token::now_unix;
use super::verifier::{MemoryUserStore, UserRecord};
use super::{MemorySessionStore, registry::SessionStore};
use anyhow::Result;
use axum::http::Method;
use secrecy::SecretString;
use std::sync::Arc;
use uuid::Uuid;

const NOW: i64 = 1_700_000_000;

fn test_config() -> AuthConfig {
    AuthConfig::new("https://app.example.com".to_string())
        .with_access_token_ttl_minutes(15)
        .with_refresh_token_ttl_days(7)
}

fn test_state() -> (Arc<AuthState>, UserRecord) {
    let users = Arc::new(MemoryUserStore::default());
    let user = UserRecord {
        id: Uuid::new_v4(),
        email: "alice@example.com".to_string(),
        roles: vec!["Admin".to_string(), "User".to_string()],
    };
    users.insert(user.clone(), "CorrectHorseBatteryStaple");

    let key = SecretString::from("0123456789abcdef0123456789abcdef");
    let state = AuthState::new(
        test_config(),
        &key,
        users,
        Arc::new(MemorySessionStore::default()),
    )
    .expect("valid auth state");

    (Arc::new(state), user)
}

#[tokio::test]
async fn login_csrf_value_is_accepted_by_the_guard() -> Result<()> {
    let (state, user) = test_state();
    let issued = establish_session(&state, &user, false, NOW)
        .await
        .map_err(|err| anyhow::anyhow!("{err}"))?;

    // The cookie and the echoed header are the same server-issued value.
    assert!(requires_validation(&Method::POST, true));
    assert!(tokens_match(&issued.csrf_token, &issued.csrf_token));
    Ok(())
}

#[tokio::test]
async fn rotation_is_single_use() -> Result<()> {
    let (state, user) = test_state();
    let issued = establish_session(&state, &user, true, NOW)
        .await
        .map_err(|err| anyhow::anyhow!("{err}"))?;

    let (_, rotated) = refresh_session(&state, &issued.refresh_token, NOW + 60)
        .await
        .map_err(|err| anyhow::anyhow!("{err}"))?;
    assert_ne!(rotated.refresh_token, issued.refresh_token);

    // Re-presenting the old token must fail lookup, not just expiry.
    let replay = refresh_session(&state, &issued.refresh_token, NOW + 120).await;
    assert!(matches!(replay, Err(AuthError::InvalidToken)));
    Ok(())
}

#[tokio::test]
async fn expired_refresh_token_fails_even_when_stored() -> Result<()> {
    let (state, user) = test_state();
    let issued = establish_session(&state, &user, false, NOW)
        .await
        .map_err(|err| anyhow::anyhow!("{err}"))?;

    // Jump past the 12h ephemeral expiry; the row still matches the token.
    let at_expiry = refresh_session(&state, &issued.refresh_token, issued.refresh_expires_at).await;
    assert!(matches!(at_expiry, Err(AuthError::ExpiredToken)));

    let past_expiry =
        refresh_session(&state, &issued.refresh_token, issued.refresh_expires_at + 1).await;
    assert!(matches!(past_expiry, Err(AuthError::ExpiredToken)));
    Ok(())
}

#[tokio::test]
async fn missing_token_is_its_own_failure() {
    let (state, _) = test_state();
    let result = refresh_session(&state, "", NOW).await;
    assert!(matches!(result, Err(AuthError::MissingToken)));
}

#[tokio::test]
async fn unknown_token_is_invalid() {
    let (state, _) = test_state();
    let result = refresh_session(&state, "never-issued", NOW).await;
    assert!(matches!(result, Err(AuthError::InvalidToken)));
}

#[tokio::test]
async fn persistent_flag_governs_refresh_ttl() -> Result<()> {
    let (state, user) = test_state();

    let persistent = establish_session(&state, &user, true, NOW)
        .await
        .map_err(|err| anyhow::anyhow!("{err}"))?;
    assert_eq!(persistent.refresh_expires_at - NOW, 7 * 24 * 60 * 60);

    let ephemeral = establish_session(&state, &user, false, NOW)
        .await
        .map_err(|err| anyhow::anyhow!("{err}"))?;
    assert_eq!(ephemeral.refresh_expires_at - NOW, 12 * 60 * 60);
    Ok(())
}

#[tokio::test]
async fn rotation_preserves_the_stored_persistent_flag() -> Result<()> {
    let (state, user) = test_state();
    let issued = establish_session(&state, &user, true, NOW)
        .await
        .map_err(|err| anyhow::anyhow!("{err}"))?;

    let (_, rotated) = refresh_session(&state, &issued.refresh_token, NOW + 60)
        .await
        .map_err(|err| anyhow::anyhow!("{err}"))?;

    // TTL recomputed from the session's flag, not from caller input.
    assert!(rotated.persistent);
    assert_eq!(rotated.refresh_expires_at - (NOW + 60), 7 * 24 * 60 * 60);
    Ok(())
}

#[tokio::test]
async fn concurrent_rotations_cannot_both_succeed() -> Result<()> {
    let (state, user) = test_state();
    let issued = establish_session(&state, &user, true, NOW)
        .await
        .map_err(|err| anyhow::anyhow!("{err}"))?;

    let first = refresh_session(&state, &issued.refresh_token, NOW + 10);
    let second = refresh_session(&state, &issued.refresh_token, NOW + 10);
    let (first, second) = tokio::join!(first, second);

    let successes = [&first, &second]
        .iter()
        .filter(|result| result.is_ok())
        .count();
    assert_eq!(successes, 1);

    let loser = if first.is_ok() { second } else { first };
    assert!(matches!(
        loser,
        Err(AuthError::ConcurrentRotation | AuthError::InvalidToken)
    ));
    Ok(())
}

#[tokio::test]
async fn logout_clears_the_session_row() -> Result<()> {
    let (state, user) = test_state();
    let issued = establish_session(&state, &user, true, NOW)
        .await
        .map_err(|err| anyhow::anyhow!("{err}"))?;

    terminate_session(&state, user.id)
        .await
        .map_err(|err| anyhow::anyhow!("{err}"))?;

    assert!(state
        .sessions()
        .find_by_token(&issued.refresh_token)
        .await?
        .is_none());

    let refresh = refresh_session(&state, &issued.refresh_token, NOW + 10).await;
    assert!(matches!(refresh, Err(AuthError::InvalidToken)));
    Ok(())
}

#[tokio::test]
async fn login_overwrites_the_previous_session() -> Result<()> {
    let (state, user) = test_state();
    let first = establish_session(&state, &user, true, NOW)
        .await
        .map_err(|err| anyhow::anyhow!("{err}"))?;
    let _second = establish_session(&state, &user, true, NOW + 5)
        .await
        .map_err(|err| anyhow::anyhow!("{err}"))?;

    // One row per user: the first session's token was replaced, not appended.
    let replay = refresh_session(&state, &first.refresh_token, NOW + 10).await;
    assert!(matches!(replay, Err(AuthError::InvalidToken)));
    Ok(())
}

#[test]
fn access_token_carries_roles_and_fresh_jti() {
    let (state, user) = test_state();
    let token = state
        .signer()
        .issue(&user.id.to_string(), &user.email, &user.roles, now_unix())
        .expect("token issuance");
    let claims = state
        .signer()
        .verify(&token, now_unix())
        .expect("token verification");
    assert_eq!(claims.roles, user.roles);
    assert_eq!(claims.sub, user.id.to_string());
}
