//! Session endpoints: login, refresh, logout, me, check-auth.

use axum::{
    Json,
    extract::Extension,
    http::{
        HeaderMap, StatusCode,
        header::{AUTHORIZATION, SET_COOKIE},
    },
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use super::cookies::{
    ACCESS_COOKIE_NAME, CSRF_COOKIE_NAME, REFRESH_COOKIE_NAME, clear_session_cookies,
    extract_cookie, session_cookies,
};
use super::error::AuthError;
use super::rotation::{IssuedSession, establish_session, refresh_session, terminate_session};
use super::state::AuthState;
use super::token::{AccessTokenClaims, TokenError, now_unix};
use super::types::{CheckAuthResponse, LoginRequest, MessageResponse, UserResponse};
use super::verifier::{UserRecord, verify_credentials};

/// Pull the access token from the cookie, falling back to a bearer header
/// for non-browser callers.
fn extract_access_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_cookie(headers, ACCESS_COOKIE_NAME) {
        return Some(token);
    }
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Resolve the caller's access token into verified claims.
///
/// Validity here is purely cryptographic and temporal; no storage lookup.
pub(crate) fn authenticate(
    state: &AuthState,
    headers: &HeaderMap,
) -> Result<AccessTokenClaims, AuthError> {
    let Some(token) = extract_access_token(headers) else {
        return Err(AuthError::MissingToken);
    };
    state
        .signer()
        .verify(&token, now_unix())
        .map_err(|err| match err {
            TokenError::Expired => AuthError::ExpiredToken,
            _ => AuthError::InvalidToken,
        })
}

fn set_cookie_headers(
    state: &AuthState,
    issued: &IssuedSession,
    now: i64,
) -> Result<HeaderMap, AuthError> {
    let mut headers = HeaderMap::new();
    let cookies = session_cookies(state.config(), issued, now)
        .map_err(|err| AuthError::Internal(err.into()))?;
    for cookie in cookies {
        headers.append(SET_COOKIE, cookie);
    }
    Ok(headers)
}

fn clear_cookie_headers(state: &AuthState) -> HeaderMap {
    let mut headers = HeaderMap::new();
    match clear_session_cookies(state.config()) {
        Ok(cookies) => {
            for cookie in cookies {
                headers.append(SET_COOKIE, cookie);
            }
        }
        Err(err) => error!("failed to build clearing cookies: {err}"),
    }
    headers
}

fn user_response(user: &UserRecord, csrf_token: String) -> UserResponse {
    UserResponse {
        id: user.id.to_string(),
        email: user.email.clone(),
        roles: user.roles.clone(),
        csrf_token,
    }
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Credentials accepted, session cookies set", body = UserResponse),
        (status = 401, description = "Invalid credentials", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    state: Extension<Arc<AuthState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Response, AuthError> {
    let now = now_unix();
    let user = verify_credentials(state.users(), &request.email, &request.password).await?;
    let issued = establish_session(&state, &user, request.remember_me, now).await?;

    let headers = set_cookie_headers(&state, &issued, now)?;
    let body = user_response(&user, issued.csrf_token);
    Ok((StatusCode::OK, headers, Json(body)).into_response())
}

#[utoipa::path(
    get,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "Session rotated, fresh cookies set", body = UserResponse),
        (status = 401, description = "Unknown, expired, or concurrently rotated token; cookies cleared", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn refresh(state: Extension<Arc<AuthState>>, headers: HeaderMap) -> Response {
    let now = now_unix();
    let presented = extract_cookie(&headers, REFRESH_COOKIE_NAME).unwrap_or_default();

    match refresh_session(&state, &presented, now).await {
        Ok((user, issued)) => match set_cookie_headers(&state, &issued, now) {
            Ok(cookie_headers) => {
                let body = user_response(&user, issued.csrf_token);
                (StatusCode::OK, cookie_headers, Json(body)).into_response()
            }
            Err(err) => err.into_response(),
        },
        Err(err) => {
            // Token-class failures force a clean slate: clear the whole
            // cookie triple so the client re-logins instead of limping on
            // with a half-valid session.
            if err.clears_session() {
                let clear = clear_cookie_headers(&state);
                let mut response = err.into_response();
                for (name, value) in &clear {
                    response.headers_mut().append(name, value.clone());
                }
                response
            } else {
                err.into_response()
            }
        }
    }
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Session cleared, cookies expired", body = MessageResponse),
        (status = 401, description = "Not authenticated", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn logout(
    state: Extension<Arc<AuthState>>,
    headers: HeaderMap,
) -> Result<Response, AuthError> {
    let claims = authenticate(&state, &headers)?;
    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;

    terminate_session(&state, user_id).await?;

    // Always expire the cookies, even if the session row was already gone.
    let clear = clear_cookie_headers(&state);
    let body = MessageResponse {
        message: "Logged out successfully".to_string(),
    };
    Ok((StatusCode::OK, clear, Json(body)).into_response())
}

#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current identity and roles", body = UserResponse),
        (status = 401, description = "Not authenticated", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn me(
    state: Extension<Arc<AuthState>>,
    headers: HeaderMap,
) -> Result<Response, AuthError> {
    let claims = authenticate(&state, &headers)?;
    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;

    let Some(user) = state.users().find_by_id(user_id).await? else {
        return Err(AuthError::InvalidToken);
    };

    // Echo the current CSRF cookie so the client can rehydrate its header
    // value after a reload; /auth/me never mints a new one.
    let csrf_token = extract_cookie(&headers, CSRF_COOKIE_NAME).unwrap_or_default();
    Ok(Json(user_response(&user, csrf_token)).into_response())
}

#[utoipa::path(
    get,
    path = "/auth/check-auth",
    responses(
        (status = 200, description = "Caller is authenticated; roles from token claims", body = CheckAuthResponse),
        (status = 401, description = "Not authenticated", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn check_auth(
    state: Extension<Arc<AuthState>>,
    headers: HeaderMap,
) -> Result<Json<CheckAuthResponse>, AuthError> {
    // Role claims come straight from the verified token; no storage hit on
    // this hot path (the edge gate calls it on admin navigations).
    let claims = authenticate(&state, &headers)?;
    Ok(Json(CheckAuthResponse {
        is_authenticated: true,
        roles: claims.roles,
    }))
}
