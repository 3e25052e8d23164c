//! Double-submit CSRF guard, run as middleware on every request.
//!
//! The guard only ever compares; it never mints CSRF values. Issuance happens
//! exclusively on login and refresh. Security of the scheme rests on the
//! cookie being unreadable cross-origin and the header being settable only by
//! same-origin script.

use axum::{
    extract::{Extension, Request},
    http::{HeaderMap, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::cookies::{ACCESS_COOKIE_NAME, CSRF_COOKIE_NAME, extract_cookie};
use super::error::AuthError;
use super::state::AuthState;
use super::token::now_unix;

pub const CSRF_HEADER_NAME: &str = "x-csrf-token";

/// Side-effect-free methods are exempt from CSRF validation.
fn safe_method(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    )
}

/// Whether this request must present a matching CSRF pair.
///
/// Unauthenticated callers are exempt: there is no session to forge.
pub(crate) fn requires_validation(method: &Method, authenticated: bool) -> bool {
    authenticated && !safe_method(method)
}

/// Length-independent-content comparison; both inputs are server-issued
/// base64 strings so leaking the length is fine.
pub(crate) fn tokens_match(cookie: &str, header: &str) -> bool {
    let (cookie, header) = (cookie.as_bytes(), header.as_bytes());
    if cookie.len() != header.len() {
        return false;
    }
    cookie
        .iter()
        .zip(header)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

fn is_authenticated(state: &AuthState, headers: &HeaderMap) -> bool {
    extract_cookie(headers, ACCESS_COOKIE_NAME)
        .is_some_and(|token| state.signer().verify(&token, now_unix()).is_ok())
}

/// Axum middleware enforcing the double-submit check.
///
/// Fails closed with 403 before the request reaches business logic; any
/// absence or mismatch is treated the same.
pub async fn guard(
    Extension(state): Extension<Arc<AuthState>>,
    request: Request,
    next: Next,
) -> Response {
    if !requires_validation(request.method(), is_authenticated(&state, request.headers())) {
        return next.run(request).await;
    }

    let cookie = extract_cookie(request.headers(), CSRF_COOKIE_NAME);
    let header = request
        .headers()
        .get(CSRF_HEADER_NAME)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string);

    match (cookie, header) {
        (Some(cookie), Some(header))
            if !cookie.is_empty() && !header.is_empty() && tokens_match(&cookie, &header) =>
        {
            next.run(request).await
        }
        _ => AuthError::CsrfValidationFailed.into_response(),
    }
}
