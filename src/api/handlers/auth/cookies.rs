//! Cookie names and builders for the session credential triple.

use axum::http::{
    HeaderMap, HeaderValue,
    header::{COOKIE, InvalidHeaderValue},
};

use super::rotation::IssuedSession;
use super::state::AuthConfig;

pub const ACCESS_COOKIE_NAME: &str = "accessToken";
pub const REFRESH_COOKIE_NAME: &str = "refreshToken";
pub const CSRF_COOKIE_NAME: &str = "csrf-token";

fn cookie(
    name: &str,
    value: &str,
    max_age: Option<i64>,
    http_only: bool,
    secure: bool,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{name}={value}; Path=/; SameSite=Strict");
    if http_only {
        cookie.push_str("; HttpOnly");
    }
    if let Some(seconds) = max_age {
        cookie.push_str(&format!("; Max-Age={seconds}"));
    }
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Build the three Set-Cookie values for a freshly issued session.
///
/// Persistent sessions get explicit Max-Age so the cookies survive browser
/// close; otherwise all three are session-scoped. The CSRF cookie is the one
/// cookie client script must be able to read, so it is never `HttpOnly`.
///
/// # Errors
///
/// Returns an error if a token contains bytes invalid in a header value.
pub fn session_cookies(
    config: &AuthConfig,
    issued: &IssuedSession,
    now: i64,
) -> Result<Vec<HeaderValue>, InvalidHeaderValue> {
    let secure = config.cookie_secure();
    let (access_age, refresh_age) = if issued.persistent {
        (
            Some(config.access_token_ttl_seconds()),
            Some(issued.refresh_expires_at - now),
        )
    } else {
        (None, None)
    };

    Ok(vec![
        cookie(
            ACCESS_COOKIE_NAME,
            &issued.access_token,
            access_age,
            true,
            secure,
        )?,
        cookie(
            REFRESH_COOKIE_NAME,
            &issued.refresh_token,
            refresh_age,
            true,
            secure,
        )?,
        // Mirrors the refresh TTL: the CSRF value is useless without a session.
        cookie(CSRF_COOKIE_NAME, &issued.csrf_token, refresh_age, false, secure)?,
    ])
}

/// Build expired Set-Cookie values that clear the whole triple.
///
/// # Errors
///
/// Returns an error only if header construction fails, which cannot happen
/// for the fixed inputs used here.
pub fn clear_session_cookies(config: &AuthConfig) -> Result<Vec<HeaderValue>, InvalidHeaderValue> {
    let secure = config.cookie_secure();
    Ok(vec![
        cookie(ACCESS_COOKIE_NAME, "", Some(0), true, secure)?,
        cookie(REFRESH_COOKIE_NAME, "", Some(0), true, secure)?,
        cookie(CSRF_COOKIE_NAME, "", Some(0), false, secure)?,
    ])
}

/// Pull a single cookie value out of the request headers.
#[must_use]
pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let header = headers.get(COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == name {
            return Some(val.to_string());
        }
    }
    None
}
