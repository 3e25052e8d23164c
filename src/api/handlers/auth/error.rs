//! Error taxonomy for the session security subsystem.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Every way an authentication or session operation can fail.
///
/// Callers only ever see a uniform body per status class; the precise variant
/// is logged server-side and drives cookie-clearing decisions in handlers.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("refresh token is required")]
    MissingToken,
    #[error("invalid refresh token")]
    InvalidToken,
    #[error("refresh token has expired")]
    ExpiredToken,
    #[error("session was rotated concurrently")]
    ConcurrentRotation,
    #[error("CSRF token validation failed")]
    CsrfValidationFailed,
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<super::token::TokenError> for AuthError {
    fn from(err: super::token::TokenError) -> Self {
        Self::Internal(anyhow::Error::new(err))
    }
}

impl AuthError {
    /// Whether a refresh failure must force the caller back to a full login
    /// (all session cookies cleared), never a silent partial state.
    #[must_use]
    pub fn clears_session(&self) -> bool {
        matches!(
            self,
            Self::MissingToken | Self::InvalidToken | Self::ExpiredToken | Self::ConcurrentRotation
        )
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidCredentials
            | Self::MissingToken
            | Self::InvalidToken
            | Self::ExpiredToken
            | Self::ConcurrentRotation => StatusCode::UNAUTHORIZED,
            Self::CsrfValidationFailed => StatusCode::FORBIDDEN,
            Self::Configuration(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        // Uniform bodies: never reveal which factor or token check failed.
        let status = self.status();
        let message = match status {
            StatusCode::UNAUTHORIZED => {
                warn!("authentication failure: {self}");
                "Authentication failed"
            }
            StatusCode::FORBIDDEN => {
                warn!("csrf failure: {self}");
                "CSRF token validation failed"
            }
            _ => {
                error!("internal auth error: {self}");
                "Internal server error"
            }
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_map_to_401() {
        for err in [
            AuthError::InvalidCredentials,
            AuthError::MissingToken,
            AuthError::InvalidToken,
            AuthError::ExpiredToken,
            AuthError::ConcurrentRotation,
        ] {
            assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn csrf_maps_to_403() {
        assert_eq!(
            AuthError::CsrfValidationFailed.status(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn refresh_failures_clear_session() {
        assert!(AuthError::InvalidToken.clears_session());
        assert!(AuthError::ExpiredToken.clears_session());
        assert!(AuthError::ConcurrentRotation.clears_session());
        assert!(!AuthError::InvalidCredentials.clears_session());
        assert!(!AuthError::CsrfValidationFailed.clears_session());
    }
}
