//! Access token signing plus refresh/CSRF token generation.
//!
//! Access tokens are HS256 JWTs verified offline: validity is purely
//! cryptographic and temporal, never checked against storage. Refresh and
//! CSRF tokens are opaque high-entropy strings; only the refresh token is
//! persisted, and only as a SHA-256 hash.

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use rand::{RngCore, rngs::OsRng};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Minimum key length for HS256; anything shorter weakens the MAC below the
/// hash output size and is rejected at startup.
pub const MIN_KEY_BYTES: usize = 32;

const TOKEN_ALG: &str = "HS256";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct AccessTokenHeader {
    alg: String,
    typ: String,
}

impl AccessTokenHeader {
    fn hs256() -> Self {
        Self {
            alg: TOKEN_ALG.to_string(),
            typ: "JWT".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessTokenClaims {
    pub sub: String,
    pub email: String,
    pub roles: Vec<String>,
    pub jti: String,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("signing key must be at least {MIN_KEY_BYTES} bytes, got {0}")]
    WeakKey(usize),
    #[error("invalid token format")]
    TokenFormat,
    #[error("invalid base64url encoding")]
    Base64,
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlg(String),
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("invalid issuer")]
    InvalidIssuer,
    #[error("invalid audience")]
    InvalidAudience,
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, TokenError> {
    let json = serde_json::to_vec(value)?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn b64d_json<T: for<'de> Deserialize<'de>>(s: &str) -> Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD.decode(s).map_err(|_| TokenError::Base64)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Current time as unix seconds.
#[must_use]
pub fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(0))
}

/// Signs and verifies access tokens with a shared symmetric key.
pub struct TokenSigner {
    key: Vec<u8>,
    issuer: String,
    audience: String,
    ttl_seconds: i64,
}

impl TokenSigner {
    /// Build a signer, enforcing the minimum key length.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::WeakKey`] when the key is shorter than
    /// [`MIN_KEY_BYTES`].
    pub fn new(
        key: &SecretString,
        issuer: String,
        audience: String,
        ttl_seconds: i64,
    ) -> Result<Self, TokenError> {
        let key = key.expose_secret().as_bytes().to_vec();
        if key.len() < MIN_KEY_BYTES {
            return Err(TokenError::WeakKey(key.len()));
        }
        Ok(Self {
            key,
            issuer,
            audience,
            ttl_seconds,
        })
    }

    /// Mint a signed access token for the given subject.
    ///
    /// Every call stamps a fresh `jti`, so two tokens for the same subject are
    /// never byte-identical (basis for replay detection downstream).
    ///
    /// # Errors
    ///
    /// Returns an error if claim serialization fails.
    pub fn issue(
        &self,
        sub: &str,
        email: &str,
        roles: &[String],
        now: i64,
    ) -> Result<String, TokenError> {
        let claims = AccessTokenClaims {
            sub: sub.to_string(),
            email: email.to_string(),
            roles: roles.to_vec(),
            jti: Uuid::new_v4().to_string(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now,
            exp: now + self.ttl_seconds,
        };

        let header_b64 = b64e_json(&AccessTokenHeader::hs256())?;
        let claims_b64 = b64e_json(&claims)?;
        let signing_input = format!("{header_b64}.{claims_b64}");

        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|_| TokenError::WeakKey(self.key.len()))?;
        mac.update(signing_input.as_bytes());
        let signature_b64 = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{signing_input}.{signature_b64}"))
    }

    /// Verify a token and return its decoded claims.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the token is malformed or contains invalid base64/json,
    /// - the signature does not verify,
    /// - the claims fail validation (`iss`, `aud`, `exp`).
    pub fn verify(&self, token: &str, now: i64) -> Result<AccessTokenClaims, TokenError> {
        let mut parts = token.split('.');
        let header_b64 = parts.next().ok_or(TokenError::TokenFormat)?;
        let claims_b64 = parts.next().ok_or(TokenError::TokenFormat)?;
        let sig_b64 = parts.next().ok_or(TokenError::TokenFormat)?;
        if parts.next().is_some() {
            return Err(TokenError::TokenFormat);
        }

        let header: AccessTokenHeader = b64d_json(header_b64)?;
        if header.alg != TOKEN_ALG {
            return Err(TokenError::UnsupportedAlg(header.alg));
        }

        let signing_input = format!("{header_b64}.{claims_b64}");
        let signature = URL_SAFE_NO_PAD
            .decode(sig_b64)
            .map_err(|_| TokenError::Base64)?;
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|_| TokenError::WeakKey(self.key.len()))?;
        mac.update(signing_input.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        let claims: AccessTokenClaims = b64d_json(claims_b64)?;
        if claims.iss != self.issuer {
            return Err(TokenError::InvalidIssuer);
        }
        if claims.aud != self.audience {
            return Err(TokenError::InvalidAudience);
        }
        if claims.exp <= now {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

/// Create a new opaque refresh token.
///
/// 64 bytes of OS randomness; only the raw value goes to the cookie, the
/// registry stores its hash.
///
/// # Errors
///
/// Returns an error if the OS RNG fails.
pub fn generate_refresh_token() -> Result<String> {
    let mut bytes = [0u8; 64];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate refresh token")?;
    Ok(STANDARD.encode(bytes))
}

/// Create a new CSRF token, one per issued session.
///
/// # Errors
///
/// Returns an error if the OS RNG fails.
pub fn generate_csrf_token() -> Result<String> {
    let mut bytes = [0u8; 64];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate csrf token")?;
    Ok(STANDARD.encode(bytes))
}

/// Hash a refresh token so raw values never touch the database.
#[must_use]
pub fn hash_refresh_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn signer() -> TokenSigner {
        let key = SecretString::from("0123456789abcdef0123456789abcdef");
        TokenSigner::new(&key, "oturum".to_string(), "oturum-web".to_string(), 900)
            .expect("signer with valid key")
    }

    #[test]
    fn rejects_short_key() {
        let key = SecretString::from("short");
        let result = TokenSigner::new(&key, "i".to_string(), "a".to_string(), 60);
        assert!(matches!(result, Err(TokenError::WeakKey(5))));
    }

    #[test]
    fn sign_and_verify_round_trip() -> Result<(), TokenError> {
        let signer = signer();
        let roles = vec!["Admin".to_string(), "User".to_string()];
        let token = signer.issue("user-1", "alice@example.com", &roles, NOW)?;

        let claims = signer.verify(&token, NOW)?;
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.roles, roles);
        assert_eq!(claims.iss, "oturum");
        assert_eq!(claims.aud, "oturum-web");
        assert_eq!(claims.exp, NOW + 900);
        Ok(())
    }

    #[test]
    fn jti_is_fresh_per_call() -> Result<(), TokenError> {
        let signer = signer();
        let first = signer.issue("user-1", "a@example.com", &[], NOW)?;
        let second = signer.issue("user-1", "a@example.com", &[], NOW)?;
        assert_ne!(first, second);

        let first = signer.verify(&first, NOW)?;
        let second = signer.verify(&second, NOW)?;
        assert_ne!(first.jti, second.jti);
        Ok(())
    }

    #[test]
    fn rejects_expired_token() -> Result<(), TokenError> {
        let signer = signer();
        let token = signer.issue("user-1", "a@example.com", &[], NOW)?;

        let result = signer.verify(&token, NOW + 901);
        assert!(matches!(result, Err(TokenError::Expired)));
        Ok(())
    }

    #[test]
    fn rejects_wrong_issuer_or_audience() -> Result<(), TokenError> {
        let key = SecretString::from("0123456789abcdef0123456789abcdef");
        let signer = signer();
        let token = signer.issue("user-1", "a@example.com", &[], NOW)?;

        let other =
            TokenSigner::new(&key, "other".to_string(), "oturum-web".to_string(), 900)?;
        assert!(matches!(
            other.verify(&token, NOW),
            Err(TokenError::InvalidIssuer)
        ));

        let other = TokenSigner::new(&key, "oturum".to_string(), "other".to_string(), 900)?;
        assert!(matches!(
            other.verify(&token, NOW),
            Err(TokenError::InvalidAudience)
        ));
        Ok(())
    }

    #[test]
    fn rejects_tampered_signature() -> Result<(), TokenError> {
        let signer = signer();
        let token = signer.issue("user-1", "a@example.com", &[], NOW)?;

        let mut parts: Vec<&str> = token.split('.').collect();
        let forged = format!("{}A", parts[2]);
        parts[2] = &forged;
        let tampered = parts.join(".");

        let result = signer.verify(&tampered, NOW);
        assert!(matches!(
            result,
            Err(TokenError::InvalidSignature | TokenError::Base64)
        ));
        Ok(())
    }

    #[test]
    fn rejects_wrong_key() -> Result<(), TokenError> {
        let signer = signer();
        let token = signer.issue("user-1", "a@example.com", &[], NOW)?;

        let other_key = SecretString::from("ffffffffffffffffffffffffffffffff");
        let other = TokenSigner::new(
            &other_key,
            "oturum".to_string(),
            "oturum-web".to_string(),
            900,
        )?;
        assert!(matches!(
            other.verify(&token, NOW),
            Err(TokenError::InvalidSignature)
        ));
        Ok(())
    }

    #[test]
    fn refresh_token_is_64_random_bytes() -> anyhow::Result<()> {
        let token = generate_refresh_token()?;
        let decoded = STANDARD.decode(token.as_bytes())?;
        assert_eq!(decoded.len(), 64);

        let other = generate_refresh_token()?;
        assert_ne!(token, other);
        Ok(())
    }

    #[test]
    fn hash_refresh_token_stable() {
        let first = hash_refresh_token("token");
        let second = hash_refresh_token("token");
        let different = hash_refresh_token("other");
        assert_eq!(first, second);
        assert_ne!(first, different);
    }
}
