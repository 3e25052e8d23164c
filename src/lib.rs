//! # Oturum (Session Security Service)
//!
//! `oturum` authenticates users and maintains browser sessions against a
//! backend API using three cooperating credentials:
//!
//! - a short-lived **access token** (HS256 JWT, verified offline),
//! - a long-lived, single-use **refresh token** (opaque, storage-backed,
//!   rotated on every refresh),
//! - a **CSRF token** enforced with the double-submit cookie pattern.
//!
//! ## Rotation
//!
//! Refresh tokens are looked up by value, never by user id: a token that has
//! already been rotated simply fails lookup, so a stolen-but-stale token can
//! not hijack a session. The replace step is a compare-and-swap keyed on the
//! presented token; when two rotations race, exactly one wins and the loser
//! observes `ConcurrentRotation`.
//!
//! ## Trust boundary
//!
//! The [`gate`] module implements the edge-level authorization gate used in
//! front of navigable routes. It is a convenience layer only; the credential
//! verifier, rotation controller, and CSRF guard in [`api`] remain the actual
//! enforcement point for every protected operation.

pub mod api;
pub mod cli;
pub mod gate;

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
