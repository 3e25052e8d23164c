//! Auth handlers and the session security subsystem.
//!
//! Three cooperating credentials back every browser session:
//!
//! - **Access token** — HS256 JWT with `{sub, email, roles, jti, iss, aud,
//!   iat, exp}`; verified offline, minutes-scale TTL.
//! - **Refresh token** — 64 bytes of OS entropy, stored hashed, single-use:
//!   every refresh replaces it atomically (compare-and-swap on the presented
//!   token), so a reused or stolen-then-rotated token fails lookup.
//! - **CSRF token** — double-submit value compared cookie-vs-header on every
//!   authenticated state-changing request.
//!
//! ## Known gap
//!
//! The CSRF cookie is not cryptographically bound to the session: equality of
//! cookie and header is the only check, so fixation via a shared top-level
//! domain is theoretically possible. Kept as-is; the intended threat model
//! does not include attacker-controlled sibling subdomains.

pub(crate) mod cookies;
pub(crate) mod csrf;
mod error;
mod registry;
mod rotation;
pub(crate) mod session;
mod state;
mod token;
pub(crate) mod types;
mod verifier;

pub use error::AuthError;
pub use registry::{MemorySessionStore, PgSessionStore, Session, SessionStore};
pub use rotation::{IssuedSession, establish_session, refresh_session, terminate_session};
pub use state::{AuthConfig, AuthState};
pub use token::{TokenSigner, now_unix};
pub use verifier::{MemoryUserStore, PgUserStore, UserRecord, UserStore, verify_credentials};

#[cfg(test)]
mod tests;
