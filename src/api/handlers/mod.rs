//! API handlers for the session security service.

pub mod auth;
pub mod health;
