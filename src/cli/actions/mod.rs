pub mod server;

use secrecy::SecretString;

/// Actions the CLI can dispatch to.
#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        dsn: String,
        signing_key: SecretString,
        access_ttl_minutes: i64,
        refresh_ttl_days: i64,
        token_issuer: String,
        token_audience: String,
        frontend_url: String,
    },
}
