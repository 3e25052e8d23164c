use crate::cli::actions::Action;
use crate::cli::commands::{
    ARG_ACCESS_TTL_MINUTES, ARG_DSN, ARG_FRONTEND_URL, ARG_PORT, ARG_REFRESH_TTL_DAYS,
    ARG_SIGNING_KEY, ARG_TOKEN_AUDIENCE, ARG_TOKEN_ISSUER,
};
use anyhow::{Result, anyhow};
use secrecy::SecretString;

/// Turn parsed arguments into the action the binary executes.
///
/// # Errors
///
/// Returns an error when a required argument is missing (clap enforces these,
/// so this only triggers for programmatic misuse).
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let required = |name: &str| -> Result<String> {
        matches
            .get_one::<String>(name)
            .cloned()
            .ok_or_else(|| anyhow!("missing required argument: --{name}"))
    };

    Ok(Action::Server {
        port: matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080),
        dsn: required(ARG_DSN)?,
        signing_key: SecretString::from(required(ARG_SIGNING_KEY)?),
        access_ttl_minutes: matches
            .get_one::<i64>(ARG_ACCESS_TTL_MINUTES)
            .copied()
            .unwrap_or(15),
        refresh_ttl_days: matches
            .get_one::<i64>(ARG_REFRESH_TTL_DAYS)
            .copied()
            .unwrap_or(7),
        token_issuer: required(ARG_TOKEN_ISSUER)?,
        token_audience: required(ARG_TOKEN_AUDIENCE)?,
        frontend_url: required(ARG_FRONTEND_URL)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;

    #[test]
    fn dispatch_builds_server_action() -> Result<()> {
        let matches = commands::new().get_matches_from(vec![
            "oturum",
            "--port",
            "9000",
            "--dsn",
            "postgres://localhost:5432/oturum",
            "--signing-key",
            "0123456789abcdef0123456789abcdef",
            "--refresh-ttl-days",
            "30",
        ]);

        let Action::Server {
            port,
            dsn,
            refresh_ttl_days,
            token_issuer,
            ..
        } = handler(&matches)?;

        assert_eq!(port, 9000);
        assert_eq!(dsn, "postgres://localhost:5432/oturum");
        assert_eq!(refresh_ttl_days, 30);
        assert_eq!(token_issuer, "oturum");
        Ok(())
    }
}
