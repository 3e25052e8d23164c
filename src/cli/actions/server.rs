use crate::api;
use crate::api::handlers::auth::AuthConfig;
use crate::cli::actions::Action;
use anyhow::Result;

/// Handle the server action
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Server {
            port,
            dsn,
            signing_key,
            access_ttl_minutes,
            refresh_ttl_days,
            token_issuer,
            token_audience,
            frontend_url,
        } => {
            let config = AuthConfig::new(frontend_url)
                .with_access_token_ttl_minutes(access_ttl_minutes)
                .with_refresh_token_ttl_days(refresh_ttl_days)
                .with_token_issuer(token_issuer)
                .with_token_audience(token_audience);

            api::new(port, dsn, signing_key, config).await?;
        }
    }

    Ok(())
}
