pub mod logging;

use clap::{
    Arg, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

pub const ARG_PORT: &str = "port";
pub const ARG_DSN: &str = "dsn";
pub const ARG_SIGNING_KEY: &str = "signing-key";
pub const ARG_ACCESS_TTL_MINUTES: &str = "access-ttl-minutes";
pub const ARG_REFRESH_TTL_DAYS: &str = "refresh-ttl-days";
pub const ARG_TOKEN_ISSUER: &str = "token-issuer";
pub const ARG_TOKEN_AUDIENCE: &str = "token-audience";
pub const ARG_FRONTEND_URL: &str = "frontend-url";

/// Minimum signing key length in bytes; HS256 with a shorter key is a
/// configuration error, not a runtime condition.
pub const MIN_SIGNING_KEY_BYTES: usize = 32;

/// Validate hard configuration preconditions before dispatching.
///
/// # Errors
/// Returns an error string when the signing key is missing or shorter than
/// [`MIN_SIGNING_KEY_BYTES`].
pub fn validate(matches: &clap::ArgMatches) -> Result<(), String> {
    let Some(key) = matches.get_one::<String>(ARG_SIGNING_KEY) else {
        return Err(format!("Missing required argument: --{ARG_SIGNING_KEY}"));
    };

    if key.len() < MIN_SIGNING_KEY_BYTES {
        return Err(format!(
            "--{ARG_SIGNING_KEY} must be at least {MIN_SIGNING_KEY_BYTES} bytes, got {}",
            key.len()
        ));
    }

    Ok(())
}

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let command = Command::new("oturum")
        .about("Session security service")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("8080")
                .env("OTURUM_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_DSN)
                .short('d')
                .long(ARG_DSN)
                .help("Database connection string")
                .env("OTURUM_DSN")
                .required(true),
        )
        .arg(
            Arg::new(ARG_SIGNING_KEY)
                .short('k')
                .long(ARG_SIGNING_KEY)
                .help("Symmetric signing key for access tokens (>= 32 bytes)")
                .env("OTURUM_SIGNING_KEY")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_ACCESS_TTL_MINUTES)
                .long(ARG_ACCESS_TTL_MINUTES)
                .help("Access token lifetime in minutes")
                .default_value("15")
                .env("OTURUM_ACCESS_TTL_MINUTES")
                .value_parser(clap::value_parser!(i64).range(1..)),
        )
        .arg(
            Arg::new(ARG_REFRESH_TTL_DAYS)
                .long(ARG_REFRESH_TTL_DAYS)
                .help("Refresh token lifetime in days for persistent (remember-me) sessions")
                .default_value("7")
                .env("OTURUM_REFRESH_TTL_DAYS")
                .value_parser(clap::value_parser!(i64).range(1..)),
        )
        .arg(
            Arg::new(ARG_TOKEN_ISSUER)
                .long(ARG_TOKEN_ISSUER)
                .help("Issuer claim stamped into access tokens")
                .default_value("oturum")
                .env("OTURUM_TOKEN_ISSUER"),
        )
        .arg(
            Arg::new(ARG_TOKEN_AUDIENCE)
                .long(ARG_TOKEN_AUDIENCE)
                .help("Audience claim stamped into access tokens")
                .default_value("oturum-web")
                .env("OTURUM_TOKEN_AUDIENCE"),
        )
        .arg(
            Arg::new(ARG_FRONTEND_URL)
                .long(ARG_FRONTEND_URL)
                .help("Frontend origin allowed to call the API with credentials")
                .default_value("http://localhost:3000")
                .env("OTURUM_FRONTEND_URL"),
        );

    logging::with_args(command)
}
