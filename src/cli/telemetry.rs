use anyhow::Result;
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};

/// Initialize the tracing subscriber.
///
/// The verbosity level from `-v` flags seeds the default directive; `RUST_LOG`
/// still takes precedence so operators can raise per-target filters without
/// restarting with different flags.
///
/// # Errors
///
/// Returns an error if a global subscriber has already been installed.
pub fn init(level: Option<tracing::Level>) -> Result<()> {
    let fmt_layer = fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(false);

    let default_directive = level.unwrap_or(tracing::Level::ERROR);
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_directive.into())
        .from_env_lossy();

    let subscriber = Registry::default().with(fmt_layer).with(env_filter);

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}
