use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_VAR: &str = "SHEET_NOTES_LOG";

/// Human-readable logs on stderr so stdout stays clean for command output.
/// Filter comes from `SHEET_NOTES_LOG` (e.g. `debug`), default `warn`.
pub fn init() {
    let env_filter = EnvFilter::try_from_env(LOG_VAR)
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(std::env::var("NO_COLOR").is_err());

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .try_init();
}
