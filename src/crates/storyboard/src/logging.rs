//! Tracing subscriber setup

use crate::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber
///
/// `RUST_LOG` takes precedence over `config.level`. Returns `false` when a
/// global subscriber was already installed.
pub fn init(config: &LoggingConfig) -> bool {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter(config))
        .with_ansi(config.colored)
        .with_target(true);

    let result = match (config.format.as_str(), config.timestamps) {
        ("pretty", true) => builder.pretty().try_init(),
        ("pretty", false) => builder.pretty().without_time().try_init(),
        (_, true) => builder.compact().try_init(),
        (_, false) => builder.compact().without_time().try_init(),
    };
    result.is_ok()
}

fn filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}
