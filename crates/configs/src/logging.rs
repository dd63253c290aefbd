use tracing::warn;
use tracing_subscriber::{fmt, EnvFilter};

use crate::LoggingConfig;

/// `RUST_LOG` wins over the configured filter.
fn filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter))
}

/// Installs the global subscriber. A second call only logs a warning.
pub fn init_tracing(config: &LoggingConfig) {
    let result = if config.json {
        fmt().with_env_filter(filter(config)).json().try_init()
    } else {
        fmt().with_env_filter(filter(config)).try_init()
    };
    if let Err(e) = result {
        warn!(error = %e, "tracing init failed");
    }
}
