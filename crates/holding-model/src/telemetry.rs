//! Tracing subscriber setup for hosts embedding the portal core

use crate::config::LoggingConfig;
use tracing_subscriber::{fmt, EnvFilter};

/// Install a global fmt subscriber
///
/// `RUST_LOG` wins over `config.level`. Returns `false` if a subscriber was
/// already installed, which makes repeated calls from tests harmless.
pub fn init(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    let builder = fmt().with_env_filter(filter).with_target(true);
    let installed = if config.json {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    };
    if installed {
        tracing::debug!(level = %config.level, json = config.json, "tracing initialized");
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_twice_is_harmless() {
        let config = LoggingConfig::default();
        let _ = init(&config);
        assert!(!init(&config));
    }
}
