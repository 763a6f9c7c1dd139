//! Tracing subscriber setup.
//!
//! `RUST_LOG` takes precedence over `[logging].level`. Output goes to stderr
//! so `cesta search --json` keeps stdout clean.

use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};

/// Install the global subscriber. Fails if one is already installed.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directives(config).into());

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.format {
        LogFormat::Text => registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    };

    result.map_err(|e| anyhow!("Failed to initialise logging: {}", e))
}

fn default_directives(config: &LoggingConfig) -> String {
    let level = config.level.as_str();
    format!("{level},cesta={level},cesta_core={level},sqlx=warn,hyper=warn,reqwest=warn")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn directives_follow_configured_level() {
        let config = LoggingConfig {
            level: LogLevel::Debug,
            format: LogFormat::Json,
        };
        let directives = default_directives(&config);
        assert!(directives.starts_with("debug,cesta=debug"));
        assert!(EnvFilter::try_new(&directives).is_ok());
    }
}
