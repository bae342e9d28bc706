use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LoggingConfig;

/// Filter from `RUST_LOG` when set, otherwise from the configured level.
///
/// # Errors
/// Returns an error if the configured directives do not parse.
pub fn env_filter(cfg: &LoggingConfig) -> anyhow::Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(&cfg.level)?),
    }
}

/// Install the global subscriber: human-readable or JSON lines on stdout.
///
/// # Errors
/// Returns an error if the filter is invalid or a subscriber is already set.
pub fn init(cfg: &LoggingConfig) -> anyhow::Result<()> {
    let filter = env_filter(cfg)?;

    let (json, text) = if cfg.json {
        let layer = fmt::layer()
            .json()
            .with_timer(UtcTime::rfc_3339())
            .with_current_span(true)
            .with_span_list(false);
        (Some(layer), None)
    } else {
        let layer = fmt::layer().with_timer(UtcTime::rfc_3339()).with_target(true);
        (None, Some(layer))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(text)
        .try_init()?;
    Ok(())
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn configured_level_parses() {
        let cfg = LoggingConfig {
            level: "info,fleet_register=debug".to_owned(),
            json: true,
        };
        assert!(env_filter(&cfg).is_ok());
    }
}
