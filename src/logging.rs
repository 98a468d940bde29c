//! Tracing subscriber setup shared by the server and the CLI tools

use crate::config::LoggingConfig;
use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Build the filter: `RUST_LOG` wins, otherwise the configured level for
/// this crate and `warn` for dependencies.
fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
        return Ok(EnvFilter::from_default_env());
    }
    let directive = format!("warn,revenue_predictor={},tower_http={}", config.level, config.level);
    EnvFilter::try_new(&directive).map_err(|e| anyhow!("invalid log level '{}': {e}", config.level))
}

/// Install the global subscriber. `format = "json"` emits one JSON object per line.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = env_filter(config)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    let installed = match config.format.as_str() {
        "json" => builder.json().try_init(),
        "pretty" | "text" => builder.try_init(),
        other => return Err(anyhow!("unknown log format '{other}' (expected json or pretty)")),
    };
    installed.map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))
}
