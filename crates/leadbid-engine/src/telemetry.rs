//! Tracing subscriber setup for binaries and services embedding the engine.

use leadbid_types::{LeadbidError, Result};
use tracing_subscriber::{EnvFilter, fmt};

/// Log line format.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Plain,
    /// One JSON object per line, for log shippers.
    Json,
}

/// Install the global subscriber. Filter comes from `RUST_LOG`, falling
/// back to `info`.
///
/// # Errors
/// Returns `Configuration` if a global subscriber is already installed.
pub fn init_tracing(format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter).with_target(true);
    let installed = match format {
        LogFormat::Plain => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| LeadbidError::Configuration(format!("tracing init failed: {e}")))
}
