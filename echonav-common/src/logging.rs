//! Tracing subscriber setup
//!
//! `RUST_LOG` always wins over the configured level so a single run can be
//! made more verbose without editing the config file.

use crate::config::LoggingConfig;
use crate::{Error, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global tracing subscriber.
///
/// Idempotent: if a global subscriber is already installed it is kept and
/// this returns `Ok`. Only an unparseable filter is an error.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(build_directive(&config.level)))
        .map_err(|e| Error::Logging(format!("Invalid log filter: {}", e)))?;

    if let Err(e) = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
    {
        tracing::debug!("Tracing subscriber already installed: {}", e);
    }
    Ok(())
}

fn build_directive(level: &str) -> String {
    format!("echonav_engine={level},echonav_common={level}")
}
