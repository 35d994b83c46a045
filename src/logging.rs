//! Tracing subscriber setup
//!
//! Honours `RUST_LOG`; falls back to `info` for this crate when unset.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format of the fmt layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human readable, multi-line
    Pretty,
    /// One line per event
    #[default]
    Compact,
    /// Structured JSON
    Json,
}

impl LogFormat {
    /// Pick a format from `ARBRIDGE_LOG_FORMAT` (`pretty`, `compact`, `json`)
    pub fn from_env() -> Self {
        match std::env::var("ARBRIDGE_LOG_FORMAT").as_deref() {
            Ok("pretty") => Self::Pretty,
            Ok("json") => Self::Json,
            _ => Self::Compact,
        }
    }
}

const DEFAULT_FILTER: &str = "info,arbridge_lib=debug";

/// Install the global subscriber. A second call is a no-op that reports the error.
pub fn init(format: LogFormat) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    match format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().pretty())
            .try_init()?,
        LogFormat::Compact => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_thread_names(true))
            .try_init()?,
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .try_init()?,
    }

    tracing::info!(?format, "logging initialized");
    Ok(())
}
