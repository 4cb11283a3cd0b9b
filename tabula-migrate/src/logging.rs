//! Logging setup for the migration engine.
//!
//! The engine emits `tracing` events: issued DDL at `debug`, table outcomes
//! at `info`, swallowed constraint and label failures at `warn`. Installing a
//! subscriber is left to the application; [`init`] installs one driven by
//! environment variables when the `tracing-subscriber` feature is enabled.
//!
//! - `TABULA_DEBUG=true|1|yes` - log at `debug`
//! - `TABULA_LOG_LEVEL=trace|debug|info|warn|error` - explicit level
//! - `TABULA_LOG_FORMAT=json|pretty|compact` - output format (default: json)
//!
//! ```rust,no_run
//! tabula_migrate::logging::init();
//! ```

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event.
    Json,
    /// Multi-line human readable output.
    Pretty,
    /// Single-line human readable output.
    Compact,
}

impl LogFormat {
    fn parse(value: Option<&str>) -> Self {
        match value.map(str::to_ascii_lowercase).as_deref() {
            Some("pretty") => Self::Pretty,
            Some("compact") => Self::Compact,
            _ => Self::Json,
        }
    }

    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Pretty => "pretty",
            Self::Compact => "compact",
        }
    }
}

fn parse_flag(value: Option<&str>) -> bool {
    value.is_some_and(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
}

fn parse_level(level: Option<&str>, debug: bool) -> &'static str {
    match level.map(str::to_ascii_lowercase).as_deref() {
        Some("trace") => "trace",
        Some("debug") => "debug",
        Some("info") => "info",
        Some("warn") => "warn",
        Some("error") => "error",
        _ if debug => "debug",
        _ => "warn",
    }
}

/// Whether `TABULA_DEBUG` enables debug logging.
pub fn is_debug_enabled() -> bool {
    parse_flag(env::var("TABULA_DEBUG").ok().as_deref())
}

/// Level from `TABULA_LOG_LEVEL`, else `debug` or `warn` depending on `TABULA_DEBUG`.
pub fn log_level() -> &'static str {
    parse_level(
        env::var("TABULA_LOG_LEVEL").ok().as_deref(),
        is_debug_enabled(),
    )
}

/// Format from `TABULA_LOG_FORMAT`.
pub fn log_format() -> LogFormat {
    LogFormat::parse(env::var("TABULA_LOG_FORMAT").ok().as_deref())
}

/// Install the environment-driven subscriber. Subsequent calls are no-ops,
/// as is a call when neither `TABULA_DEBUG` nor `TABULA_LOG_LEVEL` is set.
pub fn init() {
    INIT.call_once(|| {
        if !is_debug_enabled() && env::var("TABULA_LOG_LEVEL").is_err() {
            return;
        }

        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let level = log_level();
            let filter = EnvFilter::try_new(format!(
                "tabula={level},tabula_migrate={level},tabula_cli={level}"
            ))
            .unwrap_or_else(|_| EnvFilter::new("warn"));

            let registry = tracing_subscriber::registry().with(filter);
            let installed = match log_format() {
                LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
                LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
                LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
            };

            if installed.is_ok() {
                tracing::info!(level, format = log_format().as_str(), "logging initialized");
            }
        }
    });
}
