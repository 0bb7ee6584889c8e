//! Tracing initialization: `RUST_LOG`-driven filtering plus a choice of
//! human-readable or JSON output, matching the CLI tracing setup used
//! elsewhere in this codebase (minus the OpenTelemetry exporter wiring,
//! which has no collector configured for a single-instance controller).

use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogFormat;

pub fn init(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Pretty => {
            fmt().with_env_filter(filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().with_env_filter(filter).json().init();
        }
    }
}
