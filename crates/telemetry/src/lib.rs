//! Telemetry facade: one-shot tracing/logging bootstrap.

use shelf_kernel::settings::{LogFormat, TelemetrySettings};
use tracing_subscriber::EnvFilter;

/// Initialize the tracing pipeline from settings.
///
/// `RUST_LOG` takes precedence over the default `info` filter. Repeated calls
/// are harmless; only the first registration wins (tests and the CLI both go
/// through here).
pub fn init(settings: &TelemetrySettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let result = match settings.log_format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .try_init(),
    };

    if result.is_err() {
        tracing::debug!(target: "shelf-telemetry", "telemetry already initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_twice_does_not_panic() {
        let settings = TelemetrySettings::default();
        init(&settings);
        init(&settings);
    }
}
