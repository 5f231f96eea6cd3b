//! Structured logging setup.

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Installs the global subscriber.
///
/// `RUST_LOG` wins over `log_level` when set. JSON output also records span
/// closes, which carries request latency from the HTTP trace layer.
pub fn init_logging(log_level: &str, json_logs: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_span_events(FmtSpan::CLOSE))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_line_number(false))
            .init();
    }

    tracing::debug!(level = %log_level, json = json_logs, "Logging initialized");
}
