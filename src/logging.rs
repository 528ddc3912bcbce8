//! Logging initialization

use tracing_subscriber::EnvFilter;

/// Initialize tracing
///
/// `RUST_LOG` wins when set; otherwise `default_level` applies to every
/// target (e.g. `"info"` or `"livesockets=debug,info"`).
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .init();
}
