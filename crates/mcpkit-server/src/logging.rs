//! Logging initialization.
//!
//! Stdout belongs to the stdio transport, so the subscriber always writes to
//! stderr. Silent mode (`MCPKIT_SILENT=true` or `LOG_LEVEL=silent`) skips
//! initialization entirely. An explicit `RUST_LOG` wins over `LOG_LEVEL`.

use mcpkit_core::config::RuntimeConfig;
use tracing_subscriber::EnvFilter;

/// Initialize the process-wide tracing subscriber. Safe to call more than
/// once; later calls are no-ops.
pub fn init_logging(config: &RuntimeConfig) {
    if config.is_silent() {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_filter()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
