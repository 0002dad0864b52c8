pub mod api;
pub mod config;
pub mod coordinator;
pub mod db;
pub mod sensors;
pub mod state;
pub mod types;

use tracing_subscriber::EnvFilter;

/// Display name used in unique ids and device labels.
pub const NAME: &str = "OilFox";

/// Initialize structured logging with tracing.
/// Respects RUST_LOG env var; defaults to `info` level for tankwatch crate.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tankwatch=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
