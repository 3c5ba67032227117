//! Centralized logging configuration for applications embedding vio-factors
//!
//! The library itself only emits `tracing` events; installing a subscriber is
//! left to the host application. These helpers provide the standard setup.

use tracing::Level;

/// Initialize the tracing subscriber with the standard configuration
///
/// Default log level: INFO (overrideable via RUST_LOG environment variable)
///
/// Format includes:
/// - Timestamp (YYYY-MM-DD HH:MM:SS)
/// - Log level (INFO, WARN, ERROR, DEBUG, TRACE)
/// - Module/target path
///
/// # Example
/// ```no_run
/// use vio_factors::init_logger;
///
/// init_logger();
/// tracing::info!("Estimator started");
/// ```
///
/// # Environment Variables
/// Override the default log level using `RUST_LOG`:
/// ```bash
/// RUST_LOG=debug cargo test
/// RUST_LOG=vio_factors::imu=warn cargo test
/// ```
pub fn init_logger() {
    init_logger_with_level(Level::INFO)
}

/// Initialize the tracing subscriber with a custom default level
///
/// Calling this more than once is harmless: later calls keep the subscriber
/// that was installed first.
///
/// # Arguments
/// * `default_level` - The default log level (overrideable via RUST_LOG)
pub fn init_logger_with_level(default_level: Level) {
    use tracing_subscriber::fmt::time::SystemTime;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .with_timer(SystemTime)
        .with_target(true)
        .with_level(true)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .try_init();
}
