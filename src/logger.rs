//! Logging setup shared by both binaries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing subscriber with the specified default log level.
///
/// The default covers both the library crate and the calling binary;
/// `RUST_LOG` overrides it, e.g. `RUST_LOG=roomcast=debug`.
/// Output goes to stderr so it does not mix with the chat surface on stdout.
///
/// ```no_run
/// roomcast::logger::setup_logger("roomcast-server", "info");
/// ```
pub fn setup_logger(binary_name: &str, default_log_level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                default_log_level,
                binary_name.replace('-', "_"),
                default_log_level
            ))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
