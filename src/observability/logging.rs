//! Structured logging initialization.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` takes precedence; otherwise the configured level applies to
/// the relay's own targets.
pub fn init(log_level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("edge_relay={log_level},tower_http=info"))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
