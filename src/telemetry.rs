//! Tracing subscriber initialization for the service binaries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing subscriber.
///
/// The filter is taken from `RUST_LOG`, defaulting to `info` for the
/// crate when unset. Services running in containers usually want
/// `json = true` so log collectors can parse the output.
pub fn init_tracing(service_name: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!(service = service_name, version = crate::VERSION, "telemetry initialized");
}
