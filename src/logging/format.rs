//! Subscriber setup: JSON lines (one object per line) for ingestion, or compact text for a terminal.

use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Initialize tracing for the demo process
pub struct StructuredLogger;

impl StructuredLogger {
    /// Install the global subscriber on stdout; RUST_LOG wins over `default_level`.
    pub fn init(json: bool, default_level: &str) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directives(default_level)));
        let registry = tracing_subscriber::registry().with(filter);
        if json {
            registry
                .with(fmt::layer().json().with_current_span(false).flatten_event(true))
                .init();
        } else {
            registry.with(fmt::layer().compact()).init();
        }
    }
}

/// `level` for everything, spelled out for this crate and request traces.
fn default_directives(level: &str) -> String {
    format!("{level},ids_demo={level},tower_http={level}")
}
