//! Tracing subscriber setup

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "tubely=debug,tower_http=debug";

/// Install the global subscriber. `RUST_LOG` overrides the default filter;
/// `log_format = "json"` switches to JSON lines.
pub fn init_telemetry(log_format: &str, environment: &str) -> Result<(), anyhow::Error> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?;
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()?;
    }

    tracing::info!(log_format = %log_format, environment = %environment, "Tracing initialized");
    Ok(())
}
