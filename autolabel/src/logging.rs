//! Tracing setup for autolabel.
//!
//! All diagnostics go to stderr so that `autolabel plan` stdout stays
//! machine-readable.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG` env var. Defaults to `autolabel=info` if unset, so the
/// computed label sets show up in the Actions log.
///
/// # Example
/// ```bash
/// RUST_LOG=autolabel=debug autolabel run
/// ```
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("autolabel=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
