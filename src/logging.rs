// src/logging.rs
// =============================================================================
// Sets up `tracing` output.
//
// Logs go to stderr so that stdout only carries the summary (or the JSON
// report with --json). The level comes from RUST_LOG and defaults to "info":
//
//   RUST_LOG=debug site-crawler https://example.com
//   RUST_LOG=site_crawler=trace,reqwest=warn site-crawler https://example.com
// =============================================================================

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    // try_init: a second call (e.g. from tests) is not an error worth crashing on
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();
}
