//! Shared setup for the `haloconv` command-line demos.

use std::io::IsTerminal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Installs a `fmt` subscriber on stderr, filtered by `RUST_LOG` (default `info`).
///
/// Reports go to stdout, so piping a demo's output keeps only the results.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal());
    Registry::default().with(filter).with(fmt_layer).init();
}
