use std::io;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs the global subscriber for the binaries.
///
/// Filtering comes from `RUST_LOG`, defaulting to `warn`. Logs go to stderr;
/// stdout carries the program's own `[label] message` lines.
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter)
        .init();
}
