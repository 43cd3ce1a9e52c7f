//! Structured logging bootstrap shared by the CLI and any embedder of
//! `foundry-core`.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global `tracing` subscriber.
///
/// Respects `RUST_LOG` when set, otherwise defaults to `info` for this crate
/// and `warn` for dependencies. Safe to call more than once; subsequent calls
/// are no-ops (the global subscriber can only be installed once per process).
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,foundry_core=info,foundry=info"));

    let fmt_layer = fmt::layer().with_target(true);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(tracing_error::ErrorLayer::default())
        .try_init();
}

/// Initialize logging with every span event emitted as single-line JSON,
/// used by `--format json` CLI invocations that want machine-parseable logs
/// interleaved with their structured command output on stderr.
pub fn init_json() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer().json().with_target(true);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(tracing_error::ErrorLayer::default())
        .try_init();
}
