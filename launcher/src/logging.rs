//! Diagnostic tracing, off by default.
//!
//! Operators see the launcher's progress lines and error hints, which are
//! printed directly by the commands. Tracing is the layer underneath: step
//! boundaries, subprocess spawns, and tolerated failures, enabled with
//! `RUST_LOG` when something needs investigating.

use std::io;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset or unparseable.
const DEFAULT_FILTER: &str = "warn";

/// Install the global subscriber, writing compact lines to stderr.
///
/// ```bash
/// RUST_LOG=launcher=debug launcher run
/// ```
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let stderr_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .init();
}
