//! Diagnostic tracing, separate from the session's own stdout output.
//!
//! Everything goes to stderr so it never interleaves with `Assistant:` lines
//! on stdout.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber.
///
/// Reads `RUST_LOG`; falls back to `warn`, or `info` for our own crates when
/// `verbose` is set.
///
/// ```bash
/// RUST_LOG=gitpilot_core=debug gitpilot
/// ```
pub fn init(verbose: bool) {
    let fallback = if verbose {
        "warn,gitpilot_core=info,gitpilot_agent=info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
