//! Tracing setup for processes hosting an action coordinator.
//!
//! Diagnostics go to stderr and are filtered by `RUST_LOG`. They are separate
//! from action output, which only ever flows through the output sink.

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`. Falls back to `default_directives` (e.g. `"warn,actionbuf=info"`)
/// when unset or unparsable. Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=actionbuf=debug cargo run -p actionbuf-ui
/// ```
pub fn init(default_directives: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives))
        .with_context(|| format!("parse log directives {default_directives:?}"))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init()
        .context("install tracing subscriber")?;
    Ok(())
}
