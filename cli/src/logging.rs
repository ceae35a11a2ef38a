//! Diagnostic tracing for the runner.
//!
//! Test results go to stderr through the runner's own reporting; tracing adds
//! a line per script run and is tuned through `RUST_LOG`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Used when `RUST_LOG` is unset: per-script `info` events from the runner
/// and the assembler, warnings from everything else.
pub const DEFAULT_FILTER: &str = "docs_test=info,assembler=info,docblocks=warn,warn";

/// Initialize the tracing subscriber.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .compact(),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_enables_script_events() {
        let filter = EnvFilter::try_new(DEFAULT_FILTER).expect("default filter must parse");
        let rendered = filter.to_string().to_lowercase();
        assert!(rendered.contains("assembler=info"));
        assert!(rendered.contains("docs_test=info"));
    }
}
