use std::sync::Once;

use tracing_subscriber::EnvFilter;

/// Checked before `RUST_LOG`.
const LOG_ENV: &str = "VGGT_PROBE_LOG";
const DEFAULT_DIRECTIVE: &str = "info";

static INIT: Once = Once::new();

/// Logs go to stderr so the console reports on stdout stay readable.
pub fn init(quiet: bool) {
    INIT.call_once(|| {
        let filter = if quiet {
            EnvFilter::new("error")
        } else {
            EnvFilter::try_from_env(LOG_ENV)
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
        };
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(!quiet)
            .with_writer(std::io::stderr)
            .init();
    });
}
