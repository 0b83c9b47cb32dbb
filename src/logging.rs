use tracing_subscriber::EnvFilter;

/// Filter variable, e.g. `CSVPEEK_LOG=csvpeek=debug`.
pub const LOG_ENV: &str = "CSVPEEK_LOG";

/// Install the global subscriber. Logs go to stderr; stdout belongs to
/// JSON-RPC in MCP mode and to the preview in CLI mode.
/// Quiet (`warn`) unless `CSVPEEK_LOG` says otherwise; `verbose` bumps to `debug`.
pub fn init(verbose: bool) {
    let default = if verbose { "csvpeek=debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));

    // A second init (tests, embedding) is harmless. Keep the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .try_init();
}
