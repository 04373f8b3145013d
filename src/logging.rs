//! Structured logging setup for the binary. The library only emits events.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `NAMEPLAN_LOG=debug`.
pub const LOG_ENV: &str = "NAMEPLAN_LOG";

/// Filter used when `NAMEPLAN_LOG` is unset or unparsable.
const DEFAULT_LEVEL: &str = "warn";

/// Install the global subscriber, writing to stderr so stdout stays
/// machine-readable. `verbose` overrides the environment with `debug`.
/// A second call is a no-op.
pub fn init(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| return EnvFilter::new(DEFAULT_LEVEL))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
