//! Diagnostic logging setup.
//!
//! The library only emits `tracing` events. Binaries call [`init_logging`]
//! once to route them to stderr, keeping stdout free for command output.

use tracing_subscriber::EnvFilter;

/// Filter used when neither `--debug` nor `RUST_LOG` is given.
pub const DEFAULT_FILTER: &str = "warn";

/// Filter used with `--debug`.
pub const DEBUG_FILTER: &str = "warn,sysextctl=debug";

/// Build the event filter. `RUST_LOG` wins over `debug` when set.
pub fn build_filter(debug: bool) -> EnvFilter {
    let fallback = if debug { DEBUG_FILTER } else { DEFAULT_FILTER };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Install a stderr subscriber. Later calls are ignored.
pub fn init_logging(debug: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(build_filter(debug))
        .with_target(debug)
        .with_writer(std::io::stderr)
        .try_init();
}
