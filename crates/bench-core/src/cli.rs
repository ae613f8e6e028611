//! Shared CLI helpers for the workspace tools.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::{Error, Result};

/// Verbose-mode filter. HTTP internals stay at `info` so request bodies
/// and connection chatter do not drown the per-sample diagnostics.
const VERBOSE_DIRECTIVES: &str = "debug,hyper=info,reqwest=info";

/// Initializes tracing for a CLI run.
///
/// `RUST_LOG` takes precedence over the `verbose` flag when set. A second
/// initialization in the same process is a configuration error.
pub fn setup_cli_logging(verbose: bool) -> Result<()> {
    let defaults = if verbose { VERBOSE_DIRECTIVES } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(defaults));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(verbose))
        .with(filter)
        .try_init()
        .map_err(|e| Error::Config(format!("logging is already initialized: {e}")))
}
