pub mod application;
pub mod cli;
pub mod domain;
pub mod io;
pub mod storage;

pub use domain::*;
pub use storage::Repository;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Install the global tracing subscriber, writing to stderr.
/// `RUST_LOG` takes precedence over the `verbose` default.
pub fn init_tracing(verbose: bool) {
    INIT_TRACING.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let default = if verbose { "spendwise=debug" } else { "spendwise=warn" };
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    });
}
