//! Logging setup for the CLI.
//!
//! Diagnostics go to stderr so they never mix with the success line on
//! stdout. The filter comes from `--log-level` if given, else the
//! `QCONF_LOG` environment variable, else `warn`.

use std::io;

use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

pub const LOG_ENV: &str = "QCONF_LOG";
const DEFAULT_FILTER: &str = "warn";

/// Log output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Multi-line, with targets and timestamps
    Pretty,
    /// One line per event, no timestamps
    Compact,
}

/// Install the global subscriber.
pub fn init(level: Option<&str>, format: LogFormat) {
    let filter = match level {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
    };

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match format {
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_target(true)
            .with_writer(io::stderr)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(false)
            .without_time()
            .with_writer(io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .init();
}
