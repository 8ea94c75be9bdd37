//! Logging setup
//!
//! Configuration is resolved under a temporary subscriber, since the log
//! filter itself comes from the resolved configuration.

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;
use ytrank_common::config::{CliOverrides, Config};
use ytrank_common::Result;

/// Filter used while the configured one is not known yet
pub const BOOTSTRAP_FILTER: &str = "info";

/// Resolve configuration, reporting load warnings on stderr
pub fn resolve_config(cli: &CliOverrides) -> Result<Config> {
    resolve_config_with_writer(cli, std::io::stderr)
}

/// Resolve configuration with load warnings written to `writer`
pub fn resolve_config_with_writer<W>(cli: &CliOverrides, writer: W) -> Result<Config>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(BOOTSTRAP_FILTER))
        .with_writer(writer)
        .finish();
    tracing::subscriber::with_default(bootstrap, || Config::resolve(cli))
}

/// Install the global subscriber for the configured filter
pub fn init_logging(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level)
        .unwrap_or_else(|_| EnvFilter::new(BOOTSTRAP_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
