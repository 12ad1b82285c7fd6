use std::error::Error;

use clap::Parser;

use flexalert_agent::cli::Args;
use flexalert_agent::config::{self, AgentConfig, LoadError};
use flexalert_agent::{logging, run};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let args = Args::parse();

    let (mut cfg, missing) = match config::load_from_file(&args.config) {
        Ok(cfg) => (cfg, None),
        Err(LoadError::Io(e)) => (AgentConfig::default(), Some(e)),
        Err(e) => return Err(format!("invalid config {}: {e}", args.config.display()).into()),
    };
    args.apply(&mut cfg);
    config::validate(&cfg)?;

    let log = logging::init(cfg.log.format, &cfg.log.filter)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "flexible alert agent starting");
    if let Some(e) = missing {
        tracing::warn!(path = %args.config.display(), error = %e, "config not readable, using defaults");
    }

    run::run(cfg, Some(log)).await
}
