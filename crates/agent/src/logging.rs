use thiserror::Error;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

use crate::config::LogFormat;

#[derive(Debug, Error)]
pub enum LogError {
    #[error("invalid filter: {0}")]
    Filter(#[from] ParseError),
    #[error("subscriber already installed: {0}")]
    Init(#[from] TryInitError),
    #[error("reload: {0}")]
    Reload(#[from] reload::Error),
}

/// Runtime access to the installed log filter.
#[derive(Clone)]
pub struct LevelHandle(reload::Handle<EnvFilter, Registry>);

impl LevelHandle {
    pub fn set_filter(&self, directives: &str) -> Result<(), LogError> {
        let filter = EnvFilter::try_new(directives)?;
        self.0.reload(filter)?;
        Ok(())
    }

    pub fn set_debug(&self) -> Result<(), LogError> {
        self.set_filter("debug")
    }

    pub fn current(&self) -> Option<String> {
        self.0.with_current(|f| f.to_string()).ok()
    }
}

/// Installs the global subscriber. `RUST_LOG` wins over `filter` when set.
pub fn init(format: LogFormat, filter: &str) -> Result<LevelHandle, LogError> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(filter))?;
    let (filter, handle) = reload::Layer::new(filter);
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).try_init()?,
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init()?,
    }
    Ok(LevelHandle(handle))
}
