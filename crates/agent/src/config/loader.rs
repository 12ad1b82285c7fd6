use std::path::Path;

use regex::Regex;
use thiserror::Error;

use super::schema::AgentConfig;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("validation: {0}")]
    Validation(String),
}

pub fn load_from_file(path: &Path) -> Result<AgentConfig, LoadError> {
    let contents = std::fs::read_to_string(path)?;
    load_from_str(&contents)
}

pub fn load_from_str(yaml: &str) -> Result<AgentConfig, LoadError> {
    // an empty document deserializes to unit, not to a map
    let cfg: AgentConfig = if yaml.trim().is_empty() {
        AgentConfig::default()
    } else {
        serde_yaml::from_str(yaml)?
    };
    validate(&cfg)?;
    Ok(cfg)
}

pub fn validate(cfg: &AgentConfig) -> Result<(), LoadError> {
    if cfg.bus.endpoint.is_empty() {
        return Err(LoadError::Validation("bus.endpoint must not be empty".into()));
    }
    if cfg.bus.name.is_empty() {
        return Err(LoadError::Validation("bus.name must not be empty".into()));
    }
    if cfg.server.rules_dir.is_empty() {
        return Err(LoadError::Validation("server.rules_dir must not be empty".into()));
    }
    for (field, pattern) in [
        ("bus.assets_pattern", &cfg.bus.assets_pattern),
        ("bus.metrics_pattern", &cfg.bus.metrics_pattern),
        ("bus.sensor_pattern", &cfg.bus.sensor_pattern),
    ] {
        if let Err(e) = Regex::new(pattern) {
            return Err(LoadError::Validation(format!("{field} is not a valid regex: {e}")));
        }
    }
    Ok(())
}
