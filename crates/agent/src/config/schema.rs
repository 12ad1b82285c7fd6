use serde::Deserialize;

use flexalert_common::subjects::{AGENT_NAME, AUTOCONFIG_SENDER};

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentConfig {
    pub server: ServerConfig,
    pub bus: BusConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub rules_dir: String,
    pub verbose: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            rules_dir: "./rules".to_string(),
            verbose: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct BusConfig {
    pub endpoint: String,
    pub name: String,
    pub assets_pattern: String,
    pub metrics_pattern: String,
    pub sensor_pattern: String,
    /// Sender whose incomplete ADD requests are merged into sensor rules.
    pub autoconfig_sender: String,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            endpoint: "nats://127.0.0.1:4222".to_string(),
            name: AGENT_NAME.to_string(),
            assets_pattern: ".*".to_string(),
            metrics_pattern: ".*".to_string(),
            sensor_pattern: "status.*".to_string(),
            autoconfig_sender: AUTOCONFIG_SENDER.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    pub format: LogFormat,
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Json,
            filter: "info".to_string(),
        }
    }
}
