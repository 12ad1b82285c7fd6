use std::path::PathBuf;

use clap::Parser;

use crate::config::AgentConfig;

pub const DEFAULT_CONFIG: &str = "/etc/flexalert/agent.yml";

#[derive(Debug, Parser)]
#[command(name = "flexalert_agent", version, about = "Flexible alert agent")]
pub struct Args {
    #[arg(short, long, default_value = DEFAULT_CONFIG, help = "Configuration file path")]
    pub config: PathBuf,

    #[arg(short, long, help = "Bus endpoint (overrides config)")]
    pub endpoint: Option<String>,

    #[arg(short, long, help = "Rule directory (overrides config)")]
    pub rules: Option<String>,

    #[arg(short, long, help = "Verbose diagnostics")]
    pub verbose: bool,
}

impl Args {
    /// Command-line values take precedence over the file.
    pub fn apply(&self, cfg: &mut AgentConfig) {
        if let Some(endpoint) = &self.endpoint {
            cfg.bus.endpoint = endpoint.clone();
        }
        if let Some(rules) = &self.rules {
            cfg.server.rules_dir = rules.clone();
        }
        if self.verbose {
            cfg.server.verbose = true;
        }
    }
}
