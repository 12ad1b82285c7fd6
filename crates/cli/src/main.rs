mod cmd;
mod output;
#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use cmd::Commands;
use output::OutputMode;

#[derive(Parser)]
#[command(name = "flexalert", version, about = "Flexible alert agent admin CLI")]
pub struct Opts {
    #[clap(subcommand)]
    cmd: Commands,

    #[arg(long, global = true, help = "Output as JSON")]
    json: bool,

    #[arg(long, global = true, default_value = "nats://127.0.0.1:4222", help = "Bus endpoint")]
    endpoint: String,

    #[arg(long, global = true, default_value = flexalert_common::subjects::AGENT_NAME, help = "Agent mailbox name")]
    agent: String,
}

impl Opts {
    pub fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let opts = Opts::parse();
    cmd::run(opts).await
}
