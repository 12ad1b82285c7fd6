pub(crate) mod helpers;
pub(crate) mod rules;
mod version;

use anyhow::Result;
use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    #[command(subcommand)]
    Rules(rules::RulesCmd),
    Version,
}

pub async fn run(opts: crate::Opts) -> Result<()> {
    let mode = opts.output_mode();
    match opts.cmd {
        Commands::Rules(cmd) => rules::execute(cmd, mode, &opts.endpoint, &opts.agent).await,
        Commands::Version => {
            version::execute(mode);
            Ok(())
        }
    }
}
