use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use relay_billing::{config, init_tracing};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    let cfg = config::load_config(&args.config)?;
    init_tracing(&cfg.logging);

    match &args.command {
        cli::Commands::Adjust { multiplier } => {
            commands::adjust::execute(&cfg, multiplier).await?;
        }
        cli::Commands::Restore { backup } => {
            commands::restore::execute(&cfg, backup).await?;
        }
        cli::Commands::Backups => {
            commands::backups::execute(&cfg).await?;
        }
        cli::Commands::Simulate {
            model,
            usage,
            multipliers,
        } => {
            commands::simulate::execute(&cfg, model, usage.into(), multipliers).await?;
        }
        cli::Commands::Record {
            account,
            model,
            usage,
        } => {
            commands::record::execute(&cfg, account, model, usage.into()).await?;
        }
        cli::Commands::Test => {
            commands::test::execute(&cfg).await?;
        }
    }

    Ok(())
}
