use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use pathquery_cli::{
    cli::{Cli, Commands},
    commands,
};
use pathquery_config::ConfigLoader;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = ConfigLoader::load_or_default(cli.config.clone()).await?;

    // RUST_LOG overrides the flags and the config file
    let level = cli.level_filter(&config.logging.level);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "pathquery_core={level},pathquery_config={level},pathquery_cli={level}",
            level = level
        ))
    });
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    debug!("Using configuration {:?}", config);

    match cli.command {
        Commands::Validate {
            query,
            model,
            schema,
            bags,
        } => commands::validate::execute(&config, cli.format, query, model, schema, bags).await,
        Commands::Bags(cmd) => commands::bags::execute(cmd, cli.format).await,
    }
}
