//! netsec-trainer entry point
//!
//! With no subcommand the full training pipeline runs with default settings.

use anyhow::Context;
use clap::Parser;
use netsec_trainer::cli::{cmd_push_data, cmd_train, load_config, Cli, Commands};
use netsec_trainer::config::RunContext;
use netsec_trainer::logging;

const MONGO_URL_VAR: &str = "MONGO_DB_URL";

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let schema = match &cli.command {
        Some(Commands::Train { schema }) => schema.clone(),
        _ => None,
    };
    let config = load_config(cli.config.as_deref(), schema.as_deref())?;
    let context = RunContext::now(&config);
    let log_file = logging::init(&context.log_dir, &context.timestamp)?;
    tracing::debug!(path = %log_file.display(), "logging to file");

    let mongo_url = std::env::var(MONGO_URL_VAR)
        .with_context(|| format!("{} is not set", MONGO_URL_VAR))?;

    match cli.command {
        Some(Commands::PushData { file }) => cmd_push_data(&config, &file, &mongo_url)?,
        Some(Commands::Train { .. }) | None => cmd_train(config, context, &mongo_url)?,
    }

    Ok(())
}
