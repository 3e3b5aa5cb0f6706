use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info};

mod cli;
mod config;

use cli::Cli;
use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;
    info!("Starting skyman {}", env!("CARGO_PKG_VERSION"));

    let config = Config::load(cli.conf.as_deref())?;
    debug!("Config: {:?}", config);

    cli::commands::run(cli.command, &config).await
}

/// `RUST_LOG` wins over `--debug`; `--log-file` truncates on each run
fn init_logging(cli: &Cli) -> Result<()> {
    let default_level = if cli.debug { LevelFilter::Debug } else { LevelFilter::Info };

    let mut builder = env_logger::Builder::new();
    builder.filter_level(default_level);
    builder.parse_env(env_logger::Env::default());

    if let Some(path) = &cli.log_file {
        let log_file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .with_context(|| format!("Failed to open log file: {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(log_file)));
    }

    builder.init();
    Ok(())
}
