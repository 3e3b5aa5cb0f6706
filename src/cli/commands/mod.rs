pub mod endpoint;
pub mod raw;
pub mod server;
pub mod token;

use anyhow::Result;
use std::sync::Arc;

use skyman::api::Session;

use super::app::Commands;
use crate::config::Config;

/// Build the session from config and dispatch one command
pub async fn run(command: Commands, config: &Config) -> Result<()> {
    let session = Arc::new(Session::new(config.credential()?, config.session_options())?);

    match command {
        Commands::Token(args) => token::token_command(args, &session).await,
        Commands::Endpoint(args) => endpoint::endpoint_command(args, &session).await,
        Commands::Raw(args) => raw::raw_command(args, &session).await,
        Commands::Server(args) => server::server_command(args, session, config).await,
    }
}
