use super::commands::endpoint::EndpointCommands;
use super::commands::raw::RawArgs;
use super::commands::server::ServerCommands;
use super::commands::token::TokenCommands;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "skyman")]
#[command(version, about = "A CLI for OpenStack-style clouds with bulk operations")]
pub struct Cli {
    /// Config file (default: $SKYMAN_CONF_FILE or <config dir>/skyman/clouds.toml)
    #[arg(short, long, global = true)]
    pub conf: Option<PathBuf>,
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,
    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Identity token operations
    Token(TokenCommands),
    /// Service catalog lookups
    Endpoint(EndpointCommands),
    /// Send an authenticated request to a service endpoint
    Raw(RawArgs),
    /// Bulk server operations
    Server(ServerCommands),
}
