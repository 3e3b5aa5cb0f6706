use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::*;

use skyman::api::Session;

#[derive(Args)]
pub struct TokenCommands {
    #[command(subcommand)]
    pub command: TokenSubcommands,
}

#[derive(Subcommand)]
pub enum TokenSubcommands {
    /// Issue a new token and show its details
    Issue,
}

pub async fn token_command(args: TokenCommands, session: &Session) -> Result<()> {
    match args.command {
        TokenSubcommands::Issue => issue(session).await,
    }
}

async fn issue(session: &Session) -> Result<()> {
    let cached = session
        .issue_token()
        .await
        .context("Failed to issue token")?;
    let token = &cached.token;

    let expires = token
        .expires_at
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "-".to_string());

    println!("{:<12} {}", "id".bold(), cached.id());
    println!("{:<12} {}", "expires".bold(), expires);
    println!("{:<12} {}", "project_id".bold(), token.project_id().unwrap_or("-"));
    println!("{:<12} {}", "user_id".bold(), token.user.id);
    Ok(())
}
