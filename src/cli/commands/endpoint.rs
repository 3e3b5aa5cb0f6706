use anyhow::Result;
use clap::{Args, Subcommand};
use colored::*;

use skyman::api::Session;
use skyman::api::constants::interfaces;

#[derive(Args)]
pub struct EndpointCommands {
    #[command(subcommand)]
    pub command: EndpointSubcommands,
}

#[derive(Subcommand)]
pub enum EndpointSubcommands {
    /// Resolve a service endpoint from the token catalog
    Show {
        /// Service type (e.g. compute, volumev3, image)
        service_type: String,
        /// Service name, any name when omitted
        #[arg(long, default_value = "")]
        name: String,
        /// Endpoint interface
        #[arg(long, default_value = interfaces::PUBLIC)]
        interface: String,
        /// Region, the configured region when omitted
        #[arg(long)]
        region: Option<String>,
    },
    /// List every endpoint of a service
    List {
        service_type: String,
        #[arg(long, default_value = "")]
        name: String,
    },
}

pub async fn endpoint_command(args: EndpointCommands, session: &Session) -> Result<()> {
    match args.command {
        EndpointSubcommands::Show {
            service_type,
            name,
            interface,
            region,
        } => {
            let region = region.unwrap_or_else(|| session.region().to_string());
            let url = session
                .resolve_endpoint(&service_type, &name, &interface, &region)
                .await?;
            println!("{}", url);
        }
        EndpointSubcommands::List { service_type, name } => {
            let endpoints = session.service_endpoints(&service_type, &name).await?;
            if endpoints.is_empty() {
                println!("{}", format!("No endpoints for service '{}'", service_type).yellow());
                return Ok(());
            }
            for endpoint in endpoints {
                let region = if endpoint.region.is_empty() {
                    &endpoint.region_id
                } else {
                    &endpoint.region
                };
                println!("{:<10} {:<12} {}", endpoint.interface.cyan(), region, endpoint.url);
            }
        }
    }
    Ok(())
}
