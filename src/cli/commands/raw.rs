use anyhow::{Context, Result};
use clap::Args;
use reqwest::Method;
use serde_json::Value;

use skyman::api::constants::interfaces;
use skyman::api::{ApiRequest, Session};

#[derive(Args)]
pub struct RawArgs {
    /// HTTP method (GET, POST, PUT, PATCH, DELETE)
    pub method: String,
    /// Service type whose endpoint the path is relative to
    pub service_type: String,
    /// Path under the service endpoint, e.g. servers/detail
    pub path: String,
    /// JSON request body
    #[arg(long)]
    pub data: Option<String>,
    /// Endpoint interface
    #[arg(long, default_value = interfaces::PUBLIC)]
    pub interface: String,
}

pub async fn raw_command(args: RawArgs, session: &Session) -> Result<()> {
    let method = parse_method(&args.method)?;
    let url = session
        .service_url_for(&args.service_type, &args.interface, &args.path)
        .await?;

    let mut request = ApiRequest::new(method, url);
    if let Some(data) = &args.data {
        let body: Value = serde_json::from_str(data).context("--data is not valid JSON")?;
        request = request.json(body);
    }

    let response = session.request(request).await?;
    if !response.is_empty() {
        println!("{}", render_body(response.text()));
    }
    Ok(())
}

fn parse_method(method: &str) -> Result<Method> {
    Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("Invalid HTTP method: {}", method))
}

/// Pretty-print JSON bodies, pass anything else through
fn render_body(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| body.to_string())
}
