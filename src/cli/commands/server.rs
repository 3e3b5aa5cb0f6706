//! Bulk server commands. Each id is one batch item; `--wait` items act, then poll.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::*;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use skyman::api::constants::service_types;
use skyman::api::{ApiRequest, Error, Session};
use skyman::tasks::{BatchReport, StatusPoller, TaskExecutor};

use crate::cli::ui::ProgressLine;
use crate::config::Config;

const FAILURE_STATUSES: &[&str] = &["ERROR"];

#[derive(Args)]
pub struct ServerCommands {
    #[command(subcommand)]
    pub command: ServerSubcommands,
}

#[derive(Subcommand)]
pub enum ServerSubcommands {
    /// Wait until servers reach a status
    Wait {
        /// Server ids
        #[arg(required = true)]
        ids: Vec<String>,
        /// Target status, compared case-insensitively
        #[arg(long, default_value = "ACTIVE")]
        status: String,
        /// Seconds to wait per server
        #[arg(long, default_value_t = 600)]
        timeout: u64,
        /// Seconds between polls, from config when omitted
        #[arg(long)]
        interval: Option<u64>,
        /// Concurrent workers, from config when omitted
        #[arg(long)]
        parallel: Option<usize>,
    },
    /// Delete servers
    Delete {
        /// Server ids
        #[arg(required = true)]
        ids: Vec<String>,
        /// Wait until each server is gone
        #[arg(long)]
        wait: bool,
        /// Seconds to wait per server when --wait is set
        #[arg(long, default_value_t = 600)]
        timeout: u64,
        #[arg(long)]
        interval: Option<u64>,
        #[arg(long)]
        parallel: Option<usize>,
    },
    /// Attach volumes to one server
    AttachVolumes {
        /// Server id
        server: String,
        /// Volume ids
        #[arg(required = true)]
        volumes: Vec<String>,
        /// Wait until each volume shows up in the server's attachments
        #[arg(long)]
        wait: bool,
        #[arg(long, default_value_t = 600)]
        timeout: u64,
        #[arg(long)]
        interval: Option<u64>,
        #[arg(long)]
        parallel: Option<usize>,
    },
}

#[derive(Debug, Clone, Deserialize)]
struct ServerBody {
    server: ServerState,
}

#[derive(Debug, Clone, Deserialize)]
struct ServerState {
    #[serde(default)]
    status: String,
    #[serde(default)]
    fault: Option<Fault>,
}

#[derive(Debug, Clone, Deserialize)]
struct Fault {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Clone, Deserialize)]
struct AttachmentsBody {
    #[serde(rename = "volumeAttachments", default)]
    attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Deserialize)]
struct Attachment {
    #[serde(rename = "volumeId", default)]
    volume_id: String,
}

impl AttachmentsBody {
    fn contains(&self, volume: &str) -> bool {
        self.attachments.iter().any(|a| a.volume_id == volume)
    }
}

impl ServerState {
    fn is(&self, status: &str) -> bool {
        self.status.eq_ignore_ascii_case(status)
    }

    fn is_failed(&self) -> bool {
        FAILURE_STATUSES.iter().any(|s| self.is(s))
    }
}

pub async fn server_command(args: ServerCommands, session: Arc<Session>, config: &Config) -> Result<()> {
    match args.command {
        ServerSubcommands::Wait {
            ids,
            status,
            timeout,
            interval,
            parallel,
        } => {
            let poller = poller(config, interval, timeout);
            let executor = TaskExecutor::new(parallel.unwrap_or_else(|| config.parallelism()));
            let progress = Arc::new(ProgressLine::new(format!("Waiting for {}", status)));
            let total = ids.len();

            let report = executor
                .run_with_progress(
                    ids.clone(),
                    move |id: String| {
                        let session = session.clone();
                        let poller = poller.clone();
                        let status = status.clone();
                        async move {
                            let state = wait_for_server(&session, &poller, &id, &status).await?;
                            Ok::<_, anyhow::Error>(format!("{} {}", id, state.status))
                        }
                    },
                    progress,
                )
                .await;

            finish("wait", &ids, report, total)
        }
        ServerSubcommands::Delete {
            ids,
            wait,
            timeout,
            interval,
            parallel,
        } => {
            let poller = poller(config, interval, timeout);
            let executor = TaskExecutor::new(parallel.unwrap_or_else(|| config.parallelism()));
            let progress = Arc::new(ProgressLine::new("Deleting servers"));
            let total = ids.len();

            let report = executor
                .run_with_progress(
                    ids.clone(),
                    move |id: String| {
                        let session = session.clone();
                        let poller = poller.clone();
                        async move {
                            delete_server(&session, &poller, &id, wait).await?;
                            Ok::<_, anyhow::Error>(format!("{} deleted", id))
                        }
                    },
                    progress,
                )
                .await;

            finish("delete", &ids, report, total)
        }
        ServerSubcommands::AttachVolumes {
            server,
            volumes,
            wait,
            timeout,
            interval,
            parallel,
        } => {
            let poller = poller(config, interval, timeout);
            let executor = TaskExecutor::new(parallel.unwrap_or_else(|| config.parallelism()));
            let progress = Arc::new(ProgressLine::new(format!("Attaching to {}", server)));
            let total = volumes.len();
            let server = Arc::new(server);

            let report = executor
                .run_with_progress(
                    volumes.clone(),
                    move |volume: String| {
                        let session = session.clone();
                        let poller = poller.clone();
                        let server = server.clone();
                        async move {
                            attach_volume(&session, &poller, &server, &volume, wait).await?;
                            Ok::<_, anyhow::Error>(format!("{} attached", volume))
                        }
                    },
                    progress,
                )
                .await;

            finish("attach", &volumes, report, total)
        }
    }
}

fn poller(config: &Config, interval: Option<u64>, timeout: u64) -> StatusPoller {
    let interval = interval
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.poll_interval());
    StatusPoller::new(interval, Duration::from_secs(timeout))
}

async fn server_url(session: &Session, id: &str) -> Result<String> {
    Ok(session
        .service_url(service_types::COMPUTE, &format!("servers/{}", id))
        .await?)
}

async fn fetch_server(session: &Session, url: &str) -> Result<ServerState, Error> {
    let body: ServerBody = session.get_json(url).await?;
    Ok(body.server)
}

async fn wait_for_server(session: &Session, poller: &StatusPoller, id: &str, status: &str) -> Result<ServerState> {
    let url = server_url(session, id).await?;
    let url = url.as_str();
    let resource = format!("server {}", id);

    poller
        .poll_until(
            &resource,
            move || fetch_server(session, url),
            |state: &ServerState| state.is(status),
            ServerState::is_failed,
        )
        .await
        .map_err(|e| {
            let fault = e
                .last_state()
                .and_then(|s| s.fault.as_ref())
                .map(|f| f.message.clone())
                .filter(|m| !m.is_empty());
            match fault {
                Some(message) => anyhow::Error::new(e).context(format!("fault: {}", message)),
                None => anyhow::Error::new(e),
            }
        })
}

/// Delete, then with `wait` poll until the server is gone (404)
async fn delete_server(session: &Session, poller: &StatusPoller, id: &str, wait: bool) -> Result<()> {
    let url = server_url(session, id).await?;
    session
        .delete(url.as_str())
        .await
        .with_context(|| format!("Failed to delete server {}", id))?;

    if !wait {
        return Ok(());
    }

    let url = url.as_str();
    let resource = format!("server {}", id);
    poller
        .poll_until(
            &resource,
            move || async move {
                match fetch_server(session, url).await {
                    Ok(state) => Ok(Some(state)),
                    Err(e) if e.is_not_found() => Ok(None),
                    Err(e) => Err(e),
                }
            },
            |state: &Option<ServerState>| state.is_none(),
            |state: &Option<ServerState>| state.as_ref().is_some_and(ServerState::is_failed),
        )
        .await?;
    Ok(())
}

/// Attach, then with `wait` poll the server's attachments until `volume` is listed
async fn attach_volume(session: &Session, poller: &StatusPoller, server: &str, volume: &str, wait: bool) -> Result<()> {
    let url = server_url(session, &format!("{}/os-volume_attachments", server)).await?;
    session
        .request(ApiRequest::post(url.as_str()).json(json!({"volumeAttachment": {"volumeId": volume}})))
        .await
        .with_context(|| format!("Failed to attach volume {} to server {}", volume, server))?;

    if !wait {
        return Ok(());
    }

    let url = url.as_str();
    let resource = format!("volume {}", volume);
    poller
        .poll_until(
            &resource,
            move || async move { session.get_json::<AttachmentsBody>(url).await },
            |body: &AttachmentsBody| body.contains(volume),
            |_: &AttachmentsBody| false,
        )
        .await?;
    Ok(())
}

fn finish(action: &str, ids: &[String], report: BatchReport<String>, total: usize) -> Result<()> {
    for (_, line) in report.succeeded() {
        println!("{} {}", "✓".green(), line);
    }
    for (index, err) in report.failed() {
        let id = ids.get(index).map(String::as_str).unwrap_or("?");
        eprintln!("{} {}: {:#}", "✗".red(), id.yellow(), err);
    }
    report.log_summary(&format!("server {}", action));

    if !report.is_success() {
        anyhow::bail!("{} of {} servers failed to {}", report.failure_count(), total, action);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use skyman::api::{Credential, SessionOptions};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn token_body(base: &str) -> Value {
        json!({
            "token": {
                "user": {"id": "u-1", "name": "admin"},
                "project": {"id": "p-1", "name": "admin"},
                "expires_at": "2099-01-01T00:00:00.000000Z",
                "catalog": [{
                    "type": "compute",
                    "name": "nova",
                    "endpoints": [{"interface": "public", "region": "RegionOne", "url": format!("{}/compute", base)}]
                }]
            }
        })
    }

    async fn cloud() -> (MockServer, Arc<Session>) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/auth/tokens"))
            .respond_with(
                ResponseTemplate::new(201)
                    .insert_header("X-Subject-Token", "t-1")
                    .set_body_json(token_body(&server.uri())),
            )
            .expect(1)
            .mount(&server)
            .await;
        let credential = Credential::new(format!("{}/v3", server.uri()), "admin", "secret", "admin");
        let session = Session::new(credential, SessionOptions::default()).unwrap();
        (server, Arc::new(session))
    }

    #[tokio::test]
    async fn test_attach_volume_polls_until_listed() {
        let (server, session) = cloud().await;
        let route = "/compute/servers/s-1/os-volume_attachments";
        Mock::given(method("POST"))
            .and(path(route))
            .and(body_partial_json(json!({"volumeAttachment": {"volumeId": "v-1"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"volumeAttachment": {"volumeId": "v-1"}})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"volumeAttachments": []})))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"volumeAttachments": [{"volumeId": "v-1"}]})))
            .mount(&server)
            .await;

        let poller = StatusPoller::new(Duration::from_millis(10), Duration::from_secs(5));
        attach_volume(&session, &poller, "s-1", "v-1", true).await.unwrap();
    }

    #[tokio::test]
    async fn test_attach_volume_failure_is_reported() {
        let (server, session) = cloud().await;
        Mock::given(method("POST"))
            .and(path("/compute/servers/s-1/os-volume_attachments"))
            .respond_with(ResponseTemplate::new(409).set_body_string("volume in use"))
            .mount(&server)
            .await;

        let poller = StatusPoller::new(Duration::from_millis(10), Duration::from_secs(5));
        let err = attach_volume(&session, &poller, "s-1", "v-1", true).await.unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to attach volume v-1"));
    }

    #[test]
    fn test_server_state_parsing() {
        let body: ServerBody = serde_json::from_str(
            r#"{"server": {"id": "s1", "status": "ERROR", "fault": {"code": 500, "message": "No valid host"}}}"#,
        )
        .unwrap();
        assert!(body.server.is_failed());
        assert!(body.server.is("error"));
        assert_eq!(body.server.fault.unwrap().message, "No valid host");
    }

    #[test]
    fn test_attachments_parsing() {
        let body: AttachmentsBody = serde_json::from_str(
            r#"{"volumeAttachments": [{"id": "a1", "serverId": "s1", "volumeId": "v-1", "device": "/dev/vdb"}]}"#,
        )
        .unwrap();
        assert!(body.contains("v-1"));
        assert!(!body.contains("v-2"));

        let empty: AttachmentsBody = serde_json::from_str("{}").unwrap();
        assert!(!empty.contains("v-1"));
    }

    #[test]
    fn test_server_state_without_fault() {
        let body: ServerBody = serde_json::from_str(r#"{"server": {"status": "active"}}"#).unwrap();
        assert!(body.server.is("ACTIVE"));
        assert!(!body.server.is_failed());
    }
}
