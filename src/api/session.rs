//! Session aggregate: one credential, one cached token, one HTTP client.
//!
//! A `Session` is shared (usually behind an `Arc`) by every caller in the
//! process that talks to the same cloud identity. The cached token is the
//! only mutable state; it is swapped atomically on refresh and refreshes are
//! serialized by a single lock so concurrent callers never issue duplicate
//! identity requests.

use arc_swap::ArcSwapOption;
use chrono::Utc;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use super::auth;
use super::catalog;
use super::error::{Error, Result};
use super::models::{CachedToken, Credential, Endpoint, Token};
use super::resilience::{RequestLogger, RetryPolicy, SessionOptions};

pub struct Session {
    pub(super) credential: Credential,
    pub(super) options: SessionOptions,
    pub(super) http: reqwest::Client,
    pub(super) logger: RequestLogger,
    pub(super) retry_policy: RetryPolicy,
    token: ArcSwapOption<CachedToken>,
    refresh_lock: Mutex<()>,
}

impl Session {
    pub fn new(credential: Credential, options: SessionOptions) -> Result<Self> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(options.timeout)
            .connect_timeout(options.connect_timeout)
            .user_agent(options.user_agent.clone())
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self::with_http_client(credential, options, http))
    }

    /// Create a session around an already configured HTTP client
    pub fn with_http_client(credential: Credential, options: SessionOptions, http: reqwest::Client) -> Self {
        Self {
            logger: RequestLogger::new(options.monitoring.clone()),
            retry_policy: RetryPolicy::new(options.retry.clone()),
            credential,
            options,
            http,
            token: ArcSwapOption::empty(),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn region(&self) -> &str {
        self.credential.region()
    }

    /// Current token snapshot, without validating or refreshing it
    pub fn cached_token(&self) -> Option<Arc<CachedToken>> {
        self.token.load_full()
    }

    /// Drop the cached token so the next caller re-authenticates
    pub fn invalidate_token(&self) {
        if self.token.swap(None).is_some() {
            debug!("Cached token invalidated");
        }
    }

    /// Drop `stale` if it is still the cached token. A token refreshed by
    /// another caller since `stale` was handed out is kept.
    pub fn invalidate_if_current(&self, stale: &Arc<CachedToken>) {
        let previous = self.token.compare_and_swap(stale, None::<Arc<CachedToken>>);
        if previous.as_ref().is_some_and(|current| Arc::ptr_eq(current, stale)) {
            debug!("Cached token invalidated");
        } else {
            debug!("Rejected token already replaced, keeping the cached one");
        }
    }

    /// A valid token, refreshing it at most once for all concurrent callers
    pub async fn token(&self) -> Result<Arc<CachedToken>> {
        if let Some(cached) = self.valid_snapshot() {
            return Ok(cached);
        }

        let _guard = self.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited for the lock.
        if let Some(cached) = self.valid_snapshot() {
            debug!("Reusing token refreshed by a concurrent caller");
            return Ok(cached);
        }

        if self.token.load().is_some() {
            info!("Token expired, re-authenticating");
        }
        self.refresh_locked().await
    }

    pub async fn token_id(&self) -> Result<String> {
        Ok(self.token().await?.id().to_string())
    }

    /// Authenticate unconditionally and replace the cached token
    pub async fn issue_token(&self) -> Result<Arc<CachedToken>> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    pub async fn project_id(&self) -> Result<String> {
        let cached = self.token().await?;
        Ok(cached.token.project_id().unwrap_or_default().to_string())
    }

    pub async fn user_id(&self) -> Result<String> {
        Ok(self.token().await?.token.user.id.clone())
    }

    pub async fn is_admin(&self) -> Result<bool> {
        Ok(self.token().await?.token.has_role("admin"))
    }

    /// Resolve a service base URL from the current token's catalog
    pub async fn resolve_endpoint(
        &self,
        service_type: &str,
        service_name: &str,
        interface: &str,
        region: &str,
    ) -> Result<String> {
        let cached = self.token().await?;
        let url = catalog::resolve_endpoint(&cached.token.catalog, service_type, service_name, interface, region)?;
        debug!("Resolved {}:{}:{}@{} to {}", service_type, service_name, interface, region, url);
        Ok(url)
    }

    /// Resolve in the credential's region
    pub async fn endpoint(&self, service_type: &str, service_name: &str, interface: &str) -> Result<String> {
        self.resolve_endpoint(service_type, service_name, interface, self.region())
            .await
    }

    pub async fn service_endpoints(&self, service_type: &str, service_name: &str) -> Result<Vec<Endpoint>> {
        let cached = self.token().await?;
        Ok(catalog::service_endpoints(&cached.token.catalog, service_type, service_name).to_vec())
    }

    fn valid_snapshot(&self) -> Option<Arc<CachedToken>> {
        self.token.load_full().filter(|cached| !cached.is_expired())
    }

    /// Must be called with `refresh_lock` held
    async fn refresh_locked(&self) -> Result<Arc<CachedToken>> {
        let token = auth::issue_token(&self.http, &self.credential, &self.options, &self.logger).await?;

        let obtained_at = Instant::now();
        let expires_at = obtained_at + self.local_lifetime(&token);
        let cached = Arc::new(CachedToken {
            token,
            obtained_at,
            expires_at,
        });

        self.token.store(Some(cached.clone()));
        info!(
            "Token issued, locally valid for {:?}",
            expires_at.saturating_duration_since(obtained_at)
        );
        Ok(cached)
    }

    fn local_lifetime(&self, token: &Token) -> Duration {
        let local = self.options.local_token_expiry;
        if !self.options.clamp_to_server_expiry {
            return local;
        }

        match token.expires_at {
            Some(server_expiry) => {
                let remaining = (server_expiry - Utc::now()).to_std().unwrap_or(Duration::ZERO);
                if remaining < local {
                    warn!(
                        "Server token lifetime {:?} is shorter than local expiry {:?}, clamping",
                        remaining, local
                    );
                    remaining
                } else {
                    local
                }
            }
            None => local,
        }
    }
}
