use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use skyman::api::constants::{DEFAULT_DOMAIN, DEFAULT_LOCAL_TOKEN_EXPIRY_SECS, DEFAULT_REGION};
use skyman::api::{Credential, SessionOptions};
use skyman::tasks::default_parallelism;

pub const CONF_FILE_ENV: &str = "SKYMAN_CONF_FILE";
const CONF_FILE_NAME: &str = "clouds.toml";

/// Environment variables that override `[auth]` keys
const AUTH_ENV_OVERRIDES: &[(&str, AuthField)] = &[
    ("OS_AUTH_URL", AuthField::AuthUrl),
    ("OS_USERNAME", AuthField::Username),
    ("OS_PASSWORD", AuthField::Password),
    ("OS_PROJECT_NAME", AuthField::ProjectName),
    ("OS_USER_DOMAIN_NAME", AuthField::UserDomain),
    ("OS_PROJECT_DOMAIN_NAME", AuthField::ProjectDomain),
    ("OS_REGION_NAME", AuthField::Region),
];

#[derive(Debug, Clone, Copy)]
enum AuthField {
    AuthUrl,
    Username,
    Password,
    ProjectName,
    UserDomain,
    ProjectDomain,
    Region,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub auth_url: String,
    pub username: String,
    pub password: String,
    pub project_name: String,
    pub user_domain_name: String,
    pub project_domain_name: String,
    pub region_name: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            auth_url: String::new(),
            username: String::new(),
            password: String::new(),
            project_name: String::new(),
            user_domain_name: DEFAULT_DOMAIN.to_string(),
            project_domain_name: DEFAULT_DOMAIN.to_string(),
            region_name: DEFAULT_REGION.to_string(),
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("auth_url", &self.auth_url)
            .field("username", &self.username)
            .field("password", &"******")
            .field("project_name", &self.project_name)
            .field("user_domain_name", &self.user_domain_name)
            .field("project_domain_name", &self.project_domain_name)
            .field("region_name", &self.region_name)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Per-request timeout in seconds
    pub timeout: u64,
    pub connect_timeout: u64,
    /// Seconds a token is reused before re-authenticating
    pub token_expiry: u64,
    pub retries: u32,
    /// Seconds before the first retry
    pub retry_wait: f64,
    /// Worker count for bulk commands, CPU count when unset
    pub parallel: Option<usize>,
    pub poll_interval: u64,
    pub request_logging: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: 60,
            connect_timeout: 10,
            token_expiry: DEFAULT_LOCAL_TOKEN_EXPIRY_SECS,
            retries: 0,
            retry_wait: 1.0,
            parallel: None,
            poll_interval: 5,
            request_logging: true,
        }
    }
}

impl Config {
    /// Config file location: explicit path, then `$SKYMAN_CONF_FILE`, then the user config dir
    pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }
        if let Ok(path) = std::env::var(CONF_FILE_ENV) {
            if !path.is_empty() {
                return Ok(PathBuf::from(path));
            }
        }
        let config_dir = dirs::config_dir().context("Failed to get user config directory")?;
        Ok(config_dir.join("skyman").join(CONF_FILE_NAME))
    }

    /// Load the file (defaults when absent), then apply `.env` and `OS_*` overrides
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!("Loaded environment from {:?}", path);
        }

        let config_path = Self::resolve_path(explicit)?;
        let mut config = if config_path.exists() {
            Self::from_file(&config_path)?
        } else if explicit.is_some() {
            anyhow::bail!("Config file does not exist: {}", config_path.display());
        } else {
            info!("No config file at {:?}, using defaults", config_path);
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading config from: {:?}", path);
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }

    /// Apply non-empty values returned by `lookup` for each `OS_*` variable
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for &(key, field) in AUTH_ENV_OVERRIDES {
            let Some(value) = lookup(key).filter(|v| !v.is_empty()) else {
                continue;
            };
            debug!("Overriding auth setting from {}", key);
            let slot = match field {
                AuthField::AuthUrl => &mut self.auth.auth_url,
                AuthField::Username => &mut self.auth.username,
                AuthField::Password => &mut self.auth.password,
                AuthField::ProjectName => &mut self.auth.project_name,
                AuthField::UserDomain => &mut self.auth.user_domain_name,
                AuthField::ProjectDomain => &mut self.auth.project_domain_name,
                AuthField::Region => &mut self.auth.region_name,
            };
            *slot = value;
        }
    }

    pub fn credential(&self) -> Result<Credential> {
        let auth = &self.auth;
        let missing: Vec<&str> = [
            ("auth_url", &auth.auth_url),
            ("username", &auth.username),
            ("password", &auth.password),
            ("project_name", &auth.project_name),
        ]
        .iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| *name)
        .collect();

        if !missing.is_empty() {
            anyhow::bail!(
                "Missing auth settings: {} (set them in [auth] or via OS_* environment variables)",
                missing.join(", ")
            );
        }

        Ok(
            Credential::new(&auth.auth_url, &auth.username, &auth.password, &auth.project_name)
                .with_user_domain(or_default(&auth.user_domain_name, DEFAULT_DOMAIN))
                .with_project_domain(or_default(&auth.project_domain_name, DEFAULT_DOMAIN))
                .with_region(or_default(&auth.region_name, DEFAULT_REGION)),
        )
    }

    pub fn session_options(&self) -> SessionOptions {
        let client = &self.client;
        let retry_wait = if client.retry_wait.is_finite() && client.retry_wait >= 0.0 {
            Duration::from_secs_f64(client.retry_wait)
        } else {
            warn!("Ignoring invalid retry_wait {}", client.retry_wait);
            Duration::from_secs(1)
        };

        SessionOptions::builder()
            .timeout(Duration::from_secs(client.timeout))
            .connect_timeout(Duration::from_secs(client.connect_timeout))
            .local_token_expiry(Duration::from_secs(client.token_expiry))
            .retries(client.retries, retry_wait)
            .request_logging(client.request_logging)
            .build()
    }

    pub fn parallelism(&self) -> usize {
        self.client.parallel.unwrap_or_else(default_parallelism)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.client.poll_interval)
    }
}

fn or_default<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.is_empty() { default } else { value }
}
