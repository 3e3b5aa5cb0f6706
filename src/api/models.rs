use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

use super::constants::{DEFAULT_DOMAIN, DEFAULT_REGION};

/// Password credential for one cloud identity, fixed for the lifetime of a session
#[derive(Clone, Serialize, Deserialize)]
pub struct Credential {
    pub auth_url: String,
    pub username: String,
    pub password: String,
    pub project_name: String,
    pub user_domain_name: String,
    pub project_domain_name: String,
    pub region: String,
}

impl Credential {
    pub fn new(
        auth_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        project_name: impl Into<String>,
    ) -> Self {
        Self {
            auth_url: auth_url.into(),
            username: username.into(),
            password: password.into(),
            project_name: project_name.into(),
            user_domain_name: DEFAULT_DOMAIN.to_string(),
            project_domain_name: DEFAULT_DOMAIN.to_string(),
            region: DEFAULT_REGION.to_string(),
        }
    }

    pub fn with_user_domain(mut self, domain: impl Into<String>) -> Self {
        self.user_domain_name = domain.into();
        self
    }

    pub fn with_project_domain(mut self, domain: impl Into<String>) -> Self {
        self.project_domain_name = domain.into();
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Region to resolve endpoints in, falling back to `RegionOne`
    pub fn region(&self) -> &str {
        if self.region.is_empty() {
            DEFAULT_REGION
        } else {
            &self.region
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("auth_url", &self.auth_url)
            .field("username", &self.username)
            .field("password", &"******")
            .field("project_name", &self.project_name)
            .field("user_domain_name", &self.user_domain_name)
            .field("project_domain_name", &self.project_domain_name)
            .field("region", &self.region)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Domain {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub domain: Option<Domain>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub domain: Option<Domain>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Role {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// One `{interface, region, url}` triple of a catalog entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Endpoint {
    #[serde(default)]
    pub id: String,
    pub interface: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub region_id: String,
    pub url: String,
}

impl Endpoint {
    pub fn in_region(&self, region: &str) -> bool {
        self.region == region || self.region_id == region
    }
}

/// A service and its endpoints, as embedded in a token
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

/// Token issued by the identity service.
///
/// The id travels in the `X-Subject-Token` response header, everything else
/// in the response body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Token {
    #[serde(skip)]
    pub id: String,
    #[serde(default)]
    pub methods: Vec<String>,
    #[serde(default)]
    pub user: User,
    #[serde(default)]
    pub project: Option<Project>,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub catalog: Vec<CatalogEntry>,
    #[serde(default)]
    pub issued_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Token {
    pub fn project_id(&self) -> Option<&str> {
        self.project.as_ref().map(|p| p.id.as_str())
    }

    pub fn has_role(&self, name: &str) -> bool {
        self.roles.iter().any(|r| r.name == name)
    }
}

/// Token held by a session together with its locally tracked expiry
#[derive(Debug, Clone)]
pub struct CachedToken {
    pub token: Token,
    pub obtained_at: Instant,
    pub expires_at: Instant,
}

impl CachedToken {
    pub fn id(&self) -> &str {
        &self.token.id
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.token.id.is_empty() || now >= self.expires_at
    }
}
