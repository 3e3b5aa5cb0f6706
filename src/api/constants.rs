//! Constants for the identity API and the service catalog

/// Path appended to the auth URL to issue a token
pub const AUTH_TOKENS_PATH: &str = "/auth/tokens";

/// Region used when the credential does not name one
pub const DEFAULT_REGION: &str = "RegionOne";

/// Domain used when the credential does not name one
pub const DEFAULT_DOMAIN: &str = "Default";

/// Seconds a freshly issued token is considered valid locally
pub const DEFAULT_LOCAL_TOKEN_EXPIRY_SECS: u64 = 1800;

/// Service types found in the catalog
pub mod service_types {
    pub const COMPUTE: &str = "compute";
    pub const VOLUME: &str = "volume";
    pub const VOLUME_V2: &str = "volumev2";
    pub const VOLUME_V3: &str = "volumev3";
    pub const IDENTITY: &str = "identity";
    pub const IMAGE: &str = "image";
    pub const NETWORK: &str = "network";
}

/// Endpoint interface classes
pub mod interfaces {
    pub const PUBLIC: &str = "public";
    pub const INTERNAL: &str = "internal";
    pub const ADMIN: &str = "admin";
}

/// Standard headers used against the control plane
pub mod headers {
    /// Request header carrying the token id
    pub const X_AUTH_TOKEN: &str = "X-Auth-Token";

    /// Response header carrying a freshly issued token id
    pub const X_SUBJECT_TOKEN: &str = "X-Subject-Token";

    /// Correlation id attached to every outbound request
    pub const X_CORRELATION_ID: &str = "X-Correlation-Id";

    /// Content type for JSON requests
    pub const CONTENT_TYPE_JSON: &str = "application/json";

    /// Replacement text for credential headers in diagnostics
    pub const REDACTED: &str = "<TOKEN>";

    /// Header names whose values must never reach the logs
    pub const SENSITIVE: &[&str] = &[X_AUTH_TOKEN, X_SUBJECT_TOKEN, "Authorization"];
}

/// Default user agent, e.g. `skyman/0.1.0`
pub fn user_agent() -> String {
    format!("skyman/{}", env!("CARGO_PKG_VERSION"))
}

/// Build the identity token URL from an auth URL
pub fn auth_tokens_endpoint(auth_url: &str) -> String {
    format!("{}{}", auth_url.trim_end_matches('/'), AUTH_TOKENS_PATH)
}

/// Join a resolved service URL and a resource path with exactly one `/`
pub fn join_url(base: &str, path: &str) -> String {
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        return base.trim_end_matches('/').to_string();
    }
    format!("{}/{}", base.trim_end_matches('/'), path)
}
