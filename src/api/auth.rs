//! Password authentication against the identity v3 API

use log::{debug, info};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};

use super::constants::{self, headers};
use super::error::{Error, Result};
use super::models::{Credential, Token};
use super::resilience::{RequestLogger, SessionOptions};

#[derive(Debug, Serialize)]
struct AuthRequest<'a> {
    auth: Auth<'a>,
}

#[derive(Debug, Serialize)]
struct Auth<'a> {
    identity: Identity<'a>,
    scope: Scope<'a>,
}

#[derive(Debug, Serialize)]
struct Identity<'a> {
    methods: [&'a str; 1],
    password: PasswordMethod<'a>,
}

#[derive(Debug, Serialize)]
struct PasswordMethod<'a> {
    user: PasswordUser<'a>,
}

#[derive(Debug, Serialize)]
struct PasswordUser<'a> {
    name: &'a str,
    password: &'a str,
    domain: NamedDomain<'a>,
}

#[derive(Debug, Serialize)]
struct Scope<'a> {
    project: ScopedProject<'a>,
}

#[derive(Debug, Serialize)]
struct ScopedProject<'a> {
    name: &'a str,
    domain: NamedDomain<'a>,
}

#[derive(Debug, Serialize)]
struct NamedDomain<'a> {
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: Token,
}

impl<'a> AuthRequest<'a> {
    fn password(credential: &'a Credential) -> Self {
        Self {
            auth: Auth {
                identity: Identity {
                    methods: ["password"],
                    password: PasswordMethod {
                        user: PasswordUser {
                            name: &credential.username,
                            password: &credential.password,
                            domain: NamedDomain { name: &credential.user_domain_name },
                        },
                    },
                },
                scope: Scope {
                    project: ScopedProject {
                        name: &credential.project_name,
                        domain: NamedDomain { name: &credential.project_domain_name },
                    },
                },
            },
        }
    }
}

/// Issue a new project-scoped token with the password method.
///
/// Every failure, transport included, surfaces as [`Error::Authentication`].
/// The request body carries the password, so only headers are logged.
pub(crate) async fn issue_token(
    http: &reqwest::Client,
    credential: &Credential,
    options: &SessionOptions,
    logger: &RequestLogger,
) -> Result<Token> {
    if credential.auth_url.is_empty() {
        return Err(Error::Config("auth_url is missing".to_string()));
    }

    let url = constants::auth_tokens_endpoint(&credential.auth_url);
    info!("Issuing token for user {} (project {}) at {}", credential.username, credential.project_name, url);

    let mut request_headers = HeaderMap::new();
    request_headers.insert(CONTENT_TYPE, HeaderValue::from_static(headers::CONTENT_TYPE_JSON));
    if let Ok(agent) = HeaderValue::from_str(&options.user_agent) {
        request_headers.insert(USER_AGENT, agent);
    }

    let context = logger.start_request("POST", &url, &request_headers);
    let response = http
        .post(&url)
        .headers(request_headers)
        .timeout(options.timeout)
        .json(&AuthRequest::password(credential))
        .send()
        .await
        .map_err(|e| {
            logger.log_failure(&context, &e);
            let cause = Error::from_reqwest(e, options.timeout);
            Error::Authentication {
                status: None,
                reason: format!("identity endpoint unreachable: {}", cause),
            }
        })?;

    let status = response.status();
    let response_headers = response.headers().clone();
    let body = response.text().await.map_err(|e| Error::Authentication {
        status: Some(status.as_u16()),
        reason: format!("failed to read token response: {}", e),
    })?;
    logger.log_response(&context, status.as_u16(), &response_headers, "");

    if !status.is_success() {
        return Err(Error::Authentication {
            status: Some(status.as_u16()),
            reason: format!(
                "{} {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown"),
                body
            ),
        });
    }

    let token_id = response_headers
        .get(headers::X_SUBJECT_TOKEN)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::Authentication {
            status: Some(status.as_u16()),
            reason: format!("response has no {} header", headers::X_SUBJECT_TOKEN),
        })?
        .to_string();

    let parsed: AuthResponse = serde_json::from_str(&body).map_err(|e| Error::Authentication {
        status: Some(status.as_u16()),
        reason: format!("invalid token body: {}", e),
    })?;

    let mut token = parsed.token;
    token.id = token_id;
    debug!(
        "Token issued for user {} with {} catalog entries, server expiry {:?}",
        token.user.id,
        token.catalog.len(),
        token.expires_at
    );
    Ok(token)
}
