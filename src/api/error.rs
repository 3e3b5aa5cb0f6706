//! Typed errors for the session, catalog and request pipeline

use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Non-2xx response from a control plane endpoint
#[derive(Debug, Clone, Error)]
#[error("{status} {reason}: {body}")]
pub struct HttpError {
    pub status: u16,
    pub reason: String,
    pub body: String,
}

impl HttpError {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            body: body.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status == StatusCode::NOT_FOUND.as_u16()
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// Identity endpoint unreachable or credentials rejected
    #[error("authentication failed: {reason}")]
    Authentication { status: Option<u16>, reason: String },

    #[error("endpoint {service_type}:{service_name}:{interface} for region '{region}' not found")]
    EndpointNotFound {
        service_type: String,
        service_name: String,
        interface: String,
        region: String,
    },

    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("request failed: {0}")]
    Http(HttpError),

    #[error("resource not found: {0}")]
    NotFound(HttpError),

    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Map a reqwest failure, keeping timeouts apart from other transport errors
    pub fn from_reqwest(error: reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            Error::Timeout(timeout)
        } else if error.is_builder() {
            Error::InvalidUrl {
                url: error.url().map(|u| u.to_string()).unwrap_or_default(),
                reason: error.to_string(),
            }
        } else {
            Error::Transport(error)
        }
    }

    /// Classify a non-2xx status; 404 gets its own variant
    pub fn from_status(status: StatusCode, body: impl Into<String>) -> Self {
        let http = HttpError::new(status, body);
        if http.is_not_found() {
            Error::NotFound(http)
        } else {
            Error::Http(http)
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Timeout(_))
    }

    pub fn is_authentication(&self) -> bool {
        matches!(self, Error::Authentication { .. })
    }

    /// HTTP status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Http(http) | Error::NotFound(http) => Some(http.status),
            Error::Authentication { status, .. } => *status,
            _ => None,
        }
    }
}
