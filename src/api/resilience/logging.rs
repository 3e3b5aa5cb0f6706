//! Structured request logging with correlation tracking
//!
//! Every request and response produces one JSON log line. Credential
//! headers are replaced with a fixed marker before anything is logged.

use super::config::MonitoringConfig;
use crate::api::constants::headers::{REDACTED, SENSITIVE};
use log::{debug, trace, warn};
use reqwest::header::HeaderMap;
use serde_json::json;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Longest response body echoed at trace level
const MAX_LOGGED_BODY: usize = 2048;

/// Structured logger for outbound requests
#[derive(Debug, Clone)]
pub struct RequestLogger {
    config: MonitoringConfig,
}

/// Context for one request, carried from send to completion
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub correlation_id: String,
    pub method: String,
    pub url: String,
    pub start_time: Instant,
}

impl RequestContext {
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

impl RequestLogger {
    pub fn new(config: MonitoringConfig) -> Self {
        Self { config }
    }

    /// Start tracking a request, logging its sanitized headers
    pub fn start_request(&self, method: &str, url: &str, headers: &HeaderMap) -> RequestContext {
        let correlation_id = if self.config.correlation_ids {
            uuid::Uuid::new_v4().to_string()
        } else {
            String::new()
        };

        let context = RequestContext {
            correlation_id,
            method: method.to_string(),
            url: url.to_string(),
            start_time: Instant::now(),
        };

        if self.config.request_logging {
            let log_data = json!({
                "event": "http_request",
                "correlation_id": context.correlation_id,
                "method": context.method,
                "url": context.url,
                "headers": sanitize_headers(headers),
                "timestamp": chrono::Utc::now().to_rfc3339()
            });
            debug!("Req: {}", log_data);
        }

        context
    }

    pub fn log_response(&self, context: &RequestContext, status: u16, headers: &HeaderMap, body: &str) {
        if !self.config.request_logging {
            return;
        }

        let log_data = json!({
            "event": "http_response",
            "correlation_id": context.correlation_id,
            "method": context.method,
            "url": context.url,
            "status_code": status,
            "duration_ms": context.elapsed().as_millis(),
            "headers": sanitize_headers(headers),
            "timestamp": chrono::Utc::now().to_rfc3339()
        });

        if status >= 400 && status != 404 {
            warn!("Resp (Error): {}", log_data);
        } else {
            debug!("Resp: {}", log_data);
        }
        trace!("Resp body [{}]: {}", context.correlation_id, truncate(body, MAX_LOGGED_BODY));
    }

    pub fn log_failure(&self, context: &RequestContext, error: &dyn std::fmt::Display) {
        if !self.config.request_logging {
            return;
        }

        let log_data = json!({
            "event": "http_failure",
            "correlation_id": context.correlation_id,
            "method": context.method,
            "url": context.url,
            "duration_ms": context.elapsed().as_millis(),
            "error": error.to_string(),
            "timestamp": chrono::Utc::now().to_rfc3339()
        });

        warn!("Req failed: {}", log_data);
    }
}

/// Copy headers into a printable map, masking credential values
pub fn sanitize_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut sanitized = BTreeMap::new();

    for (name, value) in headers {
        let is_sensitive = SENSITIVE.iter().any(|s| name.as_str().eq_ignore_ascii_case(s));
        let value = if is_sensitive {
            REDACTED.to_string()
        } else {
            value.to_str().unwrap_or("<binary>").to_string()
        };
        sanitized.insert(name.to_string(), value);
    }

    sanitized
}

fn truncate(body: &str, max: usize) -> &str {
    if body.len() <= max {
        return body;
    }
    let mut end = max;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
