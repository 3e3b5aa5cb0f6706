//! Session transport configuration with builder pattern
//!
//! Groups timeouts, token lifetime, retry policy and request logging
//! for a [`Session`](crate::api::Session) with sane defaults.

use super::retry::RetryConfig;
use crate::api::constants::{self, DEFAULT_LOCAL_TOKEN_EXPIRY_SECS};
use std::time::Duration;

/// Transport and token configuration for a session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Upper bound for a whole request, identity calls included
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// How long an issued token is trusted before re-authenticating
    pub local_token_expiry: Duration,
    /// Never trust a token past the server-declared `expires_at`
    pub clamp_to_server_expiry: bool,
    pub user_agent: String,
    pub retry: RetryConfig,
    pub monitoring: MonitoringConfig,
}

/// Request diagnostics configuration
#[derive(Debug, Clone)]
pub struct MonitoringConfig {
    pub request_logging: bool,
    pub correlation_ids: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            local_token_expiry: Duration::from_secs(DEFAULT_LOCAL_TOKEN_EXPIRY_SECS),
            clamp_to_server_expiry: true,
            user_agent: constants::user_agent(),
            retry: RetryConfig::default(),
            monitoring: MonitoringConfig::default(),
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            request_logging: true,
            correlation_ids: true,
        }
    }
}

impl SessionOptions {
    pub fn builder() -> SessionOptionsBuilder {
        SessionOptionsBuilder::new()
    }
}

/// Builder for SessionOptions
#[derive(Debug)]
pub struct SessionOptionsBuilder {
    options: SessionOptions,
}

impl SessionOptionsBuilder {
    pub fn new() -> Self {
        Self {
            options: SessionOptions::default(),
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.options.connect_timeout = timeout;
        self
    }

    pub fn local_token_expiry(mut self, expiry: Duration) -> Self {
        self.options.local_token_expiry = expiry;
        self
    }

    pub fn clamp_to_server_expiry(mut self, enabled: bool) -> Self {
        self.options.clamp_to_server_expiry = enabled;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.options.user_agent = user_agent.into();
        self
    }

    pub fn retry_config(mut self, retry: RetryConfig) -> Self {
        self.options.retry = retry;
        self
    }

    /// Retry transient failures `retries` times, waiting `wait` before the first retry
    pub fn retries(mut self, retries: u32, wait: Duration) -> Self {
        self.options.retry = RetryConfig::with_retries(retries, wait);
        self
    }

    pub fn request_logging(mut self, enabled: bool) -> Self {
        self.options.monitoring.request_logging = enabled;
        self
    }

    pub fn correlation_ids(mut self, enabled: bool) -> Self {
        self.options.monitoring.correlation_ids = enabled;
        self
    }

    pub fn build(self) -> SessionOptions {
        self.options
    }
}

impl Default for SessionOptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = SessionOptions::default();

        assert_eq!(options.timeout, Duration::from_secs(60));
        assert_eq!(options.local_token_expiry, Duration::from_secs(1800));
        assert!(options.clamp_to_server_expiry);
        assert_eq!(options.retry.max_attempts, 1);
        assert!(options.monitoring.request_logging);
        assert!(options.user_agent.starts_with("skyman/"));
    }

    #[test]
    fn test_builder_pattern() {
        let options = SessionOptions::builder()
            .timeout(Duration::from_secs(5))
            .local_token_expiry(Duration::from_secs(60))
            .clamp_to_server_expiry(false)
            .retries(2, Duration::from_secs(1))
            .request_logging(false)
            .build();

        assert_eq!(options.timeout, Duration::from_secs(5));
        assert_eq!(options.local_token_expiry, Duration::from_secs(60));
        assert!(!options.clamp_to_server_expiry);
        assert_eq!(options.retry.max_attempts, 3);
        assert_eq!(options.retry.base_delay, Duration::from_secs(1));
        assert!(!options.monitoring.request_logging);
    }
}
