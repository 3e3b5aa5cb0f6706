//! Transport hardening for session requests
//!
//! Provides retry policies, session configuration and redacting
//! request logs.

pub mod config;
pub mod logging;
pub mod retry;

pub use config::{MonitoringConfig, SessionOptions, SessionOptionsBuilder};
pub use logging::{RequestContext, RequestLogger, sanitize_headers};
pub use retry::{RetryConfig, RetryPolicy, RetryableError};
