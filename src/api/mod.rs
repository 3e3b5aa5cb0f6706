//! Client session for an OpenStack-style control plane
//!
//! Issues and caches the bearer token, resolves service endpoints from the
//! token's catalog, and sends authenticated requests with typed error
//! classification.

mod auth;
pub mod catalog;
pub mod client;
pub mod constants;
pub mod error;
pub mod models;
pub mod resilience;
pub mod session;

pub use client::{ApiRequest, ApiResponse};
pub use error::{Error, HttpError, Result};
pub use models::{CachedToken, CatalogEntry, Credential, Domain, Endpoint, Project, Role, Token, User};
pub use resilience::{MonitoringConfig, RetryConfig, RetryPolicy, RetryableError, SessionOptions, SessionOptionsBuilder};
pub use session::Session;
