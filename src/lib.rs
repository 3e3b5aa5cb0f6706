//! Session and bulk-operation engine for OpenStack-style clouds.
//!
//! [`api`] issues and caches identity tokens, resolves service endpoints and
//! sends authenticated requests. [`tasks`] runs bulk operations on a bounded
//! worker pool and polls resources until they converge.

pub mod api;
pub mod tasks;
