//! Endpoint lookup in a token's service catalog.
//!
//! Lookups are pure functions of the catalog slice they are given, so a
//! refreshed token is always resolved against its own catalog.

use super::error::{Error, Result};
use super::models::{CatalogEntry, Endpoint};

fn entry_matches(entry: &CatalogEntry, service_type: &str, service_name: &str) -> bool {
    entry.service_type == service_type && (service_name.is_empty() || entry.name == service_name)
}

/// Resolve the base URL for a service, without a trailing `/`.
///
/// An empty `service_name` matches any name. Entries are scanned in catalog
/// order and the first endpoint with the requested interface and region wins.
pub fn resolve_endpoint(
    catalog: &[CatalogEntry],
    service_type: &str,
    service_name: &str,
    interface: &str,
    region: &str,
) -> Result<String> {
    catalog
        .iter()
        .filter(|entry| entry_matches(entry, service_type, service_name))
        .flat_map(|entry| entry.endpoints.iter())
        .find(|endpoint| endpoint.interface == interface && endpoint.in_region(region))
        .map(|endpoint| endpoint.url.trim_end_matches('/').to_string())
        .ok_or_else(|| Error::EndpointNotFound {
            service_type: service_type.to_string(),
            service_name: service_name.to_string(),
            interface: interface.to_string(),
            region: region.to_string(),
        })
}

/// All endpoints of the first entry matching type and name
pub fn service_endpoints<'a>(
    catalog: &'a [CatalogEntry],
    service_type: &str,
    service_name: &str,
) -> &'a [Endpoint] {
    catalog
        .iter()
        .find(|entry| entry_matches(entry, service_type, service_name))
        .map(|entry| entry.endpoints.as_slice())
        .unwrap_or(&[])
}
