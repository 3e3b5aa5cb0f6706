//! Fake identity service shared by the integration tests

#![allow(dead_code)]

use serde_json::{Value, json};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use skyman::api::{Credential, Session, SessionOptions};

pub const TOKEN_ID: &str = "gAAAAAB-test-token";

pub fn token_body(base: &str) -> Value {
    json!({
        "token": {
            "methods": ["password"],
            "user": {"id": "u-1", "name": "admin", "domain": {"id": "default", "name": "Default"}},
            "project": {"id": "p-1", "name": "admin", "domain": {"id": "default", "name": "Default"}},
            "roles": [{"id": "r-1", "name": "admin"}, {"id": "r-2", "name": "member"}],
            "issued_at": "2024-01-01T00:00:00.000000Z",
            "expires_at": "2099-01-01T00:00:00.000000Z",
            "catalog": [
                {
                    "type": "identity",
                    "name": "keystone",
                    "endpoints": [
                        {"id": "e-1", "interface": "public", "region": "RegionOne", "region_id": "RegionOne", "url": format!("{}/v3", base)}
                    ]
                },
                {
                    "type": "compute",
                    "name": "nova",
                    "endpoints": [
                        {"id": "e-2", "interface": "public", "region": "RegionOne", "region_id": "RegionOne", "url": format!("{}/compute/v2.1/", base)},
                        {"id": "e-3", "interface": "internal", "region": "RegionOne", "region_id": "RegionOne", "url": "http://internal:8774/v2.1"},
                        {"id": "e-4", "interface": "public", "region": "RegionTwo", "region_id": "RegionTwo", "url": "http://region-two:8774/v2.1"}
                    ]
                }
            ]
        }
    })
}

/// Successful identity response for `server`
pub fn token_response(server: &MockServer) -> ResponseTemplate {
    ResponseTemplate::new(201)
        .insert_header("X-Subject-Token", TOKEN_ID)
        .set_body_json(token_body(&server.uri()))
}

/// Mount the identity endpoint, expecting exactly `calls` requests
pub async fn mount_identity(server: &MockServer, calls: u64) {
    Mock::given(method("POST"))
        .and(path("/v3/auth/tokens"))
        .respond_with(token_response(server))
        .expect(calls)
        .mount(server)
        .await;
}

pub fn credential(server: &MockServer) -> Credential {
    Credential::new(format!("{}/v3", server.uri()), "admin", "secret", "admin")
}

pub fn options() -> SessionOptions {
    SessionOptions::builder()
        .timeout(Duration::from_secs(5))
        .build()
}

pub fn session(server: &MockServer) -> Session {
    Session::new(credential(server), options()).expect("session")
}
