//! Token lifecycle, catalog resolution and request classification against a fake cloud

mod common;

use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{TOKEN_ID, credential, mount_identity, session, token_response};
use skyman::api::constants::{interfaces, service_types};
use skyman::api::{ApiRequest, Error, Session, SessionOptions};

#[tokio::test]
async fn test_concurrent_callers_share_one_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/auth/tokens"))
        .respond_with(token_response(&server).set_delay(Duration::from_millis(200)))
        .expect(1)
        .mount(&server)
        .await;

    let session = Arc::new(session(&server));
    let handles: Vec<_> = (0..16)
        .map(|_| {
            let session = session.clone();
            tokio::spawn(async move { session.token_id().await })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), TOKEN_ID);
    }
    assert!(session.cached_token().is_some());
}

#[tokio::test]
async fn test_cached_token_reused_until_invalidated() {
    let server = MockServer::start().await;
    mount_identity(&server, 2).await;

    let session = session(&server);
    let first = session.token().await.unwrap();
    let second = session.token().await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    session.invalidate_token();
    assert!(session.cached_token().is_none());
    let third = session.token().await.unwrap();
    assert!(!Arc::ptr_eq(&first, &third));
}

#[tokio::test]
async fn test_password_request_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/auth/tokens"))
        .and(body_partial_json(json!({
            "auth": {
                "identity": {
                    "methods": ["password"],
                    "password": {"user": {"name": "admin", "password": "secret", "domain": {"name": "Default"}}}
                },
                "scope": {"project": {"name": "admin", "domain": {"name": "Default"}}}
            }
        })))
        .respond_with(token_response(&server))
        .expect(1)
        .mount(&server)
        .await;

    session(&server).issue_token().await.unwrap();
}

#[tokio::test]
async fn test_token_details() {
    let server = MockServer::start().await;
    mount_identity(&server, 1).await;

    let session = session(&server);
    assert_eq!(session.project_id().await.unwrap(), "p-1");
    assert_eq!(session.user_id().await.unwrap(), "u-1");
    assert!(session.is_admin().await.unwrap());

    let cached = session.cached_token().unwrap();
    assert_eq!(cached.id(), TOKEN_ID);
    assert!(!cached.is_expired());
}

#[tokio::test]
async fn test_rejected_credentials_are_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/auth/tokens"))
        .respond_with(ResponseTemplate::new(401).set_body_string("{\"error\": {\"code\": 401}}"))
        .expect(2)
        .mount(&server)
        .await;

    let session = session(&server);

    let err = session.issue_token().await.unwrap_err();
    assert!(err.is_authentication(), "unexpected error: {err:?}");
    assert_eq!(err.status(), Some(401));

    let err = session.token_id().await.unwrap_err();
    assert!(err.is_authentication());
    assert!(session.cached_token().is_none());
}

#[tokio::test]
async fn test_missing_subject_token_header_is_authentication_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/auth/tokens"))
        .respond_with(ResponseTemplate::new(201).set_body_json(common::token_body(&server.uri())))
        .mount(&server)
        .await;

    let err = session(&server).token_id().await.unwrap_err();
    assert!(matches!(err, Error::Authentication { .. }), "unexpected error: {err:?}");
}

#[tokio::test]
async fn test_zero_local_expiry_reauthenticates_every_call() {
    let server = MockServer::start().await;
    mount_identity(&server, 2).await;

    let options = SessionOptions::builder()
        .local_token_expiry(Duration::ZERO)
        .build();
    let session = Session::new(credential(&server), options).unwrap();

    session.token_id().await.unwrap();
    session.token_id().await.unwrap();
}

#[tokio::test]
async fn test_endpoint_resolution() {
    let server = MockServer::start().await;
    mount_identity(&server, 1).await;
    let session = session(&server);

    let public = session
        .endpoint(service_types::COMPUTE, "", interfaces::PUBLIC)
        .await
        .unwrap();
    assert_eq!(public, format!("{}/compute/v2.1", server.uri()));

    let internal = session
        .resolve_endpoint(service_types::COMPUTE, "nova", interfaces::INTERNAL, "RegionOne")
        .await
        .unwrap();
    assert_eq!(internal, "http://internal:8774/v2.1");

    let other_region = session
        .resolve_endpoint(service_types::COMPUTE, "", interfaces::PUBLIC, "RegionTwo")
        .await
        .unwrap();
    assert_eq!(other_region, "http://region-two:8774/v2.1");

    assert_eq!(
        session.service_endpoints(service_types::COMPUTE, "").await.unwrap().len(),
        3
    );
}

#[tokio::test]
async fn test_unknown_service_is_endpoint_not_found() {
    let server = MockServer::start().await;
    mount_identity(&server, 1).await;
    let session = session(&server);

    let err = session
        .endpoint(service_types::VOLUME_V3, "", interfaces::PUBLIC)
        .await
        .unwrap_err();
    match err {
        Error::EndpointNotFound { service_type, region, .. } => {
            assert_eq!(service_type, "volumev3");
            assert_eq!(region, "RegionOne");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let err = session
        .resolve_endpoint(service_types::COMPUTE, "", interfaces::ADMIN, "RegionOne")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::EndpointNotFound { .. }));
}

#[tokio::test]
async fn test_request_carries_token_header() {
    let server = MockServer::start().await;
    mount_identity(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/compute/v2.1/servers/s-1"))
        .and(header("X-Auth-Token", TOKEN_ID))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"server": {"id": "s-1", "status": "ACTIVE"}})))
        .expect(1)
        .mount(&server)
        .await;

    let session = session(&server);
    let url = session.service_url(service_types::COMPUTE, "/servers/s-1").await.unwrap();
    assert_eq!(url, format!("{}/compute/v2.1/servers/s-1", server.uri()));

    let body: Value = session.get_json(url).await.unwrap();
    assert_eq!(body["server"]["status"], "ACTIVE");
}

#[tokio::test]
async fn test_post_sends_json_body() {
    let server = MockServer::start().await;
    mount_identity(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/compute/v2.1/servers/s-1/action"))
        .and(header("Content-Type", "application/json"))
        .and(body_partial_json(json!({"os-stop": null})))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let session = session(&server);
    let url = session.service_url(service_types::COMPUTE, "servers/s-1/action").await.unwrap();
    let response = session
        .request(ApiRequest::post(url).json(json!({"os-stop": null})))
        .await
        .unwrap();
    assert_eq!(response.status.as_u16(), 202);
    assert!(response.is_empty());
}

#[tokio::test]
async fn test_error_statuses_are_classified() {
    let server = MockServer::start().await;
    mount_identity(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/compute/v2.1/servers/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("{\"itemNotFound\": {}}"))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/compute/v2.1/servers/locked"))
        .respond_with(ResponseTemplate::new(409).set_body_string("server is locked"))
        .mount(&server)
        .await;

    let session = session(&server);
    let base = format!("{}/compute/v2.1", server.uri());

    let err = session.get(format!("{}/servers/missing", base)).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.status(), Some(404));

    let err = session.delete(format!("{}/servers/locked", base)).await.unwrap_err();
    assert!(!err.is_not_found());
    match err {
        Error::Http(http) => {
            assert_eq!(http.status, 409);
            assert_eq!(http.reason, "Conflict");
            assert_eq!(http.body, "server is locked");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    // a failed request does not drop the token
    assert!(session.cached_token().is_some());
}

#[tokio::test]
async fn test_slow_response_is_timeout() {
    let server = MockServer::start().await;
    mount_identity(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/compute/v2.1/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let options = SessionOptions::builder()
        .timeout(Duration::from_millis(300))
        .build();
    let session = Session::new(credential(&server), options).unwrap();

    let err = session
        .get(format!("{}/compute/v2.1/slow", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout(_)), "unexpected error: {err:?}");
    assert!(err.is_transport());
    assert!(!matches!(err, Error::Http(_) | Error::NotFound(_)));
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn test_unauthorized_response_invalidates_token() {
    let server = MockServer::start().await;
    mount_identity(&server, 2).await;
    Mock::given(method("GET"))
        .and(path("/compute/v2.1/servers"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/compute/v2.1/servers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"servers": []})))
        .mount(&server)
        .await;

    let session = session(&server);
    let url = format!("{}/compute/v2.1/servers", server.uri());

    let err = session.get(url.as_str()).await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert!(session.cached_token().is_none());

    let body: Value = session.get_json(url.as_str()).await.unwrap();
    assert_eq!(body["servers"], json!([]));
}

#[tokio::test]
async fn test_unauthorized_stale_token_keeps_fresh_refresh() {
    let server = MockServer::start().await;
    mount_identity(&server, 2).await;
    Mock::given(method("GET"))
        .and(path("/compute/v2.1/servers"))
        .respond_with(ResponseTemplate::new(401).set_delay(Duration::from_millis(300)))
        .expect(1)
        .mount(&server)
        .await;

    let session = Arc::new(session(&server));
    let stale = session.token().await.unwrap();

    let url = format!("{}/compute/v2.1/servers", server.uri());
    let in_flight = {
        let session = session.clone();
        tokio::spawn(async move { session.get(url).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    let fresh = session.issue_token().await.unwrap();
    assert!(!Arc::ptr_eq(&stale, &fresh));

    let err = in_flight.await.unwrap().unwrap_err();
    assert_eq!(err.status(), Some(401));

    let cached = session.cached_token().unwrap();
    assert!(Arc::ptr_eq(&cached, &fresh));
    let reused = session.token().await.unwrap();
    assert!(Arc::ptr_eq(&reused, &fresh));
}

#[tokio::test]
async fn test_transient_failures_retried_when_configured() {
    let server = MockServer::start().await;
    mount_identity(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/compute/v2.1/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/compute/v2.1/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let options = SessionOptions::builder()
        .retries(2, Duration::from_millis(10))
        .build();
    let session = Session::new(credential(&server), options).unwrap();

    let response = session
        .get(format!("{}/compute/v2.1/flaky", server.uri()))
        .await
        .unwrap();
    assert_eq!(response.text(), "ok");
}

#[tokio::test]
async fn test_no_retry_by_default() {
    let server = MockServer::start().await;
    mount_identity(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/compute/v2.1/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let err = session(&server)
        .get(format!("{}/compute/v2.1/flaky", server.uri()))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(503));
}
