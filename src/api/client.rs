use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::constants::{self, headers, interfaces};
use super::error::{Error, Result};
use super::session::Session;

/// An outbound request to a control plane endpoint, before authentication
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    url: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn patch(url: impl Into<String>) -> Self {
        Self::new(Method::PATCH, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn header_map(&self) -> Result<HeaderMap> {
        let mut map = HeaderMap::new();
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::Config(format!("invalid header name '{}': {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::Config(format!("invalid value for header '{}': {}", name, e)))?;
            map.insert(name, value);
        }
        if self.body.is_some() && !map.contains_key(CONTENT_TYPE) {
            map.insert(CONTENT_TYPE, HeaderValue::from_static(headers::CONTENT_TYPE_JSON));
        }
        Ok(map)
    }
}

/// A successful (status < 400) response
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub reason: String,
    pub headers: HeaderMap,
    pub body: String,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    pub fn text(&self) -> &str {
        &self.body
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn is_empty(&self) -> bool {
        self.body.trim().is_empty()
    }
}

impl Session {
    /// Send an authenticated request.
    ///
    /// The token header is stamped on every attempt, so a retry after a
    /// refresh carries the new token. Statuses >= 400 become errors, with 404
    /// reported as [`Error::NotFound`].
    pub async fn request(&self, request: ApiRequest) -> Result<ApiResponse> {
        let base_headers = request.header_map()?;
        self.retry_policy
            .execute(|| self.send_once(&request, &base_headers))
            .await
    }

    pub async fn get(&self, url: impl Into<String>) -> Result<ApiResponse> {
        self.request(ApiRequest::get(url)).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: impl Into<String>) -> Result<T> {
        self.get(url).await?.json()
    }

    pub async fn delete(&self, url: impl Into<String>) -> Result<ApiResponse> {
        self.request(ApiRequest::delete(url)).await
    }

    /// Absolute URL for `path` under the public endpoint of `service_type`
    pub async fn service_url(&self, service_type: &str, path: &str) -> Result<String> {
        self.service_url_for(service_type, interfaces::PUBLIC, path).await
    }

    pub async fn service_url_for(&self, service_type: &str, interface: &str, path: &str) -> Result<String> {
        let base = self.endpoint(service_type, "", interface).await?;
        Ok(constants::join_url(&base, path))
    }

    async fn send_once(&self, request: &ApiRequest, base_headers: &HeaderMap) -> Result<ApiResponse> {
        let stamped = self.token().await?;
        let timeout = self.options.timeout;

        let mut request_headers = base_headers.clone();
        let mut token_value = HeaderValue::from_str(stamped.id())
            .map_err(|e| Error::Config(format!("token id is not a valid header value: {}", e)))?;
        token_value.set_sensitive(true);
        request_headers.insert(headers::X_AUTH_TOKEN, token_value);

        let context = self
            .logger
            .start_request(request.method.as_str(), &request.url, &request_headers);
        if !context.correlation_id.is_empty() {
            if let Ok(value) = HeaderValue::from_str(&context.correlation_id) {
                request_headers.insert(headers::X_CORRELATION_ID, value);
            }
        }

        let mut builder = self
            .http
            .request(request.method.clone(), &request.url)
            .headers(request_headers)
            .timeout(timeout);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            self.logger.log_failure(&context, &e);
            Error::from_reqwest(e, timeout)
        })?;

        let status = response.status();
        let response_headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|e| Error::from_reqwest(e, timeout))?;
        self.logger
            .log_response(&context, status.as_u16(), &response_headers, &body);

        if status.as_u16() >= 400 {
            if status == StatusCode::UNAUTHORIZED {
                self.invalidate_if_current(&stamped);
            }
            return Err(Error::from_status(status, body));
        }

        Ok(ApiResponse {
            status,
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            headers: response_headers,
            body,
        })
    }
}
