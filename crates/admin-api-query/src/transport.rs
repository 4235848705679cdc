//! The HTTP seam between backends and the network.
//!
//! Backends build an [`HttpRequest`] and hand it to a [`Transport`]. The
//! production transport is [`HttpTransport`] (reqwest); tests swap in a
//! recording mock so no socket is ever opened.

use std::fmt;
use std::time::Duration;

use admin_api_core::{ApiError, ApiResult, ApiSettings};
use async_trait::async_trait;
use http::Method;
use serde_json::Value;

/// A request as seen by a [`Transport`].
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// The HTTP method.
    pub method: Method,
    /// The endpoint URL, without query parameters.
    pub url: String,
    /// Query parameters in send order. Keys may repeat.
    pub params: Vec<(String, String)>,
    /// The JSON body, if any.
    pub body: Option<Value>,
}

impl HttpRequest {
    /// Creates a request with no parameters and no body.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            params: Vec::new(),
            body: None,
        }
    }

    /// Sets the query parameters.
    #[must_use]
    pub fn with_params(mut self, params: Vec<(String, String)>) -> Self {
        self.params = params;
        self
    }

    /// Sets the JSON body.
    #[must_use]
    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Returns the values of every parameter named `key`, in order.
    pub fn param_values(&self, key: &str) -> Vec<&str> {
        self.params
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// The URL with the query string appended, percent-encoded.
    ///
    /// Falls back to the bare URL if it cannot be parsed.
    pub fn full_url(&self) -> String {
        if self.params.is_empty() {
            return self.url.clone();
        }
        url::Url::parse_with_params(&self.url, &self.params)
            .map_or_else(|_| self.url.clone(), String::from)
    }
}

/// A response as seen by a backend: a status code and a decoded JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// The HTTP status code.
    pub status: u16,
    /// The decoded body. Non-JSON error bodies arrive as a JSON string.
    pub body: Value,
}

impl HttpResponse {
    /// Creates a response.
    pub const fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// Creates a `200 OK` response.
    pub const fn ok(body: Value) -> Self {
        Self::new(200, body)
    }

    /// Returns `true` for a 2xx status.
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Returns the body of a 2xx response, or a [`ApiError::Transport`] error.
    pub fn into_result(self) -> ApiResult<Value> {
        if self.is_success() {
            Ok(self.body)
        } else {
            Err(ApiError::Transport {
                status: self.status,
                body: self.body,
            })
        }
    }
}

/// Sends one HTTP request and returns the response.
///
/// Implementations return `Ok` for any response that arrived, whatever its
/// status; only failures to complete the exchange are errors.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Sends `request`.
    async fn send(&self, request: HttpRequest) -> ApiResult<HttpResponse>;
}

/// A [`Transport`] backed by a [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport with a 30 second timeout.
    pub fn new() -> ApiResult<Self> {
        Self::from_settings(&ApiSettings::default())
    }

    /// Creates a transport using the timeout and user agent from `settings`.
    pub fn from_settings(settings: &ApiSettings) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| {
                ApiError::ConfigurationError(format!("Failed to create HTTP client: {e}"))
            })?;
        Ok(Self { client })
    }

    /// Wraps an existing client.
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: HttpRequest) -> ApiResult<HttpResponse> {
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .query(&request.params);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::ConnectionError(format!("{}: {e}", request.url)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::ConnectionError(format!("{}: {e}", request.url)))?;

        let body = decode_body(&text, status.is_success())?;
        Ok(HttpResponse::new(status.as_u16(), body))
    }
}

/// Decodes a response body. Success bodies must be JSON; error bodies that
/// are not JSON are kept verbatim as a string.
fn decode_body(text: &str, success: bool) -> ApiResult<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    match serde_json::from_str(text) {
        Ok(value) => Ok(value),
        Err(_) if !success => Ok(Value::String(text.to_string())),
        Err(e) => Err(ApiError::InvalidResponse(format!(
            "response body is not JSON: {e}"
        ))),
    }
}
