//! Transport seam between the session core and the HTTP stack.
//!
//! DESIGN
//! ======
//! The gateway, refresh coordinator, and hydration pass only see the
//! [`Transport`] trait. [`http::HttpTransport`] is the `reqwest`
//! implementation used at runtime; tests substitute scripted transports.
//! Non-success statuses come back as [`ApiError::Http`] so every caller treats
//! "the server said no" and "the server was unreachable" through one `Result`.

pub mod http;

use axum::http::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;

/// Identity endpoint: resolves the current user from credential cookies.
pub const IDENTITY_ENDPOINT: &str = "/users/me";
/// Refresh endpoint: exchanges the refresh credential for new cookies.
pub const REFRESH_ENDPOINT: &str = "/auth/refresh";

// =============================================================================
// REQUEST / RESPONSE
// =============================================================================

/// One outbound call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub endpoint: String,
    pub method: Method,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Header overrides. Later entries win over transport defaults.
    pub headers: Vec<(String, String)>,
    /// Set before an automatic retry; a request carrying it is never retried again.
    pub is_retry: bool,
}

impl ApiRequest {
    #[must_use]
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method,
            query: Vec::new(),
            body: None,
            headers: Vec::new(),
            is_retry: false,
        }
    }

    #[must_use]
    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::GET, endpoint)
    }

    #[must_use]
    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(Method::POST, endpoint)
    }

    #[must_use]
    pub fn with_query(mut self, query: &[(&str, &str)]) -> Self {
        self.query
            .extend(query.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    #[must_use]
    pub fn with_headers(mut self, headers: &[(&str, &str)]) -> Self {
        for (name, value) in headers {
            self = self.with_header(name, value);
        }
        self
    }

    /// True when the caller supplied a header with this name (case-insensitive).
    #[must_use]
    pub fn has_header(&self, name: &str) -> bool {
        self.headers.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    /// Mark this request as the single automatic retry.
    #[must_use]
    pub fn into_retry(mut self) -> Self {
        self.is_retry = true;
        self
    }
}

/// A successful response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
    /// Raw `Set-Cookie` header values, in response order.
    pub set_cookies: Vec<String>,
}

impl ApiResponse {
    #[must_use]
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body, set_cookies: Vec::new() }
    }

    /// Decode the body into a typed value.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Decode`] if the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        T::deserialize(&self.body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

// =============================================================================
// TRANSPORT
// =============================================================================

/// Sends [`ApiRequest`]s. Non-2xx responses are errors.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError>;
}
