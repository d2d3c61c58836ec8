//! `reqwest`-backed transport.
//!
//! Two flavours share one implementation:
//! - server-direct: no cookie jar; credentials travel in an explicit `Cookie`
//!   header copied from the inbound browser request.
//! - client-proxied: a persistent cookie jar, so cookies set by the refresh
//!   endpoint are sent on every later call (the browser's `credentials: include`).

use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, SET_COOKIE};

use super::{ApiRequest, ApiResponse, Transport};
use crate::config::HttpTimeouts;
use crate::error::{ApiError, parse_body};

pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Transport without a cookie jar, for direct server-side calls.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Request`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeouts: HttpTimeouts) -> Result<Self, ApiError> {
        Self::build(base_url, timeouts, false)
    }

    /// Transport with a persistent cookie jar, for the client runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Request`] if the HTTP client cannot be built.
    pub fn with_cookie_store(base_url: &str, timeouts: HttpTimeouts) -> Result<Self, ApiError> {
        Self::build(base_url, timeouts, true)
    }

    fn build(base_url: &str, timeouts: HttpTimeouts, cookie_store: bool) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .cookie_store(cookie_store)
            .build()
            .map_err(|e| ApiError::Request(format!("failed to build http client: {e}")))?;
        Ok(Self { http, base_url: base_url.trim().trim_end_matches('/').to_owned() })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Underlying client, shared with the front server's `/api` proxy.
    #[must_use]
    pub fn client(&self) -> &reqwest::Client {
        &self.http
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let url = build_url(&self.base_url, &request.endpoint);
        let mut builder = self.http.request(request.method.clone(), &url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if !request.has_header(CONTENT_TYPE.as_str()) {
            builder = builder.header(CONTENT_TYPE, "application/json");
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.to_string());
        }

        let response = builder.send().await.map_err(map_request_error)?;
        let status = response.status().as_u16();
        let set_cookies = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(str::to_owned)
            .collect();
        let text = response.text().await.map_err(map_request_error)?;

        if !(200..300).contains(&status) {
            tracing::debug!(%status, endpoint = %request.endpoint, method = %request.method, "request failed");
            return Err(ApiError::from_response(status, &text));
        }

        Ok(ApiResponse { status, body: parse_body(&text), set_cookies })
    }
}

/// Join a base URL and an endpoint path with exactly one slash.
pub(crate) fn build_url(base_url: &str, endpoint: &str) -> String {
    let base = base_url.trim().trim_end_matches('/');
    let path = endpoint.trim();

    if base.is_empty() {
        path.to_owned()
    } else {
        format!("{base}/{}", path.trim_start_matches('/'))
    }
}

fn map_request_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout(err.to_string())
    } else if err.is_builder() {
        ApiError::Request(err.to_string())
    } else {
        ApiError::Network(err.to_string())
    }
}

#[cfg(test)]
#[path = "http_test.rs"]
mod tests;
