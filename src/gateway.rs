//! Authenticated fetch gateway.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every domain call (orders, claims, identity) goes through an
//! [`ApiGateway`]. The strategy is picked once per runtime context:
//!
//! - [`ServerGateway`] talks to the backend directly and forwards the inbound
//!   `Cookie` header. It never refreshes; failures propagate as-is.
//! - [`ClientGateway`] talks to the public, proxied base URL. On an expired
//!   access credential it drives the [`RefreshCoordinator`] and retries the
//!   call once; on an irrecoverable failure it moves the session store into
//!   the expired state.
//!
//! Both return the transport's own [`ApiError`]; the gateway adds side
//! effects, never new error kinds.

use std::sync::Arc;

use axum::http::Method;
use serde_json::Value;

use crate::error::{ApiError, ErrorClass, classify};
use crate::refresh::RefreshCoordinator;
use crate::session::SessionStore;
use crate::transport::{ApiRequest, ApiResponse, Transport};

/// Expired-session reason used when the failure carries no message.
pub const DEFAULT_EXPIRED_REASON: &str = "세션이 만료되었습니다.";

// =============================================================================
// TRAIT
// =============================================================================

#[async_trait::async_trait]
pub trait ApiGateway: Send + Sync {
    /// Perform one call. The only method implementations provide.
    async fn call(&self, request: ApiRequest) -> Result<ApiResponse, ApiError>;

    async fn get(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<ApiResponse, ApiError> {
        self.get_with_headers(endpoint, query, &[]).await
    }

    async fn get_with_headers(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> Result<ApiResponse, ApiError> {
        self.call(ApiRequest::get(endpoint).with_query(query).with_headers(headers)).await
    }

    async fn post(&self, endpoint: &str, body: Value) -> Result<ApiResponse, ApiError> {
        self.post_with_headers(endpoint, body, &[]).await
    }

    async fn post_with_headers(
        &self,
        endpoint: &str,
        body: Value,
        headers: &[(&str, &str)],
    ) -> Result<ApiResponse, ApiError> {
        self.call(with_body(Method::POST, endpoint, body).with_headers(headers)).await
    }

    async fn put(&self, endpoint: &str, body: Value) -> Result<ApiResponse, ApiError> {
        self.put_with_headers(endpoint, body, &[]).await
    }

    async fn put_with_headers(
        &self,
        endpoint: &str,
        body: Value,
        headers: &[(&str, &str)],
    ) -> Result<ApiResponse, ApiError> {
        self.call(with_body(Method::PUT, endpoint, body).with_headers(headers)).await
    }

    async fn patch(&self, endpoint: &str, body: Value) -> Result<ApiResponse, ApiError> {
        self.patch_with_headers(endpoint, body, &[]).await
    }

    async fn patch_with_headers(
        &self,
        endpoint: &str,
        body: Value,
        headers: &[(&str, &str)],
    ) -> Result<ApiResponse, ApiError> {
        self.call(with_body(Method::PATCH, endpoint, body).with_headers(headers)).await
    }

    async fn delete(&self, endpoint: &str) -> Result<ApiResponse, ApiError> {
        self.delete_with_headers(endpoint, &[]).await
    }

    async fn delete_with_headers(&self, endpoint: &str, headers: &[(&str, &str)]) -> Result<ApiResponse, ApiError> {
        self.call(ApiRequest::new(Method::DELETE, endpoint).with_headers(headers)).await
    }
}

/// A `Null` body sends no payload.
fn with_body(method: Method, endpoint: &str, body: Value) -> ApiRequest {
    let request = ApiRequest::new(method, endpoint);
    if body.is_null() { request } else { request.with_body(body) }
}

// =============================================================================
// SERVER
// =============================================================================

pub struct ServerGateway {
    transport: Arc<dyn Transport>,
    cookie_header: String,
}

impl ServerGateway {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, cookie_header: impl Into<String>) -> Self {
        Self { transport, cookie_header: cookie_header.into() }
    }
}

#[async_trait::async_trait]
impl ApiGateway for ServerGateway {
    async fn call(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let request = if self.cookie_header.is_empty() || request.has_header("cookie") {
            request
        } else {
            request.with_header("cookie", &self.cookie_header)
        };
        self.transport.send(&request).await
    }
}

// =============================================================================
// CLIENT
// =============================================================================

pub struct ClientGateway {
    transport: Arc<dyn Transport>,
    store: Arc<SessionStore>,
    coordinator: Arc<RefreshCoordinator>,
}

impl ClientGateway {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, store: Arc<SessionStore>, coordinator: Arc<RefreshCoordinator>) -> Self {
        Self { transport, store, coordinator }
    }

    #[must_use]
    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }
}

#[async_trait::async_trait]
impl ApiGateway for ClientGateway {
    async fn call(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let was_authenticated = self.store.is_authenticated() || self.store.is_login_pending();

        let err = match self.transport.send(&request).await {
            Ok(response) => return Ok(response),
            Err(e) => e,
        };

        if request.is_retry || !was_authenticated {
            return Err(err);
        }

        let classified = classify(&err);
        match classified.class {
            ErrorClass::AccessExpired => {
                tracing::debug!(endpoint = %request.endpoint, "access expired, refreshing");
                match self.coordinator.refresh().await {
                    Ok(_) => {
                        tracing::debug!(endpoint = %request.endpoint, "refreshed, retrying once");
                        self.transport.send(&request.into_retry()).await
                    }
                    Err(refresh_err) => {
                        let reason = classify(&refresh_err).message;
                        self.store.set_session_expired(reason.as_deref().unwrap_or(DEFAULT_EXPIRED_REASON));
                        Err(err)
                    }
                }
            }
            ErrorClass::RefreshExpired => {
                self.store.set_session_expired(classified.message.as_deref().unwrap_or(DEFAULT_EXPIRED_REASON));
                Err(err)
            }
            ErrorClass::Unauthenticated | ErrorClass::Other => Err(err),
        }
    }
}

#[cfg(test)]
#[path = "gateway_test.rs"]
mod tests;
