//! Front server router.
//!
//! SYSTEM CONTEXT
//! ==============
//! The browser only ever talks to this server. Page routes run the hydration
//! pass first, so handlers read a request-scoped [`SessionStore`] that is
//! already resolved, and any refreshed credential cookies ride back on the
//! response. `/api/*` is a first-party proxy to the backend: the client
//! runtime's cookie jar only ever sees cookies for this origin.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, RawQuery, Request, State};
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::{Extension, Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::config::SessionConfig;
use crate::cookies::{append_set_cookies, cookie_header, rewrite_set_cookie};
use crate::error::ApiError;
use crate::hydrate::{Hydration, HydrationBootstrapper};
use crate::session::{SessionRecord, SessionStore};
use crate::transport::Transport;
use crate::transport::http::{HttpTransport, build_url};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<SessionConfig>,
    /// Direct backend transport. `None` when `API_BASE_URL` is unset.
    pub backend: Option<Arc<HttpTransport>>,
}

impl AppState {
    /// # Errors
    ///
    /// Returns [`ApiError::Request`] if the backend HTTP client cannot be built.
    pub fn from_config(config: SessionConfig) -> Result<Self, ApiError> {
        let backend = match config.api_base_url.as_deref() {
            Some(base) => Some(Arc::new(HttpTransport::new(base, config.timeouts)?)),
            None => None,
        };
        Ok(Self { config: Arc::new(config), backend })
    }
}

/// Request-scoped session store, resolved by [`hydrate_session`].
#[derive(Clone)]
pub struct RequestSession(pub Arc<SessionStore>);

pub fn app(state: AppState) -> Router {
    let pages = Router::new()
        .route("/session", get(session))
        .route_layer(middleware::from_fn_with_state(state.clone(), hydrate_session));

    Router::new()
        .merge(pages)
        .route("/api/{*path}", any(proxy))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// HYDRATION
// =============================================================================

/// Resolve the session before the page handler runs and relay refreshed cookies.
pub async fn hydrate_session(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let store = Arc::new(SessionStore::server());
    let hydration = match &state.backend {
        Some(backend) => {
            let cookies = cookie_header(request.headers());
            let transport: Arc<dyn Transport> = Arc::clone(backend) as Arc<dyn Transport>;
            HydrationBootstrapper::new(transport, state.config.cookie_names.clone())
                .hydrate_into(&store, &cookies)
                .await
        }
        None => Hydration::default(),
    };

    request.extensions_mut().insert(RequestSession(store));
    let mut response = next.run(request).await;
    hydration.apply(response.headers_mut());
    response
}

/// Hydration payload for the client runtime.
async fn session(Extension(RequestSession(store)): Extension<RequestSession>) -> Json<SessionRecord> {
    Json(store.snapshot())
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

// =============================================================================
// PROXY
// =============================================================================

async fn proxy(
    State(state): State<AppState>,
    Path(path): Path<String>,
    method: Method,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(backend) = &state.backend else {
        return proxy_error(StatusCode::SERVICE_UNAVAILABLE, "backend not configured");
    };

    let mut url = build_url(backend.base_url(), &path);
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        url.push('?');
        url.push_str(&query);
    }

    let mut upstream = backend.client().request(method.clone(), &url);
    let cookies = cookie_header(&headers);
    if !cookies.is_empty() {
        upstream = upstream.header(COOKIE, cookies);
    }
    if let Some(content_type) = headers.get(CONTENT_TYPE) {
        upstream = upstream.header(CONTENT_TYPE, content_type.clone());
    }
    if !body.is_empty() {
        upstream = upstream.body(body);
    }

    let upstream = match upstream.send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(error = %e, %method, path = %path, "proxy request failed");
            let status = if e.is_timeout() { StatusCode::GATEWAY_TIMEOUT } else { StatusCode::BAD_GATEWAY };
            return proxy_error(status, "backend unavailable");
        }
    };

    let status = upstream.status();
    let content_type = upstream.headers().get(CONTENT_TYPE).cloned();
    let set_cookies: Vec<String> = upstream
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(rewrite_set_cookie)
        .collect();
    let bytes = match upstream.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, %method, path = %path, "proxy response body failed");
            return proxy_error(StatusCode::BAD_GATEWAY, "backend unavailable");
        }
    };

    let mut response = (status, bytes).into_response();
    if let Some(content_type) = content_type {
        response.headers_mut().insert(CONTENT_TYPE, content_type);
    }
    append_set_cookies(response.headers_mut(), &set_cookies);
    response
}

fn proxy_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "success": false, "message": message }))).into_response()
}

#[cfg(test)]
#[path = "routes_test.rs"]
mod tests;
