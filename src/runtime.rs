//! Per-context wiring of store, gateway, coordinator and guard.
//!
//! A server runtime is built per inbound request and discarded with it. A
//! client runtime lives as long as the client and owns the only refresh
//! coordinator that client ever uses.

use std::sync::Arc;

use crate::config::SessionConfig;
use crate::error::ApiError;
use crate::gateway::{ApiGateway, ClientGateway, ServerGateway};
use crate::guard::RouteGuard;
use crate::refresh::RefreshCoordinator;
use crate::session::{FileLoginHint, LoginHint, MemoryLoginHint, SessionRecord, SessionStore};
use crate::transport::Transport;
use crate::transport::http::HttpTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeContext {
    /// Server-side rendering pass for one request.
    Server,
    /// Long-lived client runtime.
    Client,
}

pub struct SessionRuntime {
    pub context: RuntimeContext,
    pub store: Arc<SessionStore>,
    pub gateway: Arc<dyn ApiGateway>,
    pub guard: RouteGuard,
    /// Present in the client context only.
    pub coordinator: Option<Arc<RefreshCoordinator>>,
}

impl SessionRuntime {
    /// Runtime for one server-rendered request.
    #[must_use]
    pub fn server(transport: Arc<dyn Transport>, cookie_header: &str, login_path: &str) -> Self {
        let store = Arc::new(SessionStore::server());
        let gateway: Arc<dyn ApiGateway> = Arc::new(ServerGateway::new(transport, cookie_header));
        let guard = RouteGuard::new(RuntimeContext::Server, Arc::clone(&store), Arc::clone(&gateway), login_path);
        Self { context: RuntimeContext::Server, store, gateway, guard, coordinator: None }
    }

    /// Client runtime over an existing store.
    #[must_use]
    pub fn client(transport: Arc<dyn Transport>, store: Arc<SessionStore>, login_path: &str) -> Self {
        let coordinator = Arc::new(RefreshCoordinator::new(Arc::clone(&transport)));
        let gateway: Arc<dyn ApiGateway> =
            Arc::new(ClientGateway::new(transport, Arc::clone(&store), Arc::clone(&coordinator)));
        let guard = RouteGuard::new(RuntimeContext::Client, Arc::clone(&store), Arc::clone(&gateway), login_path);
        Self { context: RuntimeContext::Client, store, gateway, guard, coordinator: Some(coordinator) }
    }

    /// Client runtime talking to the public base URL, seeded from an optional
    /// hydration payload.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Request`] if the HTTP client cannot be built.
    pub fn client_from_config(config: &SessionConfig, hydrated: Option<SessionRecord>) -> Result<Self, ApiError> {
        let transport: Arc<dyn Transport> =
            Arc::new(HttpTransport::with_cookie_store(&config.public_api_base, config.timeouts)?);
        let hint: Arc<dyn LoginHint> = match &config.login_hint_path {
            Some(path) => Arc::new(FileLoginHint::new(path)),
            None => Arc::new(MemoryLoginHint::default()),
        };
        let store = match hydrated {
            Some(record) => SessionStore::from_hydrated(record, hint),
            None => SessionStore::client(hint),
        };
        Ok(Self::client(transport, Arc::new(store), &config.login_path))
    }
}

#[cfg(test)]
#[path = "runtime_test.rs"]
mod tests;
