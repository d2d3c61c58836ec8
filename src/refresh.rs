//! Refresh coordinator.
//!
//! SYSTEM CONTEXT
//! ==============
//! Many outbound calls can discover an expired access credential at the same
//! moment. The backend must see at most one `POST /auth/refresh` per runtime
//! context while it is in flight, and every caller must get the real outcome.
//!
//! DESIGN
//! ======
//! Join-or-start under a mutex. The pending slot holds a `Shared` future;
//! callers that find it occupied await a clone of it. The future clears the
//! slot itself before yielding, so a caller arriving after settlement always
//! starts a fresh attempt.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};

use crate::error::ApiError;
use crate::transport::{ApiRequest, REFRESH_ENDPOINT, Transport};

/// Credential material issued by a successful refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshOutcome {
    /// Raw `Set-Cookie` values returned by the identity service.
    pub set_cookies: Vec<String>,
}

type PendingRefresh = Shared<BoxFuture<'static, Result<RefreshOutcome, ApiError>>>;

pub struct RefreshCoordinator {
    transport: Arc<dyn Transport>,
    /// Inbound `Cookie` header forwarded by the server context.
    cookie_header: Option<String>,
    pending: Arc<Mutex<Option<PendingRefresh>>>,
    issued: AtomicU64,
}

impl RefreshCoordinator {
    /// Coordinator for the client runtime; credentials come from the cookie jar.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport, cookie_header: None, pending: Arc::new(Mutex::new(None)), issued: AtomicU64::new(0) }
    }

    /// Coordinator for one server request, forwarding its `Cookie` header.
    #[must_use]
    pub fn with_cookie_header(transport: Arc<dyn Transport>, cookie_header: impl Into<String>) -> Self {
        Self { cookie_header: Some(cookie_header.into()), ..Self::new(transport) }
    }

    /// Refresh the credentials, joining an in-flight attempt if there is one.
    ///
    /// # Errors
    ///
    /// Returns the refresh call's error, shared by every joined caller.
    pub async fn refresh(&self) -> Result<RefreshOutcome, ApiError> {
        let shared = {
            let mut pending = self.pending.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            if let Some(in_flight) = pending.as_ref() {
                tracing::debug!("joining in-flight refresh");
                in_flight.clone()
            } else {
                let attempt = self.start();
                *pending = Some(attempt.clone());
                attempt
            }
        };
        shared.await
    }

    /// Number of refresh calls issued so far.
    #[must_use]
    pub fn issued(&self) -> u64 {
        self.issued.load(Ordering::Relaxed)
    }

    fn start(&self) -> PendingRefresh {
        let attempt = self.issued.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(attempt, "starting refresh");

        let transport = Arc::clone(&self.transport);
        let slot = Arc::clone(&self.pending);
        let mut request = ApiRequest::post(REFRESH_ENDPOINT);
        if let Some(cookie) = &self.cookie_header {
            request = request.with_header("cookie", cookie);
        }

        async move {
            let result = transport
                .send(&request)
                .await
                .map(|response| RefreshOutcome { set_cookies: response.set_cookies });
            *slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = None;
            if let Err(e) = &result {
                tracing::debug!(attempt, error = %e, "refresh failed");
            }
            result
        }
        .boxed()
        .shared()
    }
}

#[cfg(test)]
#[path = "refresh_test.rs"]
mod tests;
