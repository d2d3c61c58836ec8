//! SSR hydration bootstrapper.
//!
//! SYSTEM CONTEXT
//! ==============
//! Runs once per server-rendered request, before any page code, and resolves
//! the session from the inbound credential cookies. When the access
//! credential has expired it performs at most one refresh-and-retry cycle and
//! relays the newly issued cookies, rewritten for the public origin, back to
//! the browser.
//!
//! OUTCOMES
//! ========
//! - no credential cookies: no network call, default record
//! - identity resolved: authenticated record
//! - access expired + refresh cookie: refresh, relay cookies, retry identity
//!   with the fresh cookies; a failed refresh or retry expires the session
//! - anything else: default record, no expiry flag

use std::sync::Arc;

use axum::http::HeaderMap;

use crate::cookies::{CookieNames, CredentialCookies, append_set_cookies, merge_cookie_header, rewrite_set_cookie};
use crate::error::{ApiError, ErrorClass, classify};
use crate::gateway::{ApiGateway, DEFAULT_EXPIRED_REASON, ServerGateway};
use crate::refresh::RefreshCoordinator;
use crate::session::SessionRecord;
use crate::session::SessionStore;
use crate::session::store::identity_from_body;
use crate::transport::{IDENTITY_ENDPOINT, Transport};

/// Result of one hydration pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hydration {
    pub record: SessionRecord,
    /// Rewritten `Set-Cookie` values to append to the outbound response.
    pub set_cookies: Vec<String>,
}

impl Hydration {
    /// Append the relayed cookies to an outbound response's headers.
    pub fn apply(&self, headers: &mut HeaderMap) {
        append_set_cookies(headers, &self.set_cookies);
    }
}

pub struct HydrationBootstrapper {
    transport: Arc<dyn Transport>,
    names: CookieNames,
}

impl HydrationBootstrapper {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, names: CookieNames) -> Self {
        Self { transport, names }
    }

    /// Hydrate and write the resulting record into `store`.
    pub async fn hydrate_into(&self, store: &SessionStore, cookie_header: &str) -> Hydration {
        let hydration = self.hydrate(cookie_header).await;
        store.restore(hydration.record.clone());
        hydration
    }

    /// Resolve the session for one inbound `Cookie` header.
    pub async fn hydrate(&self, cookie_header: &str) -> Hydration {
        let credentials = CredentialCookies::from_cookie_header(cookie_header, &self.names);
        if credentials.is_empty() {
            tracing::debug!("no credential cookies, skipping hydration");
            return Hydration::default();
        }

        let gateway = ServerGateway::new(Arc::clone(&self.transport), cookie_header);
        let err = match gateway.get(IDENTITY_ENDPOINT, &[]).await {
            Ok(response) => return Hydration { record: record_for(&response.body), set_cookies: Vec::new() },
            Err(e) => e,
        };

        if classify(&err).class != ErrorClass::AccessExpired || !credentials.has_refresh() {
            tracing::debug!(error = %err, "identity unavailable during hydration");
            return Hydration::default();
        }

        let coordinator = RefreshCoordinator::with_cookie_header(Arc::clone(&self.transport), cookie_header);
        let outcome = match coordinator.refresh().await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(error = %e, "refresh failed during hydration");
                return Hydration { record: expired_record(&e), set_cookies: Vec::new() };
            }
        };

        let set_cookies: Vec<String> = outcome.set_cookies.iter().filter_map(|raw| rewrite_set_cookie(raw)).collect();
        tracing::debug!(relayed = set_cookies.len(), "relaying refreshed cookies");

        let fresh = merge_cookie_header(cookie_header, &outcome.set_cookies);
        let retry = ServerGateway::new(Arc::clone(&self.transport), fresh);
        let record = match retry.get(IDENTITY_ENDPOINT, &[]).await {
            Ok(response) => record_for(&response.body),
            Err(e) => {
                tracing::warn!(error = %e, "identity retry failed after refresh");
                expired_record(&e)
            }
        };

        Hydration { record, set_cookies }
    }
}

fn record_for(body: &serde_json::Value) -> SessionRecord {
    identity_from_body(body).map(SessionRecord::authenticated).unwrap_or_default()
}

fn expired_record(err: &ApiError) -> SessionRecord {
    let reason = classify(err).message.unwrap_or_else(|| DEFAULT_EXPIRED_REASON.to_owned());
    SessionRecord::expired(reason)
}

#[cfg(test)]
#[path = "hydrate_test.rs"]
mod tests;
