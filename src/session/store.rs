//! Session state store.
//!
//! SYSTEM CONTEXT
//! ==============
//! One store per runtime context: a fresh one per server-rendered request,
//! one for the lifetime of the client runtime. It is the single source of
//! truth for "is this caller authenticated". The route guard and page code
//! read it; the client gateway writes the terminal expiry transition into it.
//!
//! DESIGN
//! ======
//! The record lives in a `tokio::sync::watch` channel. Every transition is a
//! single `send_*` call on the sender, so observers never see a half-applied
//! update and UI code can `subscribe()` to every change.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;

use super::hint::LoginHint;
use crate::gateway::ApiGateway;
use crate::transport::IDENTITY_ENDPOINT;

// =============================================================================
// RECORD
// =============================================================================

/// Snapshot of the session as seen by one runtime context.
///
/// `is_authenticated` implies `user.is_some()` and `!is_session_expired`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub user: Option<Value>,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub is_session_expired: bool,
    pub session_expired_reason: String,
}

impl SessionRecord {
    /// Authenticated record for a resolved identity.
    #[must_use]
    pub fn authenticated(user: Value) -> Self {
        Self { user: Some(user), is_authenticated: true, ..Self::default() }
    }

    /// Terminally expired record.
    #[must_use]
    pub fn expired(reason: impl Into<String>) -> Self {
        Self { is_session_expired: true, session_expired_reason: reason.into(), ..Self::default() }
    }

    fn clear_identity(&mut self) {
        self.user = None;
        self.is_authenticated = false;
    }

    /// Drop an authenticated flag that has no identity behind it.
    fn normalized(mut self) -> Self {
        if self.user.is_none() || self.is_session_expired {
            self.is_authenticated = false;
        }
        if !self.is_session_expired {
            self.session_expired_reason.clear();
        }
        self.is_loading = false;
        self
    }
}

// =============================================================================
// STORE
// =============================================================================

pub struct SessionStore {
    tx: watch::Sender<SessionRecord>,
    hint: Option<Arc<dyn LoginHint>>,
    /// Reason of the latest expiry event, until the UI takes it.
    notice: Mutex<Option<String>>,
    /// Number of `login` calls still resolving.
    logins: AtomicUsize,
}

impl SessionStore {
    /// Store for a server-rendered request. No login hint is available.
    #[must_use]
    pub fn server() -> Self {
        Self::with_record(SessionRecord::default(), None)
    }

    /// Empty client store backed by a login hint.
    #[must_use]
    pub fn client(hint: Arc<dyn LoginHint>) -> Self {
        Self::with_record(SessionRecord::default(), Some(hint))
    }

    /// Client store seeded from the server's hydration payload.
    ///
    /// An authenticated payload persists the login hint; an expired payload
    /// clears it and arms the expiry notice.
    #[must_use]
    pub fn from_hydrated(record: SessionRecord, hint: Arc<dyn LoginHint>) -> Self {
        let record = record.normalized();
        if record.is_authenticated {
            hint.set();
        } else if record.is_session_expired {
            hint.clear();
        }
        let notice = record.is_session_expired.then(|| record.session_expired_reason.clone());
        let store = Self::with_record(record, Some(hint));
        *store.notice.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = notice;
        store
    }

    fn with_record(record: SessionRecord, hint: Option<Arc<dyn LoginHint>>) -> Self {
        Self { tx: watch::Sender::new(record), hint, notice: Mutex::new(None), logins: AtomicUsize::new(0) }
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionRecord {
        self.tx.borrow().clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.tx.borrow().is_authenticated
    }

    /// True while a [`Self::login`] is resolving the identity. The client
    /// gateway treats such a caller as authenticated.
    #[must_use]
    pub fn is_login_pending(&self) -> bool {
        self.logins.load(Ordering::Acquire) > 0
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionRecord> {
        self.tx.subscribe()
    }

    /// Whether the persisted login hint is present. Always false on the server.
    #[must_use]
    pub fn hint_is_set(&self) -> bool {
        self.hint.as_ref().is_some_and(|hint| hint.is_set())
    }

    pub fn clear_hint(&self) {
        if let Some(hint) = &self.hint {
            hint.clear();
        }
    }

    fn set_hint(&self) {
        if let Some(hint) = &self.hint {
            hint.set();
        }
    }

    /// Populate the record with a resolved identity.
    pub fn set_user(&self, user: Value) {
        self.tx.send_replace(SessionRecord::authenticated(user));
    }

    /// Replace the record with one produced by a hydration pass.
    ///
    /// An expired record goes through [`Self::set_session_expired`] so the
    /// expiry notice is armed.
    pub fn restore(&self, record: SessionRecord) {
        let record = record.normalized();
        if record.is_session_expired {
            self.set_session_expired(&record.session_expired_reason);
        } else {
            self.tx.send_replace(record);
        }
    }

    /// Persist the login hint and resolve the identity.
    ///
    /// The record only turns authenticated once the identity is present. A
    /// failed resolution leaves the hint for the guard to clear later.
    /// While it runs [`Self::is_login_pending`] is true, so an expired access
    /// credential on the identity call is refreshed.
    pub async fn login(&self, gateway: &dyn ApiGateway) {
        self.logins.fetch_add(1, Ordering::AcqRel);
        let _pending = LoginPending(&self.logins);
        self.set_hint();
        self.fetch_user(gateway).await;
    }

    /// Clear identity, expiry and the login hint. Idempotent.
    pub fn logout(&self) {
        let mut notice = self.notice.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *notice = None;
        self.tx.send_if_modified(|record| {
            let cleared = SessionRecord { is_loading: record.is_loading, ..SessionRecord::default() };
            if *record == cleared {
                return false;
            }
            *record = cleared;
            true
        });
        drop(notice);
        self.clear_hint();
    }

    /// Terminal transition after an irrecoverable refresh failure.
    ///
    /// Arms the expiry notice only on a transition into the expired state;
    /// a repeated expiry while already expired updates the reason in place.
    pub fn set_session_expired(&self, reason: &str) {
        let mut notice = self.notice.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut newly_expired = false;
        self.tx.send_modify(|record| {
            newly_expired = !record.is_session_expired;
            record.clear_identity();
            record.is_session_expired = true;
            reason.clone_into(&mut record.session_expired_reason);
        });
        if newly_expired {
            tracing::warn!(reason, "session expired");
            *notice = Some(reason.to_owned());
        } else if let Some(pending) = notice.as_mut() {
            reason.clone_into(pending);
        }
        drop(notice);
        self.clear_hint();
    }

    /// Reason of the latest expiry event, returned once per event.
    pub fn take_expiry_notice(&self) -> Option<String> {
        self.notice.lock().unwrap_or_else(std::sync::PoisonError::into_inner).take()
    }

    /// Resolve the identity from the identity endpoint.
    ///
    /// Failures of any kind leave the record unauthenticated and are not
    /// returned.
    pub async fn fetch_user(&self, gateway: &dyn ApiGateway) {
        self.tx.send_modify(|record| record.is_loading = true);
        self.resolve(gateway).await;
    }

    /// Resolve the identity unless it is already known.
    ///
    /// Concurrent callers share one resolution: only the caller that flips the
    /// loading flag fetches, the others wait for the flag to drop.
    pub async fn ensure_user(&self, gateway: &dyn ApiGateway) {
        let started = self.tx.send_if_modified(|record| {
            if record.is_authenticated || record.is_loading {
                return false;
            }
            record.is_loading = true;
            true
        });

        if started {
            self.resolve(gateway).await;
            return;
        }

        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|record| !record.is_loading).await;
    }

    async fn resolve(&self, gateway: &dyn ApiGateway) {
        let mut guard = LoadingGuard { tx: &self.tx, armed: true };
        let user = match gateway.get(IDENTITY_ENDPOINT, &[]).await {
            Ok(response) => identity_from_body(&response.body),
            Err(e) => {
                tracing::debug!(error = %e, "identity resolution failed");
                None
            }
        };

        self.tx.send_modify(|record| {
            record.is_loading = false;
            match user {
                Some(user) => {
                    *record = SessionRecord::authenticated(user);
                }
                None => record.clear_identity(),
            }
        });
        guard.armed = false;
    }
}

/// Drops the loading flag when a resolution is cancelled before it settles.
struct LoadingGuard<'a> {
    tx: &'a watch::Sender<SessionRecord>,
    armed: bool,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.tx.send_if_modified(|record| std::mem::replace(&mut record.is_loading, false));
        }
    }
}

struct LoginPending<'a>(&'a AtomicUsize);

impl Drop for LoginPending<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Identity carried by a `{ success, data }` envelope, if any.
pub(crate) fn identity_from_body(body: &Value) -> Option<Value> {
    if body.get("success").and_then(Value::as_bool) != Some(true) {
        return None;
    }
    body.get("data").filter(|data| !data.is_null()).cloned()
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
