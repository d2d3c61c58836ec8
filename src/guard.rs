//! Route guard for authenticated views.
//!
//! The guard is a three-state machine evaluated on every protected
//! navigation. The persisted login hint lets a client that never logged in be
//! redirected without a network round trip; the store stays authoritative.

use std::sync::Arc;

use crate::gateway::ApiGateway;
use crate::runtime::RuntimeContext;
use crate::session::SessionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Allow,
    /// Hint present but identity unknown: resolve it first.
    Verify,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    /// Navigate to this login URL instead.
    Redirect(String),
}

pub struct RouteGuard {
    context: RuntimeContext,
    store: Arc<SessionStore>,
    gateway: Arc<dyn ApiGateway>,
    login_path: String,
}

impl RouteGuard {
    #[must_use]
    pub fn new(
        context: RuntimeContext,
        store: Arc<SessionStore>,
        gateway: Arc<dyn ApiGateway>,
        login_path: impl Into<String>,
    ) -> Self {
        Self { context, store, gateway, login_path: login_path.into() }
    }

    /// First step of the machine; never touches the network.
    #[must_use]
    pub fn evaluate(&self) -> GuardState {
        if self.context == RuntimeContext::Server || self.store.is_authenticated() {
            GuardState::Allow
        } else if !self.store.hint_is_set() {
            GuardState::Deny
        } else {
            GuardState::Verify
        }
    }

    /// Run the full machine for a navigation to `target`.
    pub async fn check(&self, target: Option<&str>) -> GuardDecision {
        match self.evaluate() {
            GuardState::Allow => GuardDecision::Allow,
            GuardState::Deny => {
                tracing::debug!("no login hint, redirecting to login");
                GuardDecision::Redirect(self.login_url(target))
            }
            GuardState::Verify => {
                self.store.ensure_user(self.gateway.as_ref()).await;
                if self.store.is_authenticated() {
                    GuardDecision::Allow
                } else {
                    self.store.clear_hint();
                    tracing::debug!("stale login hint cleared, redirecting to login");
                    GuardDecision::Redirect(self.login_url(target))
                }
            }
        }
    }

    /// Login URL, carrying the originally requested path as `redirect`.
    #[must_use]
    pub fn login_url(&self, target: Option<&str>) -> String {
        match target.map(str::trim).filter(|t| !t.is_empty()) {
            Some(target) => format!("{}?redirect={}", self.login_path, urlencoding::encode(target)),
            None => self.login_path.clone(),
        }
    }
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
