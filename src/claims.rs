//! Return-claim submission.
//!
//! A domain caller of the gateway: it never looks at credentials, it only
//! turns failures into a message the storefront can show. Session side
//! effects (refresh, expiry) happen underneath in the gateway.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ApiError, error_message};
use crate::gateway::ApiGateway;

pub const CLAIMS_ENDPOINT: &str = "/claims";

/// Shown when the backend rejects a claim without saying why.
pub const CLAIM_REJECTED_MESSAGE: &str = "반품 신청에 실패했습니다.";
/// Shown when a claim request never reaches the backend.
pub const CLAIM_FAILED_MESSAGE: &str = "반품 신청 중 오류가 발생했습니다.";

// =============================================================================
// PAYLOAD
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimType {
    Return,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonType {
    ChangeOfMind,
    Defective,
    WrongDelivery,
    DelayedDelivery,
    OutOfStock,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefundMethod {
    Original,
    Bank,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimItem {
    pub order_item_id: u64,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange_variant_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClaimRequest {
    pub order_id: u64,
    pub claim_type: ClaimType,
    pub reason_type: ReasonType,
    pub reason: String,
    pub items: Vec<ClaimItem>,
    pub estimated_refund_amount: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund_method: Option<RefundMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_holder: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ClaimError(pub String);

// =============================================================================
// SERVICE
// =============================================================================

pub struct ClaimService {
    gateway: Arc<dyn ApiGateway>,
    pending: AtomicBool,
    last_error: Mutex<Option<String>>,
}

impl ClaimService {
    #[must_use]
    pub fn new(gateway: Arc<dyn ApiGateway>) -> Self {
        Self { gateway, pending: AtomicBool::new(false), last_error: Mutex::new(None) }
    }

    /// True while a submission is in flight.
    #[must_use]
    pub fn pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Message of the most recent failed submission.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
    }

    /// Submit a return claim and return the created claim's `data`.
    ///
    /// # Errors
    ///
    /// Returns a [`ClaimError`] carrying a user-facing message when the call
    /// fails or the backend rejects the claim.
    pub async fn create_claim(&self, request: &CreateClaimRequest) -> Result<Value, ClaimError> {
        self.pending.store(true, Ordering::Release);
        *self.last_error.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = None;

        let result = self.submit(request).await;

        if let Err(e) = &result {
            tracing::debug!(order_id = request.order_id, error = %e, "claim submission failed");
            *self.last_error.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = Some(e.0.clone());
        }
        self.pending.store(false, Ordering::Release);
        result
    }

    async fn submit(&self, request: &CreateClaimRequest) -> Result<Value, ClaimError> {
        let body = serde_json::to_value(request).map_err(|e| ClaimError(e.to_string()))?;
        let response = self.gateway.post(CLAIMS_ENDPOINT, body).await.map_err(|e| ClaimError(failure_message(&e)))?;

        if response.body.get("success").and_then(Value::as_bool) == Some(true) {
            return Ok(response.body.get("data").cloned().unwrap_or(Value::Null));
        }
        let message = response
            .body
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(CLAIM_REJECTED_MESSAGE);
        Err(ClaimError(message.to_owned()))
    }
}

/// User-facing message for a failed claim call.
///
/// Connection failures and timeouts map to [`CLAIM_FAILED_MESSAGE`].
fn failure_message(err: &ApiError) -> String {
    if let Some(message) = err.body().and_then(error_message) {
        return message.to_owned();
    }
    match err {
        ApiError::Network(_) | ApiError::Timeout(_) => CLAIM_FAILED_MESSAGE.to_owned(),
        _ => err.to_string(),
    }
}

#[cfg(test)]
#[path = "claims_test.rs"]
mod tests;
