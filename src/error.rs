//! Transport errors and the closed failure taxonomy.
//!
//! DESIGN
//! ======
//! Every failure that crosses the gateway boundary is an [`ApiError`]. The
//! identity service encodes credential problems as HTTP 401 with a structured
//! body; [`classify`] reads that body once and maps it into [`ErrorClass`], so
//! the gateway, hydration pass, and store switch on the class instead of
//! probing JSON shapes at each call site.
//!
//! Two body shapes are accepted: `{ data: { error: { code, message } } }`
//! (the proxied API envelope) and `{ error: { code, message } }` (the shape
//! the backend returns to direct server-side calls).

use serde_json::Value;

/// Error code: access credential missing or expired. Recoverable by refresh.
pub const ACCESS_EXPIRED_CODE: &str = "AUTH_016";
/// Error code: refresh credential also expired. Terminal.
pub const REFRESH_EXPIRED_CODE: &str = "AUTH_002";

/// Maximum number of body characters carried in an HTTP error message.
const MAX_ERROR_CHARS: usize = 200;

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by a [`Transport`](crate::transport::Transport).
///
/// `Clone` is required: a single refresh failure is fanned out to every caller
/// waiting on the same in-flight refresh.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    /// The server answered with a non-success status.
    #[error("request failed ({status}): {message}")]
    Http { status: u16, body: Value, message: String },

    /// The server could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// The transport gave up waiting for a response.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// A success response body could not be decoded.
    #[error("response decode failed: {0}")]
    Decode(String),

    /// The request could not be built (bad URL, header, or body).
    #[error("request build failed: {0}")]
    Request(String),
}

impl ApiError {
    /// Build an HTTP error from a status code and the raw response text.
    ///
    /// The body is kept as JSON when it parses, otherwise as a JSON string.
    #[must_use]
    pub fn from_response(status: u16, text: &str) -> Self {
        let body = parse_body(text);
        let message = error_message(&body).map_or_else(|| sanitize_body(text), str::to_owned);
        Self::Http { status, body, message }
    }

    /// HTTP status, if the failure came from a response.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Response body, if the failure came from a response.
    #[must_use]
    pub fn body(&self) -> Option<&Value> {
        match self {
            Self::Http { body, .. } => Some(body),
            _ => None,
        }
    }
}

/// Parse a response body as JSON, falling back to a JSON string (or `null` when empty).
pub(crate) fn parse_body(text: &str) -> Value {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(trimmed.to_owned()))
}

fn sanitize_body(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        "Request failed.".to_owned()
    } else {
        trimmed.chars().take(MAX_ERROR_CHARS).collect()
    }
}

// =============================================================================
// TAXONOMY
// =============================================================================

/// Closed classification of gateway failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// 401 without a recognised credential code.
    Unauthenticated,
    /// 401 + [`ACCESS_EXPIRED_CODE`].
    AccessExpired,
    /// 401 + [`REFRESH_EXPIRED_CODE`].
    RefreshExpired,
    /// Anything else: validation errors, 5xx, network failures.
    Other,
}

/// Result of [`classify`]: the class plus whatever code and message the body carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub class: ErrorClass,
    pub code: Option<String>,
    pub message: Option<String>,
}

/// Map any transport error into the closed taxonomy.
#[must_use]
pub fn classify(error: &ApiError) -> Classified {
    let Some(body) = error.body() else {
        return Classified { class: ErrorClass::Other, code: None, message: None };
    };

    let code = error_code(body).map(str::to_owned);
    let message = error_message(body).map(str::to_owned);
    let class = match (error.status(), code.as_deref()) {
        (Some(401), Some(ACCESS_EXPIRED_CODE)) => ErrorClass::AccessExpired,
        (Some(401), Some(REFRESH_EXPIRED_CODE)) => ErrorClass::RefreshExpired,
        (Some(401), _) => ErrorClass::Unauthenticated,
        _ => ErrorClass::Other,
    };

    Classified { class, code, message }
}

/// Structured error code from `data.error.code` or `error.code`.
#[must_use]
pub fn error_code(body: &Value) -> Option<&str> {
    structured_error(body)?.get("code")?.as_str()
}

/// Human-readable message from `data.error.message`, `error.message`, or `message`.
#[must_use]
pub fn error_message(body: &Value) -> Option<&str> {
    structured_error(body)
        .and_then(|err| err.get("message"))
        .or_else(|| body.get("message"))
        .and_then(Value::as_str)
        .filter(|message| !message.trim().is_empty())
}

fn structured_error(body: &Value) -> Option<&Value> {
    body.pointer("/data/error")
        .filter(|err| err.is_object())
        .or_else(|| body.get("error").filter(|err| err.is_object()))
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
