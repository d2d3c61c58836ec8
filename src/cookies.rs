//! Cookie parsing and credential cookie relaying.
//!
//! SYSTEM CONTEXT
//! ==============
//! The server-side hydration pass reads the browser's credential cookies from
//! the inbound `Cookie` header and, after a refresh, relays the identity
//! service's new `Set-Cookie` headers back to the browser. Those cookies are
//! issued for an internal service path and host, so each one is rewritten into
//! a first-party cookie for the public origin before it is relayed.

use std::collections::BTreeMap;

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use axum_extra::extract::cookie::{Cookie, SameSite};

pub const ACCESS_COOKIE_NAME: &str = "access_token";
pub const REFRESH_COOKIE_NAME: &str = "refresh_token";

/// Names of the two credential cookies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieNames {
    pub access: String,
    pub refresh: String,
}

impl Default for CookieNames {
    fn default() -> Self {
        Self { access: ACCESS_COOKIE_NAME.to_owned(), refresh: REFRESH_COOKIE_NAME.to_owned() }
    }
}

/// The credential cookies found on an inbound request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialCookies {
    pub access: Option<String>,
    pub refresh: Option<String>,
}

impl CredentialCookies {
    /// Pick the credential cookies out of a `Cookie` header value.
    #[must_use]
    pub fn from_cookie_header(header: &str, names: &CookieNames) -> Self {
        let mut cookies = parse_cookie_header(header);
        Self {
            access: cookies.remove(&names.access).filter(|v| !v.is_empty()),
            refresh: cookies.remove(&names.refresh).filter(|v| !v.is_empty()),
        }
    }

    /// True when neither credential is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.access.is_none() && self.refresh.is_none()
    }

    #[must_use]
    pub fn has_refresh(&self) -> bool {
        self.refresh.is_some()
    }
}

/// Parse a `Cookie` request header into a name → value map.
///
/// Malformed pairs are skipped. When a name repeats, the first value wins,
/// matching how browsers order more specific cookies first.
#[must_use]
pub fn parse_cookie_header(header: &str) -> BTreeMap<String, String> {
    let mut cookies = BTreeMap::new();
    for cookie in Cookie::split_parse(header).flatten() {
        cookies.entry(cookie.name().to_owned()).or_insert_with(|| cookie.value().to_owned());
    }
    cookies
}

/// Join every `Cookie` header on a request into one header value.
#[must_use]
pub fn cookie_header(headers: &HeaderMap) -> String {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Rewrite an upstream `Set-Cookie` value into a first-party cookie.
///
/// Drops `Secure` and `Domain`, forces `SameSite=Lax` and `Path=/`. All other
/// attributes (`HttpOnly`, `Max-Age`, `Expires`) pass through. Returns `None`
/// when the value is not a parseable cookie.
#[must_use]
pub fn rewrite_set_cookie(raw: &str) -> Option<String> {
    let mut cookie = Cookie::parse(raw.trim().to_owned()).ok()?;
    cookie.set_secure(false);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_path("/");
    cookie.unset_domain();
    Some(cookie.to_string())
}

/// Apply freshly issued `Set-Cookie` values to a `Cookie` request header.
///
/// Cookies named in `set_cookies` replace their old values or are appended;
/// cookies cleared upstream (empty value) are dropped. Used to retry a request
/// with the credentials a refresh just issued.
#[must_use]
pub fn merge_cookie_header(header: &str, set_cookies: &[String]) -> String {
    let mut pairs: Vec<(String, String)> = Cookie::split_parse(header)
        .flatten()
        .map(|cookie| (cookie.name().to_owned(), cookie.value().to_owned()))
        .collect();

    for raw in set_cookies {
        let Ok(fresh) = Cookie::parse(raw.as_str()) else {
            continue;
        };
        pairs.retain(|(name, _)| name != fresh.name());
        if !fresh.value().is_empty() {
            pairs.push((fresh.name().to_owned(), fresh.value().to_owned()));
        }
    }

    pairs
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Append `Set-Cookie` values to outbound response headers.
///
/// Values that are not valid header text are logged and skipped.
pub fn append_set_cookies(headers: &mut HeaderMap, set_cookies: &[String]) {
    for cookie in set_cookies {
        match HeaderValue::from_str(cookie) {
            Ok(value) => {
                headers.append(SET_COOKIE, value);
            }
            Err(e) => tracing::warn!(error = %e, "dropping unrepresentable set-cookie"),
        }
    }
}

#[cfg(test)]
#[path = "cookies_test.rs"]
mod tests;
