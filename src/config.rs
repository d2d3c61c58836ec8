//! Session configuration parsed from environment variables.

use std::path::PathBuf;

use crate::cookies::{ACCESS_COOKIE_NAME, CookieNames, REFRESH_COOKIE_NAME};

pub const DEFAULT_PUBLIC_API_BASE: &str = "http://localhost:3000/api";
pub const DEFAULT_LOGIN_PATH: &str = "/login";
pub const DEFAULT_HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A configuration value could not be parsed.
    #[error("invalid {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_HTTP_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_HTTP_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Backend base URL for direct server-side calls. `None` disables hydration.
    pub api_base_url: Option<String>,
    /// Public, proxied base URL used by the client runtime.
    pub public_api_base: String,
    pub cookie_names: CookieNames,
    pub login_path: String,
    /// File backing the durable login hint. In-memory hint when absent.
    pub login_hint_path: Option<PathBuf>,
    pub timeouts: HttpTimeouts,
    pub port: u16,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            public_api_base: DEFAULT_PUBLIC_API_BASE.to_owned(),
            cookie_names: CookieNames::default(),
            login_path: DEFAULT_LOGIN_PATH.to_owned(),
            login_hint_path: None,
            timeouts: HttpTimeouts::default(),
            port: DEFAULT_PORT,
        }
    }
}

impl SessionConfig {
    /// Build typed session config from environment variables.
    ///
    /// Optional:
    /// - `API_BASE_URL`: backend base for server-side calls (hydration off when unset)
    /// - `PUBLIC_API_BASE`: default `http://localhost:3000/api`
    /// - `ACCESS_COOKIE_NAME` / `REFRESH_COOKIE_NAME`: default `access_token` / `refresh_token`
    /// - `LOGIN_PATH`: default `/login`
    /// - `LOGIN_HINT_PATH`: file for the durable login hint
    /// - `HTTP_REQUEST_TIMEOUT_SECS`: default 30
    /// - `HTTP_CONNECT_TIMEOUT_SECS`: default 10
    /// - `PORT`: default 3000
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a numeric value does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a numeric value does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let value = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        let api_base_url = value("API_BASE_URL").map(|url| url.trim_end_matches('/').to_owned());
        let public_api_base = value("PUBLIC_API_BASE")
            .unwrap_or_else(|| DEFAULT_PUBLIC_API_BASE.to_owned())
            .trim_end_matches('/')
            .to_owned();
        let cookie_names = CookieNames {
            access: value("ACCESS_COOKIE_NAME").unwrap_or_else(|| ACCESS_COOKIE_NAME.to_owned()),
            refresh: value("REFRESH_COOKIE_NAME").unwrap_or_else(|| REFRESH_COOKIE_NAME.to_owned()),
        };
        let login_path = value("LOGIN_PATH").unwrap_or_else(|| DEFAULT_LOGIN_PATH.to_owned());
        let login_hint_path = value("LOGIN_HINT_PATH").map(PathBuf::from);
        let timeouts = HttpTimeouts {
            request_secs: parse_or(
                "HTTP_REQUEST_TIMEOUT_SECS",
                value("HTTP_REQUEST_TIMEOUT_SECS"),
                DEFAULT_HTTP_REQUEST_TIMEOUT_SECS,
            )?,
            connect_secs: parse_or(
                "HTTP_CONNECT_TIMEOUT_SECS",
                value("HTTP_CONNECT_TIMEOUT_SECS"),
                DEFAULT_HTTP_CONNECT_TIMEOUT_SECS,
            )?,
        };
        let port = parse_or("PORT", value("PORT"), DEFAULT_PORT)?;

        Ok(Self { api_base_url, public_api_base, cookie_names, login_path, login_hint_path, timeouts, port })
    }
}

fn parse_or<T>(var: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| ConfigError::Invalid { var, reason: format!("{raw:?}: {e}") }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
