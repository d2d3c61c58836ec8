use super::*;
use std::collections::HashMap;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
    move |key| map.get(key).cloned()
}

#[test]
fn defaults_when_nothing_is_set() {
    let config = SessionConfig::from_lookup(lookup(&[])).unwrap();
    assert_eq!(config, SessionConfig::default());
    assert_eq!(config.api_base_url, None);
    assert_eq!(config.cookie_names.access, "access_token");
    assert_eq!(config.cookie_names.refresh, "refresh_token");
    assert_eq!(config.login_path, "/login");
    assert_eq!(config.port, 3000);
}

#[test]
fn overrides_are_applied_and_trailing_slashes_trimmed() {
    let config = SessionConfig::from_lookup(lookup(&[
        ("API_BASE_URL", "http://backend:8080/"),
        ("PUBLIC_API_BASE", "https://shop.example.com/api/"),
        ("ACCESS_COOKIE_NAME", "at"),
        ("REFRESH_COOKIE_NAME", "rt"),
        ("LOGIN_PATH", "/signin"),
        ("LOGIN_HINT_PATH", "/tmp/hint"),
        ("HTTP_REQUEST_TIMEOUT_SECS", "5"),
        ("HTTP_CONNECT_TIMEOUT_SECS", "2"),
        ("PORT", "8081"),
    ]))
    .unwrap();

    assert_eq!(config.api_base_url.as_deref(), Some("http://backend:8080"));
    assert_eq!(config.public_api_base, "https://shop.example.com/api");
    assert_eq!(config.cookie_names, CookieNames { access: "at".into(), refresh: "rt".into() });
    assert_eq!(config.login_path, "/signin");
    assert_eq!(config.login_hint_path, Some(PathBuf::from("/tmp/hint")));
    assert_eq!(config.timeouts, HttpTimeouts { request_secs: 5, connect_secs: 2 });
    assert_eq!(config.port, 8081);
}

#[test]
fn blank_values_fall_back_to_defaults() {
    let config = SessionConfig::from_lookup(lookup(&[("API_BASE_URL", "   "), ("PORT", "")])).unwrap();
    assert_eq!(config.api_base_url, None);
    assert_eq!(config.port, DEFAULT_PORT);
}

#[test]
fn invalid_number_is_an_error() {
    let err = SessionConfig::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
    assert!(err.to_string().starts_with("invalid PORT"), "got {err}");

    let err = SessionConfig::from_lookup(lookup(&[("HTTP_REQUEST_TIMEOUT_SECS", "-1")])).unwrap_err();
    assert!(err.to_string().contains("HTTP_REQUEST_TIMEOUT_SECS"));
}
