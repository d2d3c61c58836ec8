use super::*;
use crate::guard::{GuardDecision, GuardState};
use crate::transport::test_helpers::{ScriptedTransport, access_expired, refreshed, user_ok};
use crate::transport::{IDENTITY_ENDPOINT, REFRESH_ENDPOINT};
use serde_json::json;

#[tokio::test]
async fn server_runtime_allows_and_never_refreshes() {
    let transport = Arc::new(
        ScriptedTransport::new().on("/orders", Err(access_expired())).on(REFRESH_ENDPOINT, refreshed(&[])),
    );
    let runtime = SessionRuntime::server(Arc::clone(&transport) as Arc<dyn Transport>, "access_token=a", "/login");

    assert_eq!(runtime.context, RuntimeContext::Server);
    assert!(runtime.coordinator.is_none());
    assert_eq!(runtime.guard.check(Some("/mypage")).await, GuardDecision::Allow);
    assert!(runtime.gateway.get("/orders", &[]).await.is_err());
    assert_eq!(transport.calls_to(REFRESH_ENDPOINT), 0);
}

#[tokio::test]
async fn client_runtime_shares_one_coordinator() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .on("/orders", Err(access_expired()))
            .on_retry("/orders", user_ok(1))
            .on(REFRESH_ENDPOINT, refreshed(&[])),
    );
    let hint = Arc::new(MemoryLoginHint::default());
    let store = Arc::new(SessionStore::from_hydrated(SessionRecord::authenticated(json!({ "id": 1 })), hint));
    let runtime = SessionRuntime::client(Arc::clone(&transport) as Arc<dyn Transport>, store, "/login");

    runtime.gateway.get("/orders", &[]).await.unwrap();

    assert_eq!(runtime.coordinator.as_ref().map(|c| c.issued()), Some(1));
}

#[tokio::test]
async fn client_runtime_guard_uses_client_store() {
    let transport = Arc::new(ScriptedTransport::new().on(IDENTITY_ENDPOINT, user_ok(1)));
    let store = Arc::new(SessionStore::client(Arc::new(MemoryLoginHint::default())));
    let runtime = SessionRuntime::client(Arc::clone(&transport) as Arc<dyn Transport>, store, "/signin");

    assert_eq!(runtime.guard.evaluate(), GuardState::Deny);
    assert_eq!(runtime.guard.check(None).await, GuardDecision::Redirect("/signin".into()));
}

#[test]
fn client_from_config_seeds_store_from_payload() {
    let runtime =
        SessionRuntime::client_from_config(&SessionConfig::default(), Some(SessionRecord::authenticated(json!({ "id": 3 }))))
            .unwrap();

    assert_eq!(runtime.context, RuntimeContext::Client);
    assert!(runtime.store.is_authenticated());
    assert!(runtime.store.hint_is_set());
}
