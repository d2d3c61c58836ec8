use super::*;
use axum::response::AppendHeaders;
use axum::routing::post;

// =============================================================================
// Backend double
// =============================================================================

async fn backend_me(headers: HeaderMap) -> Response {
    let cookie = headers.get(COOKIE).and_then(|v| v.to_str().ok()).unwrap_or_default();
    if cookie.contains("access_token=fresh") || cookie.contains("access_token=valid") {
        Json(json!({ "success": true, "data": { "id": 1, "name": "kim" } })).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "data": { "error": { "code": "AUTH_016", "message": "expired" } } })),
        )
            .into_response()
    }
}

async fn backend_refresh() -> impl IntoResponse {
    (
        AppendHeaders([
            (SET_COOKIE, "access_token=fresh; Secure; SameSite=None; Path=/api; Domain=internal.example.com"),
            (SET_COOKIE, "refresh_token=rotated; HttpOnly; Secure; Path=/api"),
        ]),
        Json(json!({ "success": true })),
    )
}

async fn backend_orders(RawQuery(query): RawQuery, headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    (
        StatusCode::CREATED,
        AppendHeaders([(SET_COOKIE, "cart=1; Secure; Domain=internal.example.com")]),
        Json(json!({
            "query": query,
            "cookie": headers.get(COOKIE).and_then(|v| v.to_str().ok()),
            "body": String::from_utf8_lossy(&body),
        })),
    )
}

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

async fn spawn_front(with_backend: bool) -> String {
    let mut config = SessionConfig::default();
    if with_backend {
        let backend = Router::new()
            .route("/users/me", get(backend_me))
            .route("/auth/refresh", post(backend_refresh))
            .route("/orders", post(backend_orders));
        config.api_base_url = Some(serve(backend).await);
    }
    serve(app(AppState::from_config(config).unwrap())).await
}

fn set_cookies(response: &reqwest::Response) -> Vec<String> {
    response.headers().get_all(SET_COOKIE).iter().map(|v| v.to_str().unwrap().to_owned()).collect()
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn healthz_is_ok() {
    let front = spawn_front(false).await;
    let response = reqwest::get(format!("{front}/healthz")).await.unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn session_without_cookies_is_default() {
    let front = spawn_front(true).await;
    let response = reqwest::get(format!("{front}/session")).await.unwrap();

    assert!(set_cookies(&response).is_empty());
    let record: SessionRecord = response.json().await.unwrap();
    assert_eq!(record, SessionRecord::default());
}

#[tokio::test]
async fn session_with_valid_cookie_is_authenticated() {
    let front = spawn_front(true).await;
    let response = reqwest::Client::new()
        .get(format!("{front}/session"))
        .header(COOKIE, "access_token=valid")
        .send()
        .await
        .unwrap();

    let record: SessionRecord = response.json().await.unwrap();
    assert!(record.is_authenticated);
    assert_eq!(record.user.unwrap()["name"], "kim");
}

#[tokio::test]
async fn session_refreshes_and_relays_rewritten_cookies() {
    let front = spawn_front(true).await;
    let response = reqwest::Client::new()
        .get(format!("{front}/session"))
        .header(COOKIE, "access_token=stale; refresh_token=r1")
        .send()
        .await
        .unwrap();

    assert_eq!(
        set_cookies(&response),
        vec![
            "access_token=fresh; SameSite=Lax; Path=/".to_owned(),
            "refresh_token=rotated; HttpOnly; SameSite=Lax; Path=/".to_owned(),
        ]
    );
    let record: SessionRecord = response.json().await.unwrap();
    assert!(record.is_authenticated);
}

#[tokio::test]
async fn session_without_backend_skips_hydration() {
    let front = spawn_front(false).await;
    let response = reqwest::Client::new()
        .get(format!("{front}/session"))
        .header(COOKIE, "access_token=valid")
        .send()
        .await
        .unwrap();

    let record: SessionRecord = response.json().await.unwrap();
    assert_eq!(record, SessionRecord::default());
}

#[tokio::test]
async fn proxy_relays_status_body_and_rewritten_cookies() {
    let front = spawn_front(true).await;
    let response = reqwest::Client::new()
        .post(format!("{front}/api/orders?page=2"))
        .header(COOKIE, "access_token=valid")
        .header(CONTENT_TYPE, "application/json")
        .body(r#"{"qty":1}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 201);
    assert_eq!(set_cookies(&response), vec!["cart=1; SameSite=Lax; Path=/".to_owned()]);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["query"], "page=2");
    assert_eq!(body["cookie"], "access_token=valid");
    assert_eq!(body["body"], r#"{"qty":1}"#);
}

#[tokio::test]
async fn proxy_relays_backend_errors_verbatim() {
    let front = spawn_front(true).await;
    let response = reqwest::get(format!("{front}/api/users/me")).await.unwrap();

    assert_eq!(response.status(), 401);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["data"]["error"]["code"], "AUTH_016");
}

#[tokio::test]
async fn proxy_without_backend_is_unavailable() {
    let front = spawn_front(false).await;
    let response = reqwest::get(format!("{front}/api/users/me")).await.unwrap();
    assert_eq!(response.status(), 503);
}
