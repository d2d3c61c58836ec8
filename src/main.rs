use storefront_session::config::SessionConfig;
use storefront_session::routes;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let config = match SessionConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };
    if config.api_base_url.is_none() {
        tracing::warn!("API_BASE_URL not set, session hydration and /api proxy disabled");
    }

    let port = config.port;
    let state = routes::AppState::from_config(config).expect("backend client init failed");
    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "storefront session server listening");
    axum::serve(listener, app).await.expect("server failed");
}
