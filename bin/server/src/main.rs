use cognito_gate_server::{config::ServerConfig, pages};
use cognito_gate_web::CognitoGate;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().expect("failed to load configuration");
    tracing::info!("Loaded configuration");

    let provider = config
        .cognito
        .into_config()
        .expect("invalid identity provider configuration");

    let gate = CognitoGate::with_memory_store(provider, config.gate)
        .expect("invalid gate configuration");

    // Spawn periodic session cleanup task
    gate.spawn_session_cleanup();

    let app = pages::router(&gate).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .expect("failed to bind to address");

    tracing::info!("listening on http://{}", config.bind_address);

    axum::serve(listener, app.into_make_service())
        .await
        .expect("server error");
}
