use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use oddword::{
    api,
    config::AppConfig,
    participant::{LlmParticipant, OfflineParticipant, ParticipantBrain},
    state::AppState,
    ws,
};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "oddword=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting oddword...");

    let config = AppConfig::from_env();

    // Initialize LLM providers
    let brain: Arc<dyn ParticipantBrain> = match config.llm.build_manager() {
        Ok(manager) => {
            tracing::info!("LLM providers initialized successfully");
            Arc::new(LlmParticipant::new(
                Arc::new(manager),
                config.llm.participant_model.clone(),
                config.llm.default_max_tokens,
                config.game.participant_timeout,
            ))
        }
        Err(e) => {
            tracing::warn!(
                "Failed to initialize LLM providers: {}. The participant will use canned moves.",
                e
            );
            Arc::new(OfflineParticipant)
        }
    };

    let state = Arc::new(AppState::new(config.game, brain));

    let app = Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/api/rooms", post(api::create_room))
        .route("/api/rooms/{code}", get(api::room_status))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on http://{}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
    }
}
