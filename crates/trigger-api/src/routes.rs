//! Router setup with the fulfillment routes and middleware.
//!
//! Configures the axum Router with permissive CORS, request tracing, static
//! assets under `/public`, and the fulfillment and health handlers.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use trigger_core::config::ServerConfig;
use trigger_core::error::TriggerError;

use crate::handlers;
use crate::state::AppState;

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // Widgets are loaded into the agent desktop from another origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", post(handlers::fulfill))
        .route("/health", get(handlers::health))
        .nest_service("/public", ServeDir::new(&state.public_dir))
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind `config.addr()` and serve until the process is terminated.
pub async fn start_server(config: &ServerConfig, state: AppState) -> Result<(), TriggerError> {
    let addr = config.addr();
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| TriggerError::Api(format!("Failed to bind {}: {}", addr, e)))?;
    let local = listener
        .local_addr()
        .map_err(|e| TriggerError::Api(format!("Failed to read bound address: {}", e)))?;

    tracing::info!(addr = %local, "Fulfillment server listening");

    axum::serve(listener, router)
        .await
        .map_err(|e| TriggerError::Api(format!("Server error: {}", e)))?;

    Ok(())
}
