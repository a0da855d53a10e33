//! Control surface — Axum JSON API for the host process.
//!
//! Lets an operator trigger workflows on demand, add one-shot schedule
//! entries, and read scheduler health. CORS is permissive; nothing else
//! is exposed.

pub mod routes;

use anyhow::Result;
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tracing::info;

use routes::AppState;

/// Start the control server.
///
/// This spawns a background task — it doesn't block.
pub fn spawn_control(state: AppState, port: u16) -> Result<()> {
    let app = build_router(state);

    tokio::spawn(async move {
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
        info!(port, "Control server starting on http://localhost:{port}");

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .expect("Failed to bind control port");

        axum::serve(listener, app)
            .await
            .expect("Control server error");
    });

    Ok(())
}

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin("*".parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(routes::banner))
        .route("/api/post-now", post(routes::post_now))
        .route("/api/respond-now", post(routes::respond_now))
        .route("/api/schedule", post(routes::schedule))
        .route("/api/health", get(routes::health))
        .layer(cors)
        .with_state(state)
}
