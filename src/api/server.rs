use std::sync::Arc;

use anyhow::{Context, Result};
use axum::middleware;
use axum::{Router, extract::Request, response::Response};
use http::{HeaderValue, header};
use tower_http::trace::TraceLayer;

use super::routes;
use crate::api::state::AppState;
use crate::core::{AppConfig, db::async_db};

// Pages reflect live conversation state and must never be cached
async fn set_no_cache(request: Request, next: middleware::Next) -> Response {
    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

pub fn app(shared_state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::router())
        .layer(middleware::from_fn(set_no_cache))
        .layer(TraceLayer::new_for_http())
        .with_state(shared_state)
}

// Run the server
pub async fn serve(host: String, port: String, config: AppConfig) -> Result<()> {
    let db = async_db(&config.db_path)
        .await
        .with_context(|| format!("Failed to open database at {}", config.db_path))?;

    let shared_state = Arc::new(AppState::new(db, config));
    let app = app(Arc::clone(&shared_state));

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port)).await?;

    tracing::info!("Server started. Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    shared_state.controller.teardown();

    Ok(())
}
