//! Page routes

pub mod auth;
pub mod chat;

use std::sync::Arc;

use crate::api::state::AppState;
use axum::Router;

type SharedState = Arc<AppState>;

/// Create the combined page router
pub fn router() -> Router<SharedState> {
    Router::new()
        // Landing redirect, login and registration
        .merge(auth::router())
        // Conversation and logout
        .merge(chat::router())
}
