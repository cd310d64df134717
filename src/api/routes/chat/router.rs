//! Router for the chat page

use std::sync::Arc;

use axum::{
    Form, Router,
    extract::State,
    response::{Html, IntoResponse, Redirect},
    routing::{get, post},
};

use super::public;
use crate::api::public::ApiError;
use crate::api::state::AppState;
use crate::api::templates::Page;

type SharedState = Arc<AppState>;

async fn chat_page(State(state): State<SharedState>) -> Result<Html<String>, ApiError> {
    let controller = &state.controller;
    let page = public::ChatPage::new(
        &controller.session(),
        &controller.messages(),
        controller.is_loading(),
        controller.persistence_failed(),
        controller.draft(),
    );
    let html = state.templates.render(&Page::Chat.to_string(), &page)?;
    Ok(Html(html))
}

/// Ask a question and wait for the reply before going back to the
/// page. Blank or rejected questions just reload it.
async fn chat_submit(
    State(state): State<SharedState>,
    Form(form): Form<public::ChatForm>,
) -> impl IntoResponse {
    let controller = &state.controller;
    controller.set_draft(&form.text);
    if controller.submit(&form.text).await.is_none() {
        tracing::debug!("Question was not sent");
    }
    Redirect::to("/chat#latest")
}

async fn logout(State(state): State<SharedState>) -> impl IntoResponse {
    state.controller.logout().await;
    Redirect::to("/chat")
}

/// Create the chat router
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/chat", get(chat_page).post(chat_submit))
        .route("/logout", post(logout))
}
