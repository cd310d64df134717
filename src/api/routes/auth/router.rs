//! Router for signing in, registering and the landing redirect

use std::sync::Arc;

use axum::{
    Form, Router,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};

use super::public;
use crate::api::public::ApiError;
use crate::api::state::AppState;
use crate::api::templates::Page;
use crate::identity::AuthError;

type SharedState = Arc<AppState>;

fn render(state: &AppState, page: Page, ctx: &public::AuthPage) -> Result<Html<String>, ApiError> {
    Ok(Html(state.templates.render(&page.to_string(), ctx)?))
}

fn log_auth_error(action: &str, err: &AuthError) {
    match err {
        AuthError::Storage(e) => tracing::error!("{} failed: {}", action, e),
        e => tracing::debug!("{} rejected: {}", action, e),
    }
}

async fn index() -> Redirect {
    Redirect::to("/chat")
}

async fn login_page(State(state): State<SharedState>) -> Result<Html<String>, ApiError> {
    render(&state, Page::Login, &public::AuthPage::default())
}

async fn login(
    State(state): State<SharedState>,
    Form(form): Form<public::CredentialsForm>,
) -> Result<Response, ApiError> {
    match state.identity.sign_in(&form.email, &form.password).await {
        Ok(_) => Ok(Redirect::to("/chat").into_response()),
        Err(e) => {
            log_auth_error("Sign in", &e);
            let ctx = public::AuthPage {
                error: Some(public::LOGIN_FAILED),
                email: form.email,
            };
            let html = render(&state, Page::Login, &ctx)?;
            Ok((StatusCode::UNAUTHORIZED, html).into_response())
        }
    }
}

async fn register_page(State(state): State<SharedState>) -> Result<Html<String>, ApiError> {
    render(&state, Page::Register, &public::AuthPage::default())
}

async fn register(
    State(state): State<SharedState>,
    Form(form): Form<public::CredentialsForm>,
) -> Result<Response, ApiError> {
    match state.identity.sign_up(&form.email, &form.password).await {
        Ok(_) => Ok(Redirect::to("/chat").into_response()),
        Err(e) => {
            log_auth_error("Registration", &e);
            let ctx = public::AuthPage {
                error: Some(public::REGISTRATION_FAILED),
                email: form.email,
            };
            let html = render(&state, Page::Register, &ctx)?;
            Ok((StatusCode::BAD_REQUEST, html).into_response())
        }
    }
}

/// Create the auth router
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(index))
        .route("/login", get(login_page).post(login))
        .route("/register", get(register_page).post(register))
}
