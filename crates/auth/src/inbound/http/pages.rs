use app_core::error::AppError;
use axum::debug_handler;
use axum::extract::State;
use axum::response::Html;
use minijinja::context;

use crate::inbound::session::CurrentUser;
use crate::inbound::state::AuthState;

#[debug_handler]
pub async fn home(State(state): State<AuthState>) -> Result<Html<String>, AppError> {
    Ok(state.views.render("home.html", context! {})?)
}

#[debug_handler]
pub async fn login_page(State(state): State<AuthState>) -> Result<Html<String>, AppError> {
    Ok(state.views.render("login.html", context! { providers => state.providers })?)
}

#[debug_handler]
pub async fn register_page(State(state): State<AuthState>) -> Result<Html<String>, AppError> {
    Ok(state.views.render("register.html", context! { providers => state.providers })?)
}

#[debug_handler]
pub async fn secrets(State(state): State<AuthState>, CurrentUser(user): CurrentUser) -> Result<Html<String>, AppError> {
    Ok(state.views.render("secrets.html", context! { user => user.display_name() })?)
}
