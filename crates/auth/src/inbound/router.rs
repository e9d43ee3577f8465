use axum::Router;
use axum::routing::get;

use crate::inbound::http::authn::*;
use crate::inbound::http::pages::*;
use crate::inbound::state::AuthState;

/// Page and form routes. The caller adds the `CookieManagerLayer` that the
/// session and OAuth handlers depend on.
pub fn create_router(state: AuthState) -> Router {
    let page_routes = Router::new()
        .route("/", get(home))
        .route("/register", get(register_page).post(register))
        .route("/login", get(login_page).post(login))
        .route("/secrets", get(secrets))
        .route("/logout", get(logout));

    let oauth_routes = Router::new()
        .route("/auth/{provider}", get(oauth_login))
        .route("/auth/{provider}/secrets", get(oauth_callback));

    Router::new().merge(page_routes).merge(oauth_routes).with_state(state)
}
