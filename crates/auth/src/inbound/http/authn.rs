use app_core::error::AppError;
use app_core::extractors::{AppForm, AppPath, AppQuery};
use axum::debug_handler;
use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};
use minijinja::context;
use tower_cookies::cookie::{SameSite, time};
use tower_cookies::{Cookie, Cookies};

use crate::domain::entity::user::User;
use crate::domain::inout::prelude::*;
use crate::inbound::model::prelude::*;
use crate::inbound::session;
use crate::inbound::state::{AuthMode, AuthState};

const COOKIE_OAUTH_STATE: &str = "__oauth_state";
const OAUTH_STATE_MINUTES: i64 = 3;

#[debug_handler]
pub async fn register(
    State(state): State<AuthState>,
    cookies: Cookies,
    AppForm(form): AppForm<CredentialsForm>,
) -> Response {
    let username = form.username.clone();

    let result = state
        .authn
        .register(RegisterInput { username: form.username, password: form.password })
        .await
        .and_then(|output| signed_in(&state, &cookies, &output.user));

    match result {
        Ok(response) => response,
        Err(err) => form_error(&state, "register.html", &username, err),
    }
}

#[debug_handler]
pub async fn login(State(state): State<AuthState>, cookies: Cookies, AppForm(form): AppForm<CredentialsForm>) -> Response {
    let username = form.username.clone();

    let result = state
        .authn
        .login(LoginInput { username: form.username, password: form.password })
        .await
        .and_then(|output| signed_in(&state, &cookies, &output.user));

    match result {
        Ok(response) => response,
        Err(err) => form_error(&state, "login.html", &username, err),
    }
}

#[debug_handler]
pub async fn logout(State(state): State<AuthState>, cookies: Cookies) -> Redirect {
    session::end(&cookies, &state);
    Redirect::to("/")
}

#[debug_handler]
pub async fn oauth_login(
    State(state): State<AuthState>,
    cookies: Cookies,
    AppPath(provider): AppPath<String>,
) -> Result<Redirect, AppError> {
    let output = state.authn.oauth_login(OAuthLoginInput { provider: provider.clone() }).await?;

    let value = serde_json::to_string(&OAuthStateCookie {
        provider,
        csrf_token: output.csrf_token,
        pkce_verifier: output.pkce_verifier,
    })?;

    let cookie = Cookie::build((COOKIE_OAUTH_STATE, value))
        .http_only(true)
        .secure(state.session().secure)
        .path("/")
        .max_age(time::Duration::minutes(OAUTH_STATE_MINUTES))
        .same_site(SameSite::Lax)
        .build();

    cookies.private(&state.cookie_key).add(cookie);

    Ok(Redirect::to(&output.auth_url))
}

/// Provider redirect target. Any failure sends the browser back to `/login`.
#[debug_handler]
pub async fn oauth_callback(
    State(state): State<AuthState>,
    cookies: Cookies,
    AppPath(provider): AppPath<String>,
    query: Result<AppQuery<OAuthCallbackRequest>, AppError>,
) -> Response {
    let query = query.map(|AppQuery(query)| query);

    let result = complete_oauth(&state, &cookies, provider, query)
        .await
        .and_then(|output| signed_in(&state, &cookies, &output.user));

    match result {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!("OAuth callback failed: {:?}", err);
            Redirect::to("/login").into_response()
        },
    }
}

async fn complete_oauth(
    state: &AuthState,
    cookies: &Cookies,
    provider: String,
    query: Result<OAuthCallbackRequest, AppError>,
) -> Result<OAuthCallbackOutput, AppError> {
    let private = cookies.private(&state.cookie_key);
    let stored = private.get(COOKIE_OAUTH_STATE);
    private.remove(Cookie::build((COOKIE_OAUTH_STATE, "")).path("/").build());

    let query = query?;

    if let Some(err) = query.error {
        return Err(AppError::Forbidden(format!("OAuth authentication failed: {err}")));
    }

    let code = query
        .code
        .ok_or_else(|| AppError::Forbidden("Missing authorization code".to_string()))?;

    let stored = stored.ok_or_else(|| AppError::Forbidden("OAuth session expired or invalid".to_string()))?;

    let oauth_state: OAuthStateCookie = serde_json::from_str(stored.value())
        .map_err(|_| AppError::Forbidden("Invalid OAuth state format".to_string()))?;

    if oauth_state.provider != provider || query.state.as_deref() != Some(oauth_state.csrf_token.as_str()) {
        return Err(AppError::Forbidden("Invalid OAuth state token".to_string()));
    }

    state
        .authn
        .oauth_callback(OAuthCallbackInput { provider, code, pkce_verifier_secret: oauth_state.pkce_verifier })
        .await
}

/// Acknowledges a successful sign-in the way the auth mode asks for.
fn signed_in(state: &AuthState, cookies: &Cookies, user: &User) -> Result<Response, AppError> {
    match state.mode {
        AuthMode::Direct => {
            let html = state.views.render("secrets.html", context! { user => user.display_name() })?;
            Ok(html.into_response())
        },
        AuthMode::Session => {
            session::start(cookies, state, user.id);
            Ok(Redirect::to("/secrets").into_response())
        },
    }
}

/// Re-renders a credentials form for failures the user can correct. Anything
/// else falls through to the error page.
fn form_error(state: &AuthState, template: &str, username: &str, err: AppError) -> Response {
    let status = err.status();
    let message = match &err {
        AppError::Validation(errors) => AppError::validation_message(errors),
        AppError::Conflict(msg) | AppError::Unauthorized(msg) => msg.clone(),
        _ => return err.into_response(),
    };

    let ctx = context! { error => message, username, providers => &state.providers };
    match state.views.render(template, ctx) {
        Ok(html) => (status, html).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}
