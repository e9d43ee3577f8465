//! Cookie-backed login sessions.
//!
//! The session is a private (encrypted and authenticated) cookie holding the
//! user id and the time it was issued. Nothing is stored server side; logging
//! out drops the cookie and a session older than `session.max_age_secs` is
//! refused.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Redirect, Response};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_cookies::cookie::{SameSite, time};
use tower_cookies::{Cookie, Cookies};
use uuid::Uuid;

use crate::domain::entity::user::User;
use crate::inbound::state::{AuthMode, AuthState};

pub const SESSION_COOKIE: &str = "__session";

/// Payload of the session cookie.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    pub user_id: Uuid,
    /// Unix seconds.
    pub issued_at: i64,
}

impl SessionClaims {
    fn is_live(&self, now: i64, max_age_secs: i64) -> bool {
        let age = now - self.issued_at;
        (0..max_age_secs).contains(&age)
    }
}

pub fn start(cookies: &Cookies, state: &AuthState, user_id: Uuid) {
    let settings = state.session();
    let claims = SessionClaims { user_id, issued_at: Utc::now().timestamp() };

    let value = match serde_json::to_string(&claims) {
        Ok(value) => value,
        Err(err) => {
            tracing::error!("failed to encode session: {err}");
            return;
        },
    };

    let cookie = Cookie::build((SESSION_COOKIE, value))
        .http_only(true)
        .secure(settings.secure)
        .path("/")
        .max_age(time::Duration::seconds(settings.max_age_secs))
        .same_site(SameSite::Lax)
        .build();

    cookies.private(&state.cookie_key).add(cookie);
}

pub fn end(cookies: &Cookies, state: &AuthState) {
    cookies
        .private(&state.cookie_key)
        .remove(Cookie::build((SESSION_COOKIE, "")).path("/").build());
}

/// The user id of the current session, if the cookie is present, intact and
/// not older than the configured max age. An expired cookie is dropped.
pub fn user_id(cookies: &Cookies, state: &AuthState) -> Option<Uuid> {
    let cookie = cookies.private(&state.cookie_key).get(SESSION_COOKIE)?;
    let claims: SessionClaims = serde_json::from_str(cookie.value()).ok()?;

    if !claims.is_live(Utc::now().timestamp(), state.session().max_age_secs) {
        tracing::debug!(user_id = %claims.user_id, "session expired");
        end(cookies, state);
        return None;
    }

    Some(claims.user_id)
}

/// The signed-in user. Handlers taking this extractor are only reachable with
/// a live session; everyone else is sent to `/login`.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<AuthState> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AuthState) -> Result<Self, Self::Rejection> {
        if state.mode == AuthMode::Direct {
            return Err(to_login());
        }

        let cookies = Cookies::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        let Some(id) = user_id(&cookies, state) else {
            return Err(to_login());
        };

        match state.authn.session_user(id).await {
            Ok(Some(user)) => Ok(CurrentUser(user)),
            Ok(None) => {
                tracing::warn!(user_id = %id, "session refers to a missing user");
                end(&cookies, state);
                Err(to_login())
            },
            Err(err) => Err(err.into_response()),
        }
    }
}

fn to_login() -> Response {
    Redirect::to("/login").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_claims_is_live() {
        let claims = SessionClaims { user_id: Uuid::new_v4(), issued_at: 1_000 };

        assert!(claims.is_live(1_000, 60));
        assert!(claims.is_live(1_059, 60));
        assert!(!claims.is_live(1_060, 60));
        assert!(!claims.is_live(5_000, 60));
        assert!(!claims.is_live(999, 60));
    }
}
