use std::sync::Arc;

use app_core::config::Config;
use app_core::view::Views;
use serde::Deserialize;
use tower_cookies::Key;

use crate::usecase::authn::AuthnUseCase;

/// How a successful register or login is acknowledged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Render the secrets page in the same response. No session is kept.
    Direct,
    /// Start a cookie session and redirect to `/secrets`.
    #[default]
    Session,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub max_age_secs: i64,
    pub secure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { max_age_secs: 86_400, secure: false }
    }
}

impl SessionConfig {
    /// Reads the `session.*` keys. Invalid values fall back to the defaults.
    pub fn from_config(config: &Config) -> Self {
        let default = Self::default();

        let max_age_secs = config
            .get_or("session.max_age_secs", default.max_age_secs)
            .unwrap_or_else(|err| {
                tracing::warn!("invalid session.max_age_secs: {err}");
                default.max_age_secs
            });
        let secure = config.get_or("session.secure", default.secure).unwrap_or_else(|err| {
            tracing::warn!("invalid session.secure: {err}");
            default.secure
        });

        Self { max_age_secs, secure }
    }
}

#[derive(Clone)]
pub struct AuthState {
    pub mode: AuthMode,
    pub config: Arc<Config>,
    pub cookie_key: Key,
    pub views: Views,
    /// Names of the configured OAuth providers, shown as sign-in buttons.
    pub providers: Vec<String>,
    pub authn: Arc<dyn AuthnUseCase>,
}

impl AuthState {
    pub fn new(
        mode: AuthMode,
        config: Arc<Config>,
        cookie_key: Key,
        views: Views,
        providers: Vec<String>,
        authn: Arc<dyn AuthnUseCase>,
    ) -> Self {
        Self { mode, config, cookie_key, views, providers, authn }
    }

    /// Current session settings. Read per request so a reloaded config file
    /// applies without a restart.
    pub fn session(&self) -> SessionConfig {
        SessionConfig::from_config(&self.config)
    }
}
