mod domain;
mod inbound;
mod outbound;
mod usecase;

use std::sync::Arc;

use app_core::config::Config;
use app_core::oauth::OAuthManager;
use app_core::password::Hasher;
pub use inbound::router::create_router;
pub use inbound::state::{AuthMode, AuthState};
use sea_orm::DatabaseConnection;
use tower_cookies::Key;

use crate::outbound::orm::AuthORM;
use crate::usecase::authn::AuthnService;

pub struct Dependency {
    pub config: Arc<Config>,
    pub db: Arc<DatabaseConnection>,
    pub hasher: Arc<dyn Hasher>,
    pub oauth: OAuthManager,
    pub cookie_key: Key,
    pub mode: AuthMode,
}

pub fn new(dep: Dependency) -> Result<AuthState, minijinja::Error> {
    let repo = Arc::new(AuthORM::new(dep.db));
    let providers: Vec<String> = dep.oauth.provider_names().into_iter().map(str::to_string).collect();

    let authn_svc = Arc::new(AuthnService::new(dep.hasher, dep.oauth, repo));

    let views = inbound::views::views()?;

    Ok(AuthState::new(dep.mode, dep.config, dep.cookie_key, views, providers, authn_svc))
}
