use std::sync::Arc;

use app_core::error::AppError;
use app_core::oauth::{OAuthError, OAuthManager};
use app_core::password::Hasher;
use async_trait::async_trait;
use uuid::Uuid;
use validator::Validate;

use crate::domain::entity::user::{FederatedProfile, NewUser, Provider, User, normalize_email};
use crate::domain::inout::prelude::*;
use crate::outbound::repository::AuthRepository;

const INVALID_CREDENTIALS_MSG: &str = "Invalid email or password";
const EMAIL_EXISTS_MSG: &str = "A user with this email already exists";

#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait AuthnUseCase: Send + Sync {
    async fn register(&self, input: RegisterInput) -> Result<RegisterOutput, AppError>;
    async fn login(&self, input: LoginInput) -> Result<LoginOutput, AppError>;
    async fn session_user(&self, user_id: Uuid) -> Result<Option<User>, AppError>;
    async fn oauth_login(&self, input: OAuthLoginInput) -> Result<OAuthLoginOutput, AppError>;
    async fn oauth_callback(&self, input: OAuthCallbackInput) -> Result<OAuthCallbackOutput, AppError>;
}

#[derive(Clone)]
pub struct AuthnService {
    hasher: Arc<dyn Hasher>,
    oauth: OAuthManager,
    repo: Arc<dyn AuthRepository>,
}

impl AuthnService {
    pub fn new(hasher: Arc<dyn Hasher>, oauth: OAuthManager, repo: Arc<dyn AuthRepository>) -> Self {
        Self { hasher, oauth, repo }
    }

    /// Checks credentials against the stored password. Unknown emails and
    /// provider-only accounts fail the same way as a wrong password.
    async fn authenticate_user(&self, email: &str, password: &str) -> Result<User, AppError> {
        let user = self
            .repo
            .find_user_by_email(email)
            .await?
            .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS_MSG.to_string()))?;

        let Some(stored) = user.password.as_deref() else {
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS_MSG.to_string()));
        };

        if !self.hasher.verify(password, stored)? {
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS_MSG.to_string()));
        }

        Ok(user)
    }

    fn parse_provider(name: &str) -> Result<Provider, AppError> {
        name.parse::<Provider>()
            .map_err(|_| AppError::OAuth(OAuthError::ProviderNotFound(name.to_string())))
    }
}

#[async_trait]
impl AuthnUseCase for AuthnService {
    async fn register(&self, input: RegisterInput) -> Result<RegisterOutput, AppError> {
        input.validate()?;

        let email = normalize_email(&input.username);

        if self.repo.find_user_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict(EMAIL_EXISTS_MSG.to_string()));
        }

        let new_user = NewUser { id: Uuid::new_v4(), email, password: self.hasher.hash(&input.password)? };

        let user = self.repo.create_user(&new_user).await?;
        tracing::info!(user_id = %user.id, "user registered");

        Ok(RegisterOutput { user })
    }

    async fn login(&self, input: LoginInput) -> Result<LoginOutput, AppError> {
        input.validate()?;

        let email = normalize_email(&input.username);
        let user = self.authenticate_user(&email, &input.password).await?;

        Ok(LoginOutput { user })
    }

    async fn session_user(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        self.repo.find_user_by_id(user_id).await
    }

    async fn oauth_login(&self, input: OAuthLoginInput) -> Result<OAuthLoginOutput, AppError> {
        input.validate()?;

        let oauth_provider = self.oauth.get_provider(&input.provider)?;

        let auth_detail = oauth_provider.get_authorization_details();

        Ok(OAuthLoginOutput {
            auth_url: auth_detail.url,
            csrf_token: auth_detail.csrf_token.secret().to_string(),
            pkce_verifier: auth_detail.pkce_verifier.secret().to_string(),
        })
    }

    async fn oauth_callback(&self, input: OAuthCallbackInput) -> Result<OAuthCallbackOutput, AppError> {
        input.validate()?;

        let provider = Self::parse_provider(&input.provider)?;
        let oauth_provider = self.oauth.get_provider(&input.provider)?;

        let provider_access_token = oauth_provider.exchange_code(input.code, input.pkce_verifier_secret).await?;
        let profile = oauth_provider.get_user_profile(&provider_access_token).await?;

        let federated = FederatedProfile {
            provider,
            provider_user_id: profile.provider_user_id,
            email: profile.email.as_deref().map(normalize_email).filter(|e| !e.is_empty()),
        };

        let user = self.repo.find_or_create_federated_user(federated).await?;
        tracing::info!(
            user_id = %user.id,
            provider = %provider,
            provider_id = ?user.provider_id(provider),
            "federated sign-in"
        );

        Ok(OAuthCallbackOutput { user })
    }
}
