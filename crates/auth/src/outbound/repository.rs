use app_core::error::AppError;
use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::entity::user::{FederatedProfile, NewUser, User};

#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait AuthRepository: Send + Sync {
    /// Finds a single user by their unique ID.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(User))` if a matching user is found.
    /// * `Ok(None)` if no user matches the given ID.
    /// * `Err(AppError)` if a database error occurs.
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    /// Finds a single user by their (already normalized) email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Inserts a local-credential user.
    ///
    /// # Errors
    ///
    /// * `AppError::Conflict` if the email is already taken.
    /// * `AppError::Database` for any other database failure.
    async fn create_user(&self, user: &NewUser) -> Result<User, AppError>;

    /// Resolves the user behind a provider identity.
    ///
    /// Lookup order: the provider's id column, then the email (linking the
    /// provider id onto that user), and finally a brand new user carrying
    /// only the provider id and email.
    async fn find_or_create_federated_user(&self, profile: FederatedProfile) -> Result<User, AppError>;
}
