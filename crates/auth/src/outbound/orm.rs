use std::sync::Arc;

use app_core::error::AppError;
use app_orm::prelude::Users;
use app_orm::users;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    SqlErr, TransactionTrait,
};
use uuid::Uuid;

use super::repository::AuthRepository;
use crate::domain::entity::user::{FederatedProfile, NewUser, Provider, User};

/// `AuthORM` is the sea-orm backed implementation of [`AuthRepository`].
///
/// It maps `users::Model` rows into domain [`User`] values and keeps the
/// provider id columns in sync when a federated sign-in links to an
/// existing account.
pub struct AuthORM {
    db: Arc<DatabaseConnection>,
}

impl AuthORM {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    fn to_user(&self, model: users::Model) -> User {
        User {
            id: model.id,
            email: model.email,
            password: model.password,
            google_id: model.google_id,
            github_id: model.github_id,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }

    fn provider_column(provider: Provider) -> users::Column {
        match provider {
            Provider::Google => users::Column::GoogleId,
            Provider::GitHub => users::Column::GithubId,
        }
    }

    /// Sets the id column for `provider` on an active model.
    fn set_provider_id(model: &mut users::ActiveModel, provider: Provider, provider_user_id: String) {
        match provider {
            Provider::Google => model.google_id = ActiveValue::Set(Some(provider_user_id)),
            Provider::GitHub => model.github_id = ActiveValue::Set(Some(provider_user_id)),
        }
    }

    fn map_insert_error(err: DbErr, what: &str) -> AppError {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                tracing::warn!("unique violation while creating {what}: {detail}");
                AppError::Conflict(format!("{what} already exists"))
            },
            _ => AppError::Database(err),
        }
    }

    async fn find_by_provider_id<C>(
        &self,
        db: &C,
        provider: Provider,
        provider_user_id: &str,
    ) -> Result<Option<users::Model>, AppError>
    where
        C: ConnectionTrait + Send + Sync,
    {
        let model = Users::find()
            .filter(Self::provider_column(provider).eq(provider_user_id))
            .one(db)
            .await?;

        Ok(model)
    }
}

#[async_trait]
impl AuthRepository for AuthORM {
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let model = Users::find_by_id(id).one(self.db.as_ref()).await?;

        Ok(model.map(|m| self.to_user(m)))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let model = Users::find()
            .filter(users::Column::Email.eq(email))
            .one(self.db.as_ref())
            .await?;

        Ok(model.map(|m| self.to_user(m)))
    }

    async fn create_user(&self, user: &NewUser) -> Result<User, AppError> {
        let now = Utc::now().fixed_offset();

        let active = users::ActiveModel {
            id: ActiveValue::Set(user.id),
            email: ActiveValue::Set(Some(user.email.clone())),
            password: ActiveValue::Set(Some(user.password.clone())),
            google_id: ActiveValue::Set(None),
            github_id: ActiveValue::Set(None),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
        };

        let model = Users::insert(active)
            .exec_with_returning(self.db.as_ref())
            .await
            .map_err(|err| Self::map_insert_error(err, "User"))?;

        Ok(self.to_user(model))
    }

    async fn find_or_create_federated_user(&self, profile: FederatedProfile) -> Result<User, AppError> {
        let txn = self.db.begin().await?;

        if let Some(model) = self
            .find_by_provider_id(&txn, profile.provider, &profile.provider_user_id)
            .await?
        {
            txn.commit().await?;
            return Ok(self.to_user(model));
        }

        let now = Utc::now().fixed_offset();

        if let Some(email) = &profile.email {
            let existing = Users::find().filter(users::Column::Email.eq(email)).one(&txn).await?;

            if let Some(model) = existing {
                tracing::info!(
                    user_id = %model.id,
                    provider = %profile.provider,
                    "linking provider identity to existing user"
                );

                let mut active: users::ActiveModel = model.into();
                Self::set_provider_id(&mut active, profile.provider, profile.provider_user_id);
                active.updated_at = ActiveValue::Set(now);

                let model = active.update(&txn).await?;
                txn.commit().await?;

                return Ok(self.to_user(model));
            }
        }

        let mut active = users::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4()),
            email: ActiveValue::Set(profile.email),
            password: ActiveValue::Set(None),
            google_id: ActiveValue::Set(None),
            github_id: ActiveValue::Set(None),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
        };
        Self::set_provider_id(&mut active, profile.provider, profile.provider_user_id);

        let model = Users::insert(active)
            .exec_with_returning(&txn)
            .await
            .map_err(|err| Self::map_insert_error(err, "User"))?;

        txn.commit().await?;

        Ok(self.to_user(model))
    }
}
