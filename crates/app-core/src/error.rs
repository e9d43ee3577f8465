//! Application-wide error type and its HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use super::config::ConfigError;
use super::crypto::CryptoError;
use super::oauth::OAuthError;
use super::password::HashingError;
use super::view::render_error;

const INTERNAL_MSG: &str = "An internal server error occurred";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation failed")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid request format: {0}")]
    RequestFormat(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    // Internal Libraries
    #[error("Config operation failed")]
    Config(#[from] ConfigError),

    #[error("Crypto operation failed")]
    Crypto(#[from] CryptoError),

    #[error("OAuth operation failed")]
    OAuth(#[from] OAuthError),

    #[error("Password Hashing operation failed")]
    Hashing(#[from] HashingError),

    // Third Party Libraries
    #[error("Sea ORM operation failed")]
    Database(#[from] sea_orm::DbErr),

    #[error("Template rendering failed")]
    Template(#[from] minijinja::Error),

    #[error("Serde JSON operation failed")]
    JsonParse(#[from] serde_json::Error),

    #[error("An internal server error occurred")]
    Internal,
}

impl AppError {
    /// A short, client-safe message for validation failures, e.g.
    /// `username: must be a valid email address`.
    pub fn validation_message(errors: &validator::ValidationErrors) -> String {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        fields
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => format!("{field}: {msg}"),
                    None => format!("{field}: {}", e.code),
                })
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::RequestFormat(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::OAuth(err) => match err {
                OAuthError::InvalidUrl(_) | OAuthError::TokenExchange(_) => StatusCode::BAD_REQUEST,
                OAuthError::ProviderNotFound(_) => StatusCode::NOT_FOUND,
                OAuthError::HttpClient(_) | OAuthError::ProfileParse => StatusCode::BAD_GATEWAY,
            },
            AppError::Config(_)
            | AppError::Crypto(_)
            | AppError::Hashing(_)
            | AppError::Database(_)
            | AppError::Template(_)
            | AppError::JsonParse(_)
            | AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message shown to the client. Internal causes are logged here and
    /// replaced by a generic message.
    fn public_message(&self) -> String {
        match self {
            AppError::Validation(errors) => Self::validation_message(errors),
            AppError::RequestFormat(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => msg.clone(),
            AppError::OAuth(err) => {
                tracing::warn!("OAuth error: {:?}", err);
                match err {
                    OAuthError::InvalidUrl(_) | OAuthError::ProviderNotFound(_) => err.to_string(),
                    OAuthError::HttpClient(_) | OAuthError::ProfileParse => "OAuth provider unavailable".to_string(),
                    OAuthError::TokenExchange(_) => "OAuth operation failed".to_string(),
                }
            },
            AppError::Config(err) => {
                tracing::error!("Config getter error: {:?}", err);
                INTERNAL_MSG.to_string()
            },
            AppError::Crypto(err) => {
                tracing::error!("Crypto error: {:?}", err);
                INTERNAL_MSG.to_string()
            },
            AppError::Hashing(err) => {
                tracing::error!("Password hashing error: {:?}", err);
                INTERNAL_MSG.to_string()
            },
            AppError::Database(err) => {
                tracing::error!("Database error: {:?}", err);
                INTERNAL_MSG.to_string()
            },
            AppError::Template(err) => {
                tracing::error!("Template error: {:#}", err);
                INTERNAL_MSG.to_string()
            },
            AppError::JsonParse(err) => {
                tracing::error!("Failed to parse JSON: {:?}", err);
                INTERNAL_MSG.to_string()
            },
            AppError::Internal => INTERNAL_MSG.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.public_message();

        (status, render_error(status.as_u16(), &message)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use sea_orm::DbErr;
    use validator::{ValidationError, ValidationErrors};

    use super::*;

    async fn extract_html_response(response: Response<Body>) -> (StatusCode, String) {
        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body");
        (status, String::from_utf8(body_bytes.to_vec()).expect("body is not utf-8"))
    }

    fn create_validation_errors() -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        let mut email_error = ValidationError::new("email");
        email_error.message = Some("must be a valid email address".into());
        errors.add("username", email_error);

        let mut password_error = ValidationError::new("length");
        password_error.message = Some("cannot be empty".into());
        errors.add("password", password_error);

        errors
    }

    #[tokio::test]
    async fn test_client_errors_keep_their_message() {
        let cases = vec![
            (AppError::RequestFormat("Bad form".into()), StatusCode::BAD_REQUEST, "Bad form"),
            (AppError::Unauthorized("Invalid email or password".into()), StatusCode::UNAUTHORIZED, "Invalid email or password"),
            (AppError::Forbidden("Access denied".into()), StatusCode::FORBIDDEN, "Access denied"),
            (AppError::NotFound("User not found".into()), StatusCode::NOT_FOUND, "User not found"),
            (AppError::Conflict("Email taken".into()), StatusCode::CONFLICT, "Email taken"),
        ];

        for (error, expected_status, expected_message) in cases {
            let (status, body) = extract_html_response(error.into_response()).await;
            assert_eq!(status, expected_status);
            assert!(body.contains(expected_message), "{body}");
        }
    }

    #[tokio::test]
    async fn test_validation_error() {
        let error = AppError::Validation(create_validation_errors());
        let (status, body) = extract_html_response(error.into_response()).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body.contains("password: cannot be empty"));
        assert!(body.contains("username: must be a valid email address"));
    }

    #[test]
    fn test_validation_message_is_sorted_by_field() {
        let message = AppError::validation_message(&create_validation_errors());

        assert_eq!(message, "password: cannot be empty, username: must be a valid email address");
    }

    #[tokio::test]
    async fn test_internal_causes_are_hidden() {
        let cases = vec![
            AppError::Database(DbErr::UnpackInsertId),
            AppError::Config(ConfigError::LockPoisoned),
            AppError::Crypto(CryptoError::Decryption("aead::Error".into())),
            AppError::Hashing(HashingError::Hash(argon2::password_hash::Error::Algorithm)),
            AppError::Internal,
        ];

        for error in cases {
            let (status, body) = extract_html_response(error.into_response()).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert!(body.contains(INTERNAL_MSG));
            assert!(!body.contains("aead"));
        }
    }

    #[tokio::test]
    async fn test_oauth_errors() {
        let (status, body) =
            extract_html_response(AppError::OAuth(OAuthError::ProviderNotFound("facebook".into())).into_response())
                .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("Provider not found: facebook"));

        let (status, body) = extract_html_response(AppError::OAuth(OAuthError::ProfileParse).into_response()).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body.contains("OAuth provider unavailable"));

        let (status, _) =
            extract_html_response(AppError::OAuth(OAuthError::TokenExchange("expired".into())).into_response()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_json_parse_error() {
        let json_error = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let (status, _) = extract_html_response(AppError::JsonParse(json_error).into_response()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
