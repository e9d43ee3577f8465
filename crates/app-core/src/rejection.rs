//! Conversions from Axum's extractor rejections into [`AppError`].

use axum::extract::rejection::{FormRejection, PathRejection, QueryRejection};

use super::error::AppError;

impl From<FormRejection> for AppError {
    fn from(rejection: FormRejection) -> Self {
        AppError::RequestFormat(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::RequestFormat(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::RequestFormat(rejection.body_text())
    }
}
