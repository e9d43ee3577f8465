use validator::Validate;

use crate::domain::entity::user::User;

// ╔════════════════════════════╗
// ║       Registration         ║
// ╚════════════════════════════╝

#[derive(Debug, Validate)]
pub struct RegisterInput {
    #[validate(email(message = "must be a valid email address"))]
    pub username: String,
    #[validate(length(min = 1, message = "cannot be empty"))]
    pub password: String,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RegisterOutput {
    pub user: User,
}

// ╔════════════════════════════╗
// ║         Login              ║
// ╚════════════════════════════╝

#[derive(Debug, Validate)]
pub struct LoginInput {
    #[validate(email(message = "must be a valid email address"))]
    pub username: String,
    #[validate(length(min = 1, message = "cannot be empty"))]
    pub password: String,
}

#[derive(Debug, PartialEq, Eq)]
pub struct LoginOutput {
    pub user: User,
}

// ╔════════════════════════════╗
// ║        Login OAuth         ║
// ╚════════════════════════════╝

#[derive(Debug, Validate)]
pub struct OAuthLoginInput {
    #[validate(length(min = 1, message = "provider cannot be empty"))]
    pub provider: String,
}

#[derive(Debug)]
pub struct OAuthLoginOutput {
    pub auth_url: String,
    pub csrf_token: String,
    pub pkce_verifier: String,
}

// ╔════════════════════════════╗
// ║   Login OAuth Callback     ║
// ╚════════════════════════════╝

#[derive(Debug, Validate)]
pub struct OAuthCallbackInput {
    #[validate(length(min = 1, message = "provider cannot be empty"))]
    pub provider: String,

    #[validate(length(min = 1, message = "code cannot be empty"))]
    pub code: String,

    #[validate(length(min = 1, message = "pkce verifier cannot be empty"))]
    pub pkce_verifier_secret: String,
}

#[derive(Debug, PartialEq, Eq)]
pub struct OAuthCallbackOutput {
    pub user: User,
}
