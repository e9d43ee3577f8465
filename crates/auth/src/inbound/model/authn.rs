use serde::{Deserialize, Serialize};

// ╔════════════════════════════╗
// ║  Register / Login forms    ║
// ╚════════════════════════════╝

/// Body of both the register and the login form. The field is named
/// `username` but carries the user's email.
#[derive(Debug, Deserialize)]
pub struct CredentialsForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

// ╔════════════════════════════╗
// ║   Login OAuth Callback     ║
// ╚════════════════════════════╝

#[derive(Debug, Deserialize)]
pub struct OAuthCallbackRequest {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// What survives in the private `__oauth_state` cookie between the redirect
/// to the provider and its callback.
#[derive(Debug, Serialize, Deserialize)]
pub struct OAuthStateCookie {
    pub provider: String,
    pub csrf_token: String,
    pub pkce_verifier: String,
}
