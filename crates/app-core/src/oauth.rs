//! OAuth 2.0 authorization-code flow with PKCE for Google and GitHub.

use std::collections::HashMap;
use std::sync::Arc;

use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge, PkceCodeVerifier, RedirectUrl,
    Scope, TokenResponse, TokenUrl,
};
use reqwest::{Client, ClientBuilder, redirect};
use serde::Deserialize;
use thiserror::Error;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_API_BASE: &str = "https://www.googleapis.com";
const GOOGLE_USERINFO_PATH: &str = "/oauth2/v3/userinfo";

const GITHUB_AUTH_URL: &str = "https://github.com/login/oauth/authorize";
const GITHUB_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const GITHUB_API_BASE: &str = "https://api.github.com";
const GITHUB_USER_PATH: &str = "/user";
const GITHUB_EMAILS_PATH: &str = "/user/emails";

const USER_AGENT: &str = concat!("secrets-app/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("Invalid URL format: {0}")]
    InvalidUrl(#[from] oauth2::url::ParseError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("OAuth token exchange failed: {0}")]
    TokenExchange(String),

    #[error("Failed to parse user profile response")]
    ProfileParse,

    #[error("Provider not found: {0}")]
    ProviderNotFound(String),
}

pub struct AuthorizationDetails {
    pub url: String,
    pub csrf_token: CsrfToken,
    pub pkce_verifier: PkceCodeVerifier,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthUserProfile {
    pub provider_user_id: String,
    /// Only set when the provider vouches that the address is verified.
    pub email: Option<String>,
}

#[async_trait::async_trait]
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait OAuthProvider: Send + Sync {
    /// Builds the consent URL plus the CSRF state and PKCE verifier that the
    /// caller must keep until the callback.
    fn get_authorization_details(&self) -> AuthorizationDetails;

    /// Exchanges an authorization code for an access token.
    async fn exchange_code(&self, code: String, pkce_verifier_secret: String) -> Result<String, OAuthError>;

    /// Fetches the user's profile from the provider using an access token.
    async fn get_user_profile(&self, access_token: &str) -> Result<OAuthUserProfile, OAuthError>;
}

/// Client registration shared by every provider.
#[derive(Debug)]
struct OAuthClient {
    client_id: ClientId,
    client_secret: ClientSecret,
    auth_url: AuthUrl,
    token_url: TokenUrl,
    redirect_url: RedirectUrl,
    scopes: Vec<Scope>,
    http: Client,
}

impl OAuthClient {
    fn new(
        client_id: String,
        client_secret: String,
        redirect_uri: String,
        auth_url: &str,
        token_url: &str,
        scopes: &[&str],
    ) -> Result<Self, OAuthError> {
        // Token endpoints must not be followed across redirects.
        let http = ClientBuilder::new()
            .redirect(redirect::Policy::none())
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client_id: ClientId::new(client_id),
            client_secret: ClientSecret::new(client_secret),
            auth_url: AuthUrl::new(auth_url.to_string())?,
            token_url: TokenUrl::new(token_url.to_string())?,
            redirect_url: RedirectUrl::new(redirect_uri)?,
            scopes: scopes.iter().map(|s| Scope::new(s.to_string())).collect(),
            http,
        })
    }

    fn authorization_details(&self) -> AuthorizationDetails {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let (auth_url, csrf_token) = BasicClient::new(self.client_id.clone())
            .set_client_secret(self.client_secret.clone())
            .set_auth_uri(self.auth_url.clone())
            .set_token_uri(self.token_url.clone())
            .set_redirect_uri(self.redirect_url.clone())
            .authorize_url(CsrfToken::new_random)
            .add_scopes(self.scopes.clone())
            .set_pkce_challenge(pkce_challenge)
            .url();

        tracing::debug!(auth_url = %auth_url, "generated authorization url");

        AuthorizationDetails { url: auth_url.to_string(), csrf_token, pkce_verifier }
    }

    async fn exchange_code(&self, code: String, pkce_verifier_secret: String) -> Result<String, OAuthError> {
        let token_result = BasicClient::new(self.client_id.clone())
            .set_client_secret(self.client_secret.clone())
            .set_auth_uri(self.auth_url.clone())
            .set_token_uri(self.token_url.clone())
            .set_redirect_uri(self.redirect_url.clone())
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier_secret))
            .request_async(&self.http)
            .await
            .map_err(|e| {
                let error_msg = match &e {
                    oauth2::RequestTokenError::ServerResponse(err) => {
                        format!("Server response error: {:?}", err.error_description())
                    },
                    oauth2::RequestTokenError::Parse(_, body) => match std::str::from_utf8(body) {
                        Ok(body_str) => format!("Parse error. Response body: {}", body_str),
                        Err(_) => "Parse error with non-UTF8 response".to_string(),
                    },
                    _ => format!("Token exchange error: {:?}", e),
                };
                tracing::error!("OAuth token exchange failed: {}", error_msg);
                OAuthError::TokenExchange(error_msg)
            })?;

        Ok(token_result.access_token().secret().to_string())
    }
}

#[derive(Debug)]
pub struct GoogleOAuthProvider {
    client: OAuthClient,
    api_base: String,
}

impl GoogleOAuthProvider {
    pub fn new(client_id: String, client_secret: String, redirect_uri: String) -> Result<Self, OAuthError> {
        let client = OAuthClient::new(
            client_id,
            client_secret,
            redirect_uri,
            GOOGLE_AUTH_URL,
            GOOGLE_TOKEN_URL,
            &["openid", "email", "profile"],
        )?;
        Ok(Self { client, api_base: GOOGLE_API_BASE.to_string() })
    }

    /// Points profile requests at another host, e.g. a local stub server.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

#[async_trait::async_trait]
impl OAuthProvider for GoogleOAuthProvider {
    fn get_authorization_details(&self) -> AuthorizationDetails {
        self.client.authorization_details()
    }

    async fn exchange_code(&self, code: String, pkce_verifier_secret: String) -> Result<String, OAuthError> {
        self.client.exchange_code(code, pkce_verifier_secret).await
    }

    async fn get_user_profile(&self, access_token: &str) -> Result<OAuthUserProfile, OAuthError> {
        #[derive(Deserialize)]
        struct GoogleProfile {
            sub: String,
            email: Option<String>,
            email_verified: Option<bool>,
        }

        let profile: GoogleProfile = self
            .client
            .http
            .get(format!("{}{GOOGLE_USERINFO_PATH}", self.api_base))
            .bearer_auth(access_token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .map_err(|_| OAuthError::ProfileParse)?;

        let email = match profile.email_verified {
            Some(true) => profile.email,
            _ => None,
        };

        Ok(OAuthUserProfile { provider_user_id: profile.sub, email })
    }
}

#[derive(Debug)]
pub struct GitHubOAuthProvider {
    client: OAuthClient,
    api_base: String,
}

impl GitHubOAuthProvider {
    pub fn new(client_id: String, client_secret: String, redirect_uri: String) -> Result<Self, OAuthError> {
        let client = OAuthClient::new(
            client_id,
            client_secret,
            redirect_uri,
            GITHUB_AUTH_URL,
            GITHUB_TOKEN_URL,
            &["read:user", "user:email"],
        )?;
        Ok(Self { client, api_base: GITHUB_API_BASE.to_string() })
    }

    /// Points profile requests at another host, e.g. a local stub server.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// GitHub omits the email from `/user` when it is private; the primary
    /// verified address is then read from `/user/emails`.
    async fn primary_email(&self, access_token: &str) -> Result<Option<String>, OAuthError> {
        #[derive(Deserialize)]
        struct GitHubEmail {
            email: String,
            primary: bool,
            verified: bool,
        }

        let emails: Vec<GitHubEmail> = self
            .client
            .http
            .get(format!("{}{GITHUB_EMAILS_PATH}", self.api_base))
            .bearer_auth(access_token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .map_err(|_| OAuthError::ProfileParse)?;

        Ok(emails.into_iter().find(|e| e.primary && e.verified).map(|e| e.email))
    }
}

#[async_trait::async_trait]
impl OAuthProvider for GitHubOAuthProvider {
    fn get_authorization_details(&self) -> AuthorizationDetails {
        self.client.authorization_details()
    }

    async fn exchange_code(&self, code: String, pkce_verifier_secret: String) -> Result<String, OAuthError> {
        self.client.exchange_code(code, pkce_verifier_secret).await
    }

    async fn get_user_profile(&self, access_token: &str) -> Result<OAuthUserProfile, OAuthError> {
        #[derive(Deserialize)]
        struct GitHubUser {
            id: u64,
            email: Option<String>,
        }

        let user: GitHubUser = self
            .client
            .http
            .get(format!("{}{GITHUB_USER_PATH}", self.api_base))
            .bearer_auth(access_token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .map_err(|_| OAuthError::ProfileParse)?;

        let email = match user.email {
            Some(email) => Some(email),
            None => self.primary_email(access_token).await?,
        };

        Ok(OAuthUserProfile { provider_user_id: user.id.to_string(), email })
    }
}

#[derive(Clone, Default)]
pub struct OAuthManager {
    providers: HashMap<String, Arc<dyn OAuthProvider>>,
}

impl OAuthManager {
    pub fn new() -> Self {
        Self { providers: HashMap::new() }
    }

    pub fn add_provider(&mut self, name: &str, provider: Arc<dyn OAuthProvider>) {
        self.providers.insert(name.to_string(), provider);
    }

    pub fn get_provider(&self, name: &str) -> Result<&Arc<dyn OAuthProvider>, OAuthError> {
        self.providers
            .get(name)
            .ok_or_else(|| OAuthError::ProviderNotFound(name.to_string()))
    }

    pub fn provider_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn google(api_base: &str) -> GoogleOAuthProvider {
        GoogleOAuthProvider::new(
            "client_id".to_string(),
            "client_secret".to_string(),
            "http://localhost:3000/auth/google/secrets".to_string(),
        )
        .unwrap()
        .with_api_base(api_base)
    }

    fn github(api_base: &str) -> GitHubOAuthProvider {
        GitHubOAuthProvider::new(
            "gh_client".to_string(),
            "client_secret".to_string(),
            "http://localhost:3000/auth/github/secrets".to_string(),
        )
        .unwrap()
        .with_api_base(api_base)
    }

    async fn mount_json(server: &MockServer, route: &str, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(route))
            .and(header("authorization", "Bearer token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[test]
    fn test_oauth_manager() {
        let mut manager = OAuthManager::new();
        manager.add_provider("github", Arc::new(MockOAuthProvider::new()));
        manager.add_provider("google", Arc::new(MockOAuthProvider::new()));

        assert!(manager.get_provider("github").is_ok());
        assert!(matches!(manager.get_provider("facebook"), Err(OAuthError::ProviderNotFound(_))));
        assert_eq!(manager.provider_names(), vec!["github", "google"]);
    }

    #[test]
    fn test_invalid_redirect_url() {
        let google = GoogleOAuthProvider::new("id".to_string(), "secret".to_string(), "invalid_url".to_string());
        let github = GitHubOAuthProvider::new("id".to_string(), "secret".to_string(), "invalid_url".to_string());

        assert!(matches!(google.unwrap_err(), OAuthError::InvalidUrl(_)));
        assert!(matches!(github.unwrap_err(), OAuthError::InvalidUrl(_)));
    }

    #[test]
    fn test_google_authorization_details() {
        let details = google(GOOGLE_API_BASE).get_authorization_details();

        assert!(details.url.starts_with(GOOGLE_AUTH_URL));
        assert!(details.url.contains("response_type=code"));
        assert!(details.url.contains("client_id=client_id"));
        assert!(details.url.contains("code_challenge_method=S256"));
        assert!(details.url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fauth%2Fgoogle%2Fsecrets"));
        assert!(details.url.contains("scope=openid+email+profile"));
        assert!(details.url.contains(&format!("state={}", details.csrf_token.secret())));
    }

    #[test]
    fn test_github_authorization_details() {
        let details = github(GITHUB_API_BASE).get_authorization_details();

        assert!(details.url.starts_with(GITHUB_AUTH_URL));
        assert!(details.url.contains("client_id=gh_client"));
        assert!(details.url.contains("scope=read%3Auser+user%3Aemail"));
        assert!(!details.pkce_verifier.secret().is_empty());
    }

    #[tokio::test]
    async fn test_google_profile_with_verified_email() {
        let server = MockServer::start().await;
        mount_json(
            &server,
            GOOGLE_USERINFO_PATH,
            json!({ "sub": "g-123", "email": "user@example.com", "email_verified": true }),
        )
        .await;

        let profile = google(&server.uri()).get_user_profile("token").await.unwrap();

        assert_eq!(profile.provider_user_id, "g-123");
        assert_eq!(profile.email.as_deref(), Some("user@example.com"));
    }

    #[tokio::test]
    async fn test_google_profile_drops_unverified_email() {
        let server = MockServer::start().await;
        mount_json(
            &server,
            GOOGLE_USERINFO_PATH,
            json!({ "sub": "g-123", "email": "victim@example.com", "email_verified": false }),
        )
        .await;
        let profile = google(&server.uri()).get_user_profile("token").await.unwrap();
        assert_eq!(profile.email, None);

        let server = MockServer::start().await;
        mount_json(&server, GOOGLE_USERINFO_PATH, json!({ "sub": "g-123", "email": "victim@example.com" })).await;
        let profile = google(&server.uri()).get_user_profile("token").await.unwrap();
        assert_eq!(profile.email, None);
    }

    #[tokio::test]
    async fn test_github_profile_with_public_email() {
        let server = MockServer::start().await;
        mount_json(&server, GITHUB_USER_PATH, json!({ "id": 42, "login": "octo", "email": "octo@example.com" })).await;

        let profile = github(&server.uri()).get_user_profile("token").await.unwrap();

        assert_eq!(profile.provider_user_id, "42");
        assert_eq!(profile.email.as_deref(), Some("octo@example.com"));
    }

    #[tokio::test]
    async fn test_github_profile_falls_back_to_primary_verified_email() {
        let server = MockServer::start().await;
        mount_json(&server, GITHUB_USER_PATH, json!({ "id": 42, "login": "octo", "email": null })).await;
        mount_json(
            &server,
            GITHUB_EMAILS_PATH,
            json!([
                { "email": "old@example.com", "primary": false, "verified": true },
                { "email": "unverified@example.com", "primary": true, "verified": false },
                { "email": "octo@example.com", "primary": true, "verified": true },
            ]),
        )
        .await;

        let profile = github(&server.uri()).get_user_profile("token").await.unwrap();

        assert_eq!(profile.email.as_deref(), Some("octo@example.com"));
    }

    #[tokio::test]
    async fn test_github_profile_without_usable_email() {
        let server = MockServer::start().await;
        mount_json(&server, GITHUB_USER_PATH, json!({ "id": 42, "login": "octo" })).await;
        mount_json(
            &server,
            GITHUB_EMAILS_PATH,
            json!([{ "email": "octo@example.com", "primary": true, "verified": false }]),
        )
        .await;

        let profile = github(&server.uri()).get_user_profile("token").await.unwrap();

        assert_eq!(profile.provider_user_id, "42");
        assert_eq!(profile.email, None);
    }

    #[tokio::test]
    async fn test_malformed_profile_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(GITHUB_USER_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
            .mount(&server)
            .await;

        let result = github(&server.uri()).get_user_profile("token").await;

        assert!(matches!(result, Err(OAuthError::ProfileParse)));
    }

    #[tokio::test]
    async fn test_profile_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(GOOGLE_USERINFO_PATH))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let result = google(&server.uri()).get_user_profile("token").await;

        assert!(matches!(result, Err(OAuthError::HttpClient(_))));
    }
}
