use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// An external identity provider a user can sign in with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Google,
    GitHub,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::GitHub => "github",
        }
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "google" => Ok(Provider::Google),
            "github" => Ok(Provider::GitHub),
            other => Err(format!("unknown provider: {other}")),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub email: Option<String>,
    /// Stored password in the form produced by the active password scheme.
    /// `None` for users who only ever signed in through a provider.
    pub password: Option<String>,
    pub google_id: Option<String>,
    pub github_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn provider_id(&self, provider: Provider) -> Option<&str> {
        match provider {
            Provider::Google => self.google_id.as_deref(),
            Provider::GitHub => self.github_id.as_deref(),
        }
    }

    /// What to greet the user with on the secrets page.
    pub fn display_name(&self) -> String {
        if let Some(email) = &self.email {
            return email.clone();
        }
        match (&self.google_id, &self.github_id) {
            (Some(_), _) => "Google user".to_string(),
            (_, Some(_)) => "GitHub user".to_string(),
            _ => "anonymous".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Uuid,
    pub email: String,
    pub password: String,
}

/// Identity asserted by a provider after a successful OAuth callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedProfile {
    pub provider: Provider,
    pub provider_user_id: String,
    pub email: Option<String>,
}

/// Emails are the login key, so they are compared case-insensitively and
/// without surrounding whitespace.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            email: None,
            password: None,
            google_id: None,
            github_id: None,
            created_at: DateTime::default(),
            updated_at: DateTime::default(),
        }
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!("google".parse::<Provider>(), Ok(Provider::Google));
        assert_eq!("GitHub".parse::<Provider>(), Ok(Provider::GitHub));
        assert!("facebook".parse::<Provider>().is_err());
    }

    #[test]
    fn test_provider_display() {
        assert_eq!(Provider::Google.to_string(), "google");
        assert_eq!(Provider::GitHub.to_string(), "github");
    }

    #[test]
    fn test_provider_id() {
        let u = User { github_id: Some("42".into()), ..user() };

        assert_eq!(u.provider_id(Provider::GitHub), Some("42"));
        assert_eq!(u.provider_id(Provider::Google), None);
    }

    #[test]
    fn test_display_name() {
        assert_eq!(User { email: Some("a@b.com".into()), ..user() }.display_name(), "a@b.com");
        assert_eq!(User { google_id: Some("1".into()), ..user() }.display_name(), "Google user");
        assert_eq!(User { github_id: Some("1".into()), ..user() }.display_name(), "GitHub user");
        assert_eq!(user().display_name(), "anonymous");
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  User@Example.COM "), "user@example.com");
    }
}
