//! Password storage schemes.
//!
//! Each scheme turns a plaintext password into the string persisted on the
//! user record and checks a login attempt against it. Which scheme is active
//! is a deployment choice ([`PasswordScheme`]); only [`Argon2Hasher`] is
//! suitable outside of a demo.

use std::sync::Arc;

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{Error as Argon2Error, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use serde::Deserialize;
use thiserror::Error;

use super::crypto::{Crypto, CryptoError};

#[derive(Error, Debug)]
pub enum HashingError {
    #[error("Failed to hash or verify password: {0}")]
    Hash(Argon2Error),

    #[error("Failed to seal or open password: {0}")]
    Crypto(#[from] CryptoError),
}

impl From<Argon2Error> for HashingError {
    fn from(err: Argon2Error) -> Self {
        HashingError::Hash(err)
    }
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait Hasher: Send + Sync {
    fn hash(&self, plain: &str) -> Result<String, HashingError>;

    fn verify(&self, plain: &str, stored: &str) -> Result<bool, HashingError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PasswordScheme {
    Plaintext,
    Encrypted,
    Md5,
    Argon2,
}

impl PasswordScheme {
    /// Builds the hasher for this scheme. `crypto` is only consulted by
    /// [`PasswordScheme::Encrypted`].
    pub fn hasher(self, crypto: Option<Arc<dyn Crypto>>) -> Result<Arc<dyn Hasher>, HashingError> {
        Ok(match self {
            PasswordScheme::Plaintext => Arc::new(PlainText),
            PasswordScheme::Md5 => Arc::new(Md5Hasher),
            PasswordScheme::Argon2 => Arc::new(Argon2Hasher::new()),
            PasswordScheme::Encrypted => {
                let crypto = crypto.ok_or_else(|| {
                    CryptoError::InvalidInput("encrypted password scheme requires a crypto key".to_string())
                })?;
                Arc::new(EncryptedPassword::new(crypto))
            },
        })
    }
}

/// Stores the password verbatim.
pub struct PlainText;

impl Hasher for PlainText {
    fn hash(&self, plain: &str) -> Result<String, HashingError> {
        Ok(plain.to_string())
    }

    fn verify(&self, plain: &str, stored: &str) -> Result<bool, HashingError> {
        Ok(plain == stored)
    }
}

/// Stores the password encrypted under the application key; login decrypts
/// and compares.
pub struct EncryptedPassword {
    crypto: Arc<dyn Crypto>,
}

impl EncryptedPassword {
    pub fn new(crypto: Arc<dyn Crypto>) -> Self {
        Self { crypto }
    }
}

impl Hasher for EncryptedPassword {
    fn hash(&self, plain: &str) -> Result<String, HashingError> {
        Ok(self.crypto.encrypt(plain)?)
    }

    fn verify(&self, plain: &str, stored: &str) -> Result<bool, HashingError> {
        Ok(self.crypto.decrypt(stored)? == plain)
    }
}

/// Unsalted MD5 hex digest.
pub struct Md5Hasher;

impl Md5Hasher {
    fn digest(plain: &str) -> String {
        format!("{:x}", md5::compute(plain.as_bytes()))
    }
}

impl Hasher for Md5Hasher {
    fn hash(&self, plain: &str) -> Result<String, HashingError> {
        Ok(Self::digest(plain))
    }

    fn verify(&self, plain: &str, stored: &str) -> Result<bool, HashingError> {
        Ok(Self::digest(plain).eq_ignore_ascii_case(stored))
    }
}

/// Salted Argon2id, stored as a PHC string.
pub struct Argon2Hasher<'a> {
    argon2: Argon2<'a>,
}

impl Argon2Hasher<'_> {
    pub fn new() -> Self {
        Self { argon2: Argon2::default() }
    }
}

impl Default for Argon2Hasher<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for Argon2Hasher<'_> {
    fn hash(&self, plain: &str) -> Result<String, HashingError> {
        let salt = SaltString::generate(&mut OsRng);

        Ok(self.argon2.hash_password(plain.as_bytes(), &salt)?.to_string())
    }

    fn verify(&self, plain: &str, stored: &str) -> Result<bool, HashingError> {
        let parsed_hash = PasswordHash::new(stored)?;

        Ok(self.argon2.verify_password(plain.as_bytes(), &parsed_hash).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{AesSecretCrypto, MockCrypto};

    fn all_schemes() -> Vec<(PasswordScheme, Arc<dyn Hasher>)> {
        let crypto: Arc<dyn Crypto> = Arc::new(AesSecretCrypto::new("Thisisourlittlesecret.", "salt"));
        [PasswordScheme::Plaintext, PasswordScheme::Encrypted, PasswordScheme::Md5, PasswordScheme::Argon2]
            .into_iter()
            .map(|scheme| (scheme, scheme.hasher(Some(crypto.clone())).unwrap()))
            .collect()
    }

    #[test]
    fn test_every_scheme_accepts_the_right_password() {
        for (scheme, hasher) in all_schemes() {
            let stored = hasher.hash("123456").unwrap();
            assert!(hasher.verify("123456", &stored).unwrap(), "{scheme:?} rejected the right password");
        }
    }

    #[test]
    fn test_every_scheme_rejects_the_wrong_password() {
        for (scheme, hasher) in all_schemes() {
            let stored = hasher.hash("123456").unwrap();
            assert!(!hasher.verify("654321", &stored).unwrap(), "{scheme:?} accepted the wrong password");
        }
    }

    #[test]
    fn test_only_plaintext_stores_the_password_verbatim() {
        for (scheme, hasher) in all_schemes() {
            let stored = hasher.hash("123456").unwrap();
            assert_eq!(stored == "123456", scheme == PasswordScheme::Plaintext, "{scheme:?}");
        }
    }

    #[test]
    fn test_md5_known_digest() {
        let hasher = Md5Hasher;

        assert_eq!(hasher.hash("123456").unwrap(), "e10adc3949ba59abbe56e057f20f883e");
        assert!(hasher.verify("123456", "E10ADC3949BA59ABBE56E057F20F883E").unwrap());
    }

    #[test]
    fn test_argon2_salts_each_hash() {
        let hasher = Argon2Hasher::new();

        let hash1 = hasher.hash("same-password").unwrap();
        let hash2 = hasher.hash("same-password").unwrap();

        assert_ne!(hash1, hash2);
        assert!(hash1.starts_with("$argon2id$"));
        assert!(hasher.verify("same-password", &hash1).unwrap());
        assert!(hasher.verify("same-password", &hash2).unwrap());
    }

    #[test]
    fn test_argon2_malformed_hash_is_an_error() {
        let result = Argon2Hasher::default().verify("any", "this-is-not-a-valid-argon2-hash");

        assert!(matches!(result, Err(HashingError::Hash(_))));
    }

    #[test]
    fn test_encrypted_propagates_crypto_failure() {
        let mut crypto = MockCrypto::new();
        crypto
            .expect_decrypt()
            .returning(|_| Err(CryptoError::Decryption("bad tag".to_string())));
        let hasher = EncryptedPassword::new(Arc::new(crypto));

        assert!(matches!(hasher.verify("pw", "x.y"), Err(HashingError::Crypto(_))));
    }

    #[test]
    fn test_encrypted_scheme_requires_crypto() {
        assert!(PasswordScheme::Encrypted.hasher(None).is_err());
        assert!(PasswordScheme::Md5.hasher(None).is_ok());
    }

    #[test]
    fn test_scheme_deserializes_lowercase() {
        let scheme: PasswordScheme = serde_json::from_str("\"md5\"").unwrap();
        assert_eq!(scheme, PasswordScheme::Md5);
        assert!(serde_json::from_str::<PasswordScheme>("\"sha1\"").is_err());
    }
}
