//! Symmetric field encryption for values stored at rest.

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, OsRng};
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::Engine;
use base64::engine::general_purpose;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use thiserror::Error;

const PBKDF2_ROUNDS: u32 = 100_000;
const NONCE_LEN: usize = 12;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait Crypto: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError>;

    fn decrypt(&self, ciphertext: &str) -> Result<String, CryptoError>;
}

/// AES-256-GCM with a key derived from a secret and salt.
///
/// Ciphertexts are encoded as `base64(nonce).base64(ciphertext)`, with a
/// fresh random nonce per call.
pub struct AesSecretCrypto {
    key: [u8; 32],
}

impl AesSecretCrypto {
    pub fn new(secret: &str, salt: &str) -> Self {
        let mut key = [0u8; 32];
        pbkdf2_hmac::<Sha256>(secret.as_bytes(), salt.as_bytes(), PBKDF2_ROUNDS, &mut key);

        Self { key }
    }

    fn cipher(&self) -> Result<Aes256Gcm, CryptoError> {
        Aes256Gcm::new_from_slice(&self.key).map_err(|e| CryptoError::InvalidInput(e.to_string()))
    }
}

impl Crypto for AesSecretCrypto {
    fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);

        let ciphertext = self
            .cipher()?
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;

        Ok(format!(
            "{}.{}",
            general_purpose::STANDARD.encode(nonce_bytes),
            general_purpose::STANDARD.encode(ciphertext)
        ))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, CryptoError> {
        let (nonce_b64, ct_b64) = ciphertext
            .split_once('.')
            .ok_or_else(|| CryptoError::InvalidInput("Missing nonce separator".into()))?;

        let nonce_bytes = general_purpose::STANDARD
            .decode(nonce_b64)
            .map_err(|e| CryptoError::InvalidInput(e.to_string()))?;
        if nonce_bytes.len() != NONCE_LEN {
            return Err(CryptoError::InvalidInput("Nonce must be 12 bytes".into()));
        }

        let ct_bytes = general_purpose::STANDARD
            .decode(ct_b64)
            .map_err(|e| CryptoError::InvalidInput(e.to_string()))?;

        let plaintext_bytes = self
            .cipher()?
            .decrypt(Nonce::from_slice(&nonce_bytes), ct_bytes.as_ref())
            .map_err(|e| CryptoError::Decryption(e.to_string()))?;

        String::from_utf8(plaintext_bytes).map_err(|e| CryptoError::Decryption(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_then_decrypt() {
        let crypto = AesSecretCrypto::new("Thisisourlittlesecret.", "salt");

        let sealed = crypto.encrypt("qwerty").unwrap();

        assert_ne!(sealed, "qwerty");
        assert_eq!(crypto.decrypt(&sealed).unwrap(), "qwerty");
    }

    #[test]
    fn test_nonce_makes_ciphertexts_differ() {
        let crypto = AesSecretCrypto::new("secret", "salt");

        assert_ne!(crypto.encrypt("same").unwrap(), crypto.encrypt("same").unwrap());
    }

    #[test]
    fn test_decrypt_with_other_key_fails() {
        let sealed = AesSecretCrypto::new("secret-a", "salt").encrypt("qwerty").unwrap();
        let result = AesSecretCrypto::new("secret-b", "salt").decrypt(&sealed);

        assert!(matches!(result, Err(CryptoError::Decryption(_))));
    }

    #[test]
    fn test_decrypt_malformed_input() {
        let crypto = AesSecretCrypto::new("secret", "salt");

        assert!(matches!(crypto.decrypt("no-separator"), Err(CryptoError::InvalidInput(_))));
        assert!(matches!(crypto.decrypt("AAAA.AAAA"), Err(CryptoError::InvalidInput(_))));
        assert!(matches!(crypto.decrypt("!!!.???"), Err(CryptoError::InvalidInput(_))));
    }
}
