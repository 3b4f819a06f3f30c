//! Encryption of workspace variable values at rest

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// AES-GCM nonce length in bytes
const NONCE_LENGTH: usize = 12;

/// Cipher for variable values, keyed from the configured secret
#[derive(Clone)]
pub struct VariableCipher {
    cipher: Aes256Gcm,
}

impl VariableCipher {
    /// Derive the AES-256 key from a secret
    pub fn from_secret(secret: &str) -> Result<Self> {
        let key = Sha256::digest(secret.as_bytes());
        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| Error::EncryptionError(format!("Failed to create cipher: {}", e)))?;

        Ok(Self { cipher })
    }

    /// Encrypt a value into base64 of nonce followed by ciphertext
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| Error::EncryptionError(format!("Encryption failed: {}", e)))?;

        let mut combined = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
        combined.extend_from_slice(&nonce);
        combined.extend_from_slice(&ciphertext);

        Ok(STANDARD.encode(combined))
    }

    /// Decrypt a value produced by `encrypt`
    pub fn decrypt(&self, encrypted: &str) -> Result<String> {
        let combined = STANDARD
            .decode(encrypted)
            .map_err(|e| Error::EncryptionError(format!("Failed to decode base64: {}", e)))?;

        if combined.len() < NONCE_LENGTH {
            return Err(Error::EncryptionError("Encrypted data too short".to_string()));
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_LENGTH);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| Error::EncryptionError(format!("Decryption failed: {}", e)))?;

        String::from_utf8(plaintext)
            .map_err(|e| Error::EncryptionError(format!("Decrypted data is not valid UTF-8: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ciphertext_hides_value() {
        let cipher = VariableCipher::from_secret("secret").unwrap();

        let first = cipher.encrypt("token-123").unwrap();
        let second = cipher.encrypt("token-123").unwrap();

        assert!(!first.contains("token-123"));
        assert_ne!(first, second);
        assert_eq!(cipher.decrypt(&first).unwrap(), "token-123");
    }

    #[test]
    fn test_different_secrets_fail_decryption() {
        let cipher1 = VariableCipher::from_secret("secret-1").unwrap();
        let cipher2 = VariableCipher::from_secret("secret-2").unwrap();

        let encrypted = cipher1.encrypt("value").unwrap();
        assert!(cipher2.decrypt(&encrypted).is_err());
    }

    #[test]
    fn test_rejects_truncated_data() {
        let cipher = VariableCipher::from_secret("secret").unwrap();
        assert!(matches!(
            cipher.decrypt(&STANDARD.encode([0u8; 4])),
            Err(Error::EncryptionError(_))
        ));
    }
}
