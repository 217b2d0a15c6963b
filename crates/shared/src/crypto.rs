//! Cryptographic utilities for API key hashing and tenant secret encryption.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Nonce size (12 bytes recommended for AES-GCM).
const NONCE_SIZE: usize = 12;

/// Computes SHA-256 hash of the input and returns it as a hex string.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Checks a presented secret against a stored SHA-256 hex digest.
///
/// The comparison does not short-circuit on the first differing byte.
pub fn matches_sha256_hex(input: &str, expected_hex: &str) -> bool {
    let actual = sha256_hex(input);
    let expected = expected_hex.trim().to_ascii_lowercase();
    if expected.is_empty() || actual.len() != expected.len() {
        return false;
    }
    actual
        .bytes()
        .zip(expected.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// Errors raised while encrypting or decrypting stored secrets.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    #[error("Invalid base64 payload")]
    InvalidEncoding,

    #[error("Encrypted payload too short")]
    TooShort,

    #[error("Encryption failed")]
    EncryptFailed,

    #[error("Decryption failed")]
    DecryptFailed,

    #[error("Decrypted value is not valid UTF-8")]
    InvalidUtf8,
}

/// AES-256-GCM cipher for tenant database passwords kept in the central catalog.
///
/// Payloads are `base64(nonce || ciphertext)` with a fresh random nonce per call.
#[derive(Clone)]
pub struct SecretCipher {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCipher")
            .field("cipher", &"<redacted>")
            .finish()
    }
}

impl SecretCipher {
    /// Derives the 256-bit key from a configured passphrase.
    pub fn from_passphrase(passphrase: &str) -> Self {
        let key = Sha256::digest(passphrase.as_bytes());
        Self {
            cipher: Aes256Gcm::new(&key),
        }
    }

    /// Encrypts a plaintext secret.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| CipherError::EncryptFailed)?;

        let mut combined = nonce_bytes.to_vec();
        combined.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(combined))
    }

    /// Decrypts a payload produced by [`SecretCipher::encrypt`].
    pub fn decrypt(&self, encoded: &str) -> Result<String, CipherError> {
        let combined = STANDARD
            .decode(encoded.trim())
            .map_err(|_| CipherError::InvalidEncoding)?;

        if combined.len() <= NONCE_SIZE {
            return Err(CipherError::TooShort);
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_SIZE);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| CipherError::DecryptFailed)?;

        String::from_utf8(plaintext).map_err(|_| CipherError::InvalidUtf8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex() {
        let hash = sha256_hex("test");
        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
        );
    }

    #[test]
    fn test_sha256_hex_empty_string() {
        assert_eq!(
            sha256_hex(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_matches_sha256_hex() {
        let digest = sha256_hex("admin-key");
        assert!(matches_sha256_hex("admin-key", &digest));
        assert!(matches_sha256_hex("admin-key", &digest.to_uppercase()));
        assert!(!matches_sha256_hex("other-key", &digest));
    }

    #[test]
    fn test_matches_sha256_hex_rejects_empty_digest() {
        assert!(!matches_sha256_hex("anything", ""));
        assert!(!matches_sha256_hex("anything", "abc"));
    }

    #[test]
    fn test_secret_cipher_roundtrip() {
        let cipher = SecretCipher::from_passphrase("central-secret");
        let encrypted = cipher.encrypt("tenant-password").unwrap();
        assert_ne!(encrypted, "tenant-password");
        assert_eq!(cipher.decrypt(&encrypted).unwrap(), "tenant-password");
    }

    #[test]
    fn test_secret_cipher_uses_fresh_nonce() {
        let cipher = SecretCipher::from_passphrase("central-secret");
        let a = cipher.encrypt("same").unwrap();
        let b = cipher.encrypt("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_secret_cipher_wrong_key() {
        let encrypted = SecretCipher::from_passphrase("one")
            .encrypt("secret")
            .unwrap();
        let result = SecretCipher::from_passphrase("two").decrypt(&encrypted);
        assert_eq!(result, Err(CipherError::DecryptFailed));
    }

    #[test]
    fn test_secret_cipher_invalid_payloads() {
        let cipher = SecretCipher::from_passphrase("key");
        assert_eq!(
            cipher.decrypt("not base64!"),
            Err(CipherError::InvalidEncoding)
        );
        assert_eq!(cipher.decrypt("AAAA"), Err(CipherError::TooShort));
    }

    #[test]
    fn test_secret_cipher_debug_redacts() {
        let cipher = SecretCipher::from_passphrase("key");
        assert!(format!("{:?}", cipher).contains("<redacted>"));
    }
}
