use argon2::Argon2;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;

/// Domain separation for the key derivation. The passphrase is the only secret input.
const KDF_SALT: &[u8] = b"yapd/credential-store/v1";

/// ChaCha20-Poly1305 nonce size in bytes
const NONCE_LEN: usize = 12;

/// Poly1305 tag size in bytes
const TAG_LEN: usize = 16;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("master passphrase is empty")]
    EmptyPassphrase,

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("encryption failed")]
    Encrypt,

    #[error("decryption failed - wrong passphrase or tampered record")]
    Decrypt,

    #[error("malformed ciphertext: {0}")]
    Encoding(String),
}

/// Seals secrets for the credential file.
///
/// Each record is `hex(nonce || ciphertext || tag)` with a fresh random
/// nonce, so equal secrets never produce equal records.
pub struct SecretCipher {
    cipher: ChaCha20Poly1305,
}

impl SecretCipher {
    /// Derive the store key from the operator passphrase with Argon2id.
    /// Deliberately slow; call once per process and share the result.
    pub fn from_passphrase(passphrase: &str) -> Result<Self, CryptoError> {
        if passphrase.is_empty() {
            return Err(CryptoError::EmptyPassphrase);
        }
        let mut key = [0u8; 32];
        Argon2::default()
            .hash_password_into(passphrase.as_bytes(), KDF_SALT, &mut key)
            .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
        Ok(Self::from_key(key))
    }

    pub fn from_key(key: [u8; 32]) -> Self {
        Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(&key)),
        }
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let sealed = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|_| CryptoError::Encrypt)?;

        let mut record = Vec::with_capacity(NONCE_LEN + sealed.len());
        record.extend_from_slice(&nonce);
        record.extend_from_slice(&sealed);
        Ok(hex::encode(record))
    }

    pub fn decrypt(&self, record: &str) -> Result<String, CryptoError> {
        let bytes = hex::decode(record.trim()).map_err(|e| CryptoError::Encoding(e.to_string()))?;
        if bytes.len() < NONCE_LEN + TAG_LEN {
            return Err(CryptoError::Encoding(format!(
                "record is {} bytes, shorter than nonce and tag",
                bytes.len()
            )));
        }

        let (nonce, sealed) = bytes.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| CryptoError::Decrypt)?;

        String::from_utf8(plaintext).map_err(|e| CryptoError::Encoding(e.to_string()))
    }
}
