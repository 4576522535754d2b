//! SecretBox implementation using AES-256-GCM
//!
//! Authenticated encryption keyed by the process master key. Any
//! ciphertext or key tamper fails the open without detail; the key is
//! loaded once at startup and never logged.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose, Engine as _};
use rand::RngCore;

use quarry_domain::error::{Error, Result};
use quarry_domain::ports::{SealedSecret, SecretBox};

/// AES-256-GCM key size in bytes
const KEY_SIZE: usize = 32;

/// AES-GCM nonce size in bytes
const NONCE_SIZE: usize = 12;

/// SecretBox backed by AES-256-GCM
pub struct AesGcmSecretBox {
    master_key: Vec<u8>,
}

impl AesGcmSecretBox {
    /// Create a secret box from raw key bytes
    pub fn new(master_key: Vec<u8>) -> Result<Self> {
        if master_key.len() != KEY_SIZE {
            return Err(Error::invalid_input(format!(
                "master key must be {} bytes, got {}",
                KEY_SIZE,
                master_key.len()
            )));
        }
        Ok(Self { master_key })
    }

    /// Create from the base64 form stored in configuration
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let key = general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| Error::invalid_input(format!("master key is not base64: {}", e)))?;
        Self::new(key)
    }

    /// Generate a fresh random master key
    pub fn generate_key() -> Vec<u8> {
        let mut key = vec![0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut key);
        key
    }
}

impl SecretBox for AesGcmSecretBox {
    fn seal(&self, plaintext: &[u8]) -> Result<SealedSecret> {
        let key = Key::<Aes256Gcm>::from_slice(&self.master_key);
        let cipher = Aes256Gcm::new(key);
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let ciphertext = cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| Error::internal("secret seal failed"))?;
        Ok(SealedSecret {
            ciphertext,
            nonce: nonce.to_vec(),
        })
    }

    fn open(&self, sealed: &SealedSecret) -> Result<Vec<u8>> {
        if sealed.nonce.len() != NONCE_SIZE {
            return Err(Error::internal("sealed secret failed authentication"));
        }
        let key = Key::<Aes256Gcm>::from_slice(&self.master_key);
        let cipher = Aes256Gcm::new(key);
        let nonce = Nonce::from_slice(&sealed.nonce);

        cipher
            .decrypt(nonce, sealed.ciphertext.as_ref())
            .map_err(|_| Error::internal("sealed secret failed authentication"))
    }
}
