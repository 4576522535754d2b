//! Crypto ports

use crate::entities::AuthContext;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// An authenticated-encryption envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealedSecret {
    pub ciphertext: Vec<u8>,
    pub nonce: Vec<u8>,
}

/// Authenticated encryption keyed by the process master key
///
/// `open` fails on any tamper or key mismatch; the failure carries no
/// plaintext detail.
pub trait SecretBox: Send + Sync {
    fn seal(&self, plaintext: &[u8]) -> Result<SealedSecret>;
    fn open(&self, sealed: &SealedSecret) -> Result<Vec<u8>>;
}

/// Password hashing and token issuance for the identity gate
pub trait AuthAdapter: Send + Sync {
    fn hash_password(&self, password: &str) -> Result<String>;
    fn verify_password(&self, password: &str, hash: &str) -> Result<bool>;
    /// Issue a signed token embedding the auth context
    fn generate_token(&self, ctx: &AuthContext, ttl: Duration) -> Result<String>;
    /// Validate a token and recover its auth context
    fn parse_token(&self, token: &str) -> Result<AuthContext>;
}
