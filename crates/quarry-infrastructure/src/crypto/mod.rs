//! Cryptography services
//!
//! The SecretBox guarding credentials at rest, Argon2 password hashing
//! and the JWT codec behind the auth adapter port.

mod jwt;
mod password;
mod secret_box;

pub use jwt::JwtCodec;
pub use password::PasswordService;
pub use secret_box::AesGcmSecretBox;

use std::sync::Arc;
use std::time::Duration;

use quarry_domain::entities::AuthContext;
use quarry_domain::error::Result;
use quarry_domain::ports::AuthAdapter;

/// Auth adapter combining Argon2 hashing with JWT issuance
pub struct CryptoAuthAdapter {
    passwords: PasswordService,
    tokens: Arc<JwtCodec>,
}

impl CryptoAuthAdapter {
    pub fn new(tokens: Arc<JwtCodec>) -> Self {
        Self {
            passwords: PasswordService::new(),
            tokens,
        }
    }
}

impl AuthAdapter for CryptoAuthAdapter {
    fn hash_password(&self, password: &str) -> Result<String> {
        self.passwords.hash_password(password)
    }

    fn verify_password(&self, password: &str, hash: &str) -> Result<bool> {
        self.passwords.verify_password(password, hash)
    }

    fn generate_token(&self, ctx: &AuthContext, ttl: Duration) -> Result<String> {
        self.tokens.generate(ctx, ttl)
    }

    fn parse_token(&self, token: &str) -> Result<AuthContext> {
        self.tokens.parse(token)
    }
}
