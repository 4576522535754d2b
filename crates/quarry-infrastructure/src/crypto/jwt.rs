//! JWT session token codec
//!
//! HS256 tokens embedding the auth context as claims. Expiry is
//! validated with the library's default leeway; the session store
//! remains the authority on revocation.

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use quarry_domain::entities::{AuthContext, Role};
use quarry_domain::error::{Error, Result};

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    email: String,
    role: Role,
    team_id: String,
    session_id: String,
    iat: i64,
    exp: i64,
}

/// HS256 token codec
pub struct JwtCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtCodec {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    /// Issue a token for the context, valid for `ttl`
    pub fn generate(&self, ctx: &AuthContext, ttl: Duration) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: ctx.user_id.clone(),
            email: ctx.email.clone(),
            role: ctx.role,
            team_id: ctx.team_id.clone(),
            session_id: ctx.session_id.clone(),
            iat: now.timestamp(),
            exp: (now + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::hours(24)))
                .timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| Error::internal(format!("token encoding failed: {}", e)))
    }

    /// Validate a token and recover its context
    pub fn parse(&self, token: &str) -> Result<AuthContext> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default()).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => Error::TokenExpired,
                _ => Error::token_invalid(e.to_string()),
            },
        )?;
        Ok(AuthContext {
            user_id: data.claims.sub,
            email: data.claims.email,
            role: data.claims.role,
            team_id: data.claims.team_id,
            session_id: data.claims.session_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_domain::error::ErrorKind;

    fn ctx() -> AuthContext {
        AuthContext {
            user_id: "usr1".into(),
            email: "a@b.c".into(),
            role: Role::Admin,
            team_id: "team1".into(),
            session_id: "ses1".into(),
        }
    }

    #[test]
    fn round_trip_preserves_context() {
        let codec = JwtCodec::new(b"secret");
        let token = codec.generate(&ctx(), Duration::from_secs(60)).unwrap();
        let parsed = codec.parse(&token).unwrap();
        assert_eq!(parsed.user_id, "usr1");
        assert_eq!(parsed.session_id, "ses1");
        assert_eq!(parsed.role, Role::Admin);
    }

    #[test]
    fn wrong_secret_is_token_invalid() {
        let token = JwtCodec::new(b"secret-a")
            .generate(&ctx(), Duration::from_secs(60))
            .unwrap();
        let err = JwtCodec::new(b"secret-b").parse(&token).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TokenInvalid);
    }

    #[test]
    fn garbage_is_token_invalid() {
        let err = JwtCodec::new(b"secret").parse("definitely.not.ajwt").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TokenInvalid);
    }
}
