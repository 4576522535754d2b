//! Authentication service
//!
//! The identity gate. Produces the `AuthContext` every other service
//! consumes; sessions live in the session store, tokens are issued and
//! parsed through the auth adapter.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info};

use quarry_domain::entities::{AuthContext, Session};
use quarry_domain::error::{Error, ErrorKind, Result};
use quarry_domain::ids::new_id;
use quarry_domain::ports::{AuthAdapter, SessionStore, SettingsStore, UserStore};

/// A successful login
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub context: AuthContext,
    pub expires_at: chrono::DateTime<Utc>,
}

/// Login, token validation and session lifecycle
pub struct AuthService {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    settings: Arc<dyn SettingsStore>,
    adapter: Arc<dyn AuthAdapter>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        settings: Arc<dyn SettingsStore>,
        adapter: Arc<dyn AuthAdapter>,
    ) -> Self {
        Self {
            users,
            sessions,
            settings,
            adapter,
        }
    }

    /// Verify credentials and open a session
    ///
    /// Unknown emails and wrong passwords are indistinguishable to the
    /// caller.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<AuthSession> {
        let user = match self.users.get_by_email(email).await {
            Ok(user) => user,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(Error::InvalidCredentials),
            Err(e) => return Err(e),
        };
        if !self.adapter.verify_password(password, &user.password_hash)? {
            return Err(Error::InvalidCredentials);
        }

        let ttl = self
            .settings
            .get(&user.team_id)
            .await
            .map(|s| s.session_ttl)
            .unwrap_or(std::time::Duration::from_secs(24 * 3600));
        let now = Utc::now();
        let expires_at = now + Duration::from_std(ttl).unwrap_or(Duration::hours(24));

        let session = Session {
            id: new_id(),
            user_id: user.id.clone(),
            team_id: user.team_id.clone(),
            created_at: now,
            expires_at,
            last_seen_at: now,
        };
        self.sessions.save(&session).await?;

        let context = AuthContext {
            user_id: user.id,
            email: user.email,
            role: user.role,
            team_id: user.team_id,
            session_id: session.id,
        };
        let token = self.adapter.generate_token(&context, ttl)?;
        info!(user_id = %context.user_id, "user authenticated");

        Ok(AuthSession {
            token,
            context,
            expires_at,
        })
    }

    /// Validate a bearer token against its live session
    pub async fn validate_token(&self, token: &str) -> Result<AuthContext> {
        let context = self.adapter.parse_token(token)?;
        let mut session = match self.sessions.get(&context.session_id).await {
            Ok(session) => session,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(Error::SessionNotFound),
            Err(e) => return Err(e),
        };
        let now = Utc::now();
        if session.is_expired(now) {
            self.sessions.delete(&session.id).await?;
            return Err(Error::SessionNotFound);
        }
        session.last_seen_at = now;
        self.sessions.save(&session).await?;
        Ok(context)
    }

    /// Issue a fresh token for a still-live session
    pub async fn refresh_token(&self, token: &str) -> Result<AuthSession> {
        let context = self.validate_token(token).await?;
        let ttl = self
            .settings
            .get(&context.team_id)
            .await
            .map(|s| s.session_ttl)
            .unwrap_or(std::time::Duration::from_secs(24 * 3600));
        let now = Utc::now();
        let expires_at = now + Duration::from_std(ttl).unwrap_or(Duration::hours(24));

        let mut session = self.sessions.get(&context.session_id).await?;
        session.expires_at = expires_at;
        session.last_seen_at = now;
        self.sessions.save(&session).await?;

        let token = self.adapter.generate_token(&context, ttl)?;
        Ok(AuthSession {
            token,
            context,
            expires_at,
        })
    }

    /// Close the caller's session
    pub async fn logout(&self, ctx: &AuthContext) -> Result<()> {
        debug!(session_id = %ctx.session_id, "logout");
        self.sessions.delete(&ctx.session_id).await
    }

    /// Close every session of the caller's user
    pub async fn logout_all(&self, ctx: &AuthContext) -> Result<u64> {
        self.sessions.delete_for_user(&ctx.user_id).await
    }

    /// Change the caller's password, invalidating all their sessions
    pub async fn change_password(
        &self,
        ctx: &AuthContext,
        current: &str,
        new_password: &str,
    ) -> Result<()> {
        if new_password.len() < 8 {
            return Err(Error::invalid_input("password must be at least 8 characters"));
        }
        let mut user = self.users.get(&ctx.user_id).await?;
        if !self.adapter.verify_password(current, &user.password_hash)? {
            return Err(Error::InvalidCredentials);
        }
        user.password_hash = self.adapter.hash_password(new_password)?;
        user.updated_at = Utc::now();
        self.users.save(&user).await?;
        self.sessions.delete_for_user(&user.id).await?;
        info!(user_id = %user.id, "password changed");
        Ok(())
    }
}
