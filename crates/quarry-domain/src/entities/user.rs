//! User, session and auth-context entities
//!
//! Identity is in scope only as the gate producing an [`AuthContext`];
//! every exposed service call carries one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Team role, ordered by privilege
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Member,
    Viewer,
}

/// A team member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    /// Argon2 hash; never serialised with the row
    #[serde(skip)]
    pub password_hash: String,
    pub role: Role,
    pub team_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Hash-free view for callers outside the core
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
            team_id: self.team_id.clone(),
            created_at: self.created_at,
        }
    }
}

/// Hash-free user view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub team_id: String,
    pub created_at: DateTime<Utc>,
}

/// A live login session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub team_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Authenticated caller identity threaded through every core call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: String,
    pub email: String,
    pub role: Role,
    pub team_id: String,
    pub session_id: String,
}

impl AuthContext {
    /// Reject callers below admin
    pub fn require_admin(&self) -> Result<()> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(Error::forbidden("admin role required"))
        }
    }

    /// Reject viewers; members and admins pass
    pub fn require_member(&self) -> Result<()> {
        match self.role {
            Role::Admin | Role::Member => Ok(()),
            Role::Viewer => Err(Error::forbidden("member role required")),
        }
    }
}
