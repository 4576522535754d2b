//! User and session stores

use async_trait::async_trait;
use dashmap::DashMap;

use quarry_domain::entities::{Session, User};
use quarry_domain::error::{Error, Result};
use quarry_domain::ports::{SessionStore, UserStore};

/// User rows keyed by id, unique by email
#[derive(Default)]
pub struct InMemoryUserStore {
    users: DashMap<String, User>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn save(&self, user: &User) -> Result<()> {
        let conflict = self
            .users
            .iter()
            .any(|u| u.email == user.email && u.id != user.id);
        if conflict {
            return Err(Error::already_exists(format!("user {}", user.email)));
        }
        self.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<User> {
        self.users
            .get(id)
            .map(|u| u.clone())
            .ok_or_else(|| Error::not_found(format!("user {}", id)))
    }

    async fn get_by_email(&self, email: &str) -> Result<User> {
        self.users
            .iter()
            .find(|u| u.email == email)
            .map(|u| u.clone())
            .ok_or_else(|| Error::not_found(format!("user {}", email)))
    }

    async fn list(&self, team_id: &str) -> Result<Vec<User>> {
        Ok(self
            .users
            .iter()
            .filter(|u| u.team_id == team_id)
            .map(|u| u.clone())
            .collect())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.users
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Error::not_found(format!("user {}", id)))
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.users.len() as u64)
    }
}

/// Session rows keyed by id
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<String, Session>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn save(&self, session: &Session) -> Result<()> {
        self.sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Session> {
        self.sessions
            .get(id)
            .map(|s| s.clone())
            .ok_or_else(|| Error::not_found(format!("session {}", id)))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.sessions.remove(id);
        Ok(())
    }

    async fn delete_for_user(&self, user_id: &str) -> Result<u64> {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| s.user_id != user_id);
        Ok((before - self.sessions.len()) as u64)
    }
}
