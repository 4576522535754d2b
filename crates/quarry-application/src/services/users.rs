//! User management service

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use quarry_domain::entities::{AuthContext, Role, Settings, User, UserSummary};
use quarry_domain::error::{Error, ErrorKind, Result};
use quarry_domain::ids::new_id;
use quarry_domain::ports::{AuthAdapter, SessionStore, SettingsStore, UserStore};

/// Request to create a user
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub email: String,
    pub name: String,
    pub password: String,
    pub role: Role,
}

/// User CRUD plus the one-shot bootstrap
pub struct UserService {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    settings: Arc<dyn SettingsStore>,
    adapter: Arc<dyn AuthAdapter>,
}

impl UserService {
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

    /// Bootstrap the first admin and their team
    ///
    /// Runs exactly once: fails `Forbidden` as soon as any user exists.
    pub async fn setup(&self, email: &str, name: &str, password: &str) -> Result<UserSummary> {
        if self.users.count().await? > 0 {
            return Err(Error::forbidden("setup already completed"));
        }
        validate_new_user(email, password)?;

        let team_id = new_id();
        let user = self
            .insert_user(
                &team_id,
                CreateUser {
                    email: email.into(),
                    name: name.into(),
                    password: password.into(),
                    role: Role::Admin,
                },
            )
            .await?;
        self.settings.save(&Settings::for_team(&team_id)).await?;
        info!(user_id = %user.id, "initial admin created");
        Ok(user)
    }

    /// Create a user in the caller's team
    pub async fn create(&self, ctx: &AuthContext, req: CreateUser) -> Result<UserSummary> {
        ctx.require_admin()?;
        validate_new_user(&req.email, &req.password)?;
        match self.users.get_by_email(&req.email).await {
            Ok(_) => return Err(Error::already_exists(format!("user {}", req.email))),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        self.insert_user(&ctx.team_id, req).await
    }

    pub async fn get(&self, ctx: &AuthContext, id: &str) -> Result<UserSummary> {
        let user = self.users.get(id).await?;
        self.check_same_team(ctx, &user)?;
        Ok(user.summary())
    }

    pub async fn get_by_email(&self, ctx: &AuthContext, email: &str) -> Result<UserSummary> {
        let user = self.users.get_by_email(email).await?;
        self.check_same_team(ctx, &user)?;
        Ok(user.summary())
    }

    pub async fn list(&self, ctx: &AuthContext) -> Result<Vec<UserSummary>> {
        let mut users: Vec<UserSummary> = self
            .users
            .list(&ctx.team_id)
            .await?
            .iter()
            .map(User::summary)
            .collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }

    /// Update name and role; role changes are admin-only
    pub async fn update(
        &self,
        ctx: &AuthContext,
        id: &str,
        name: Option<String>,
        role: Option<Role>,
    ) -> Result<UserSummary> {
        let mut user = self.users.get(id).await?;
        self.check_same_team(ctx, &user)?;
        if ctx.user_id != id || role.is_some() {
            ctx.require_admin()?;
        }
        if let Some(name) = name {
            user.name = name;
        }
        if let Some(role) = role {
            user.role = role;
        }
        user.updated_at = Utc::now();
        self.users.save(&user).await?;
        Ok(user.summary())
    }

    /// Remove a user and their sessions
    pub async fn delete(&self, ctx: &AuthContext, id: &str) -> Result<()> {
        ctx.require_admin()?;
        if ctx.user_id == id {
            return Err(Error::invalid_input("cannot delete the calling user"));
        }
        let user = self.users.get(id).await?;
        self.check_same_team(ctx, &user)?;
        self.sessions.delete_for_user(id).await?;
        self.users.delete(id).await?;
        info!(user_id = %id, "user deleted");
        Ok(())
    }

    /// Reset a user's password, invalidating their sessions
    pub async fn set_password(&self, ctx: &AuthContext, id: &str, password: &str) -> Result<()> {
        ctx.require_admin()?;
        if password.len() < 8 {
            return Err(Error::invalid_input("password must be at least 8 characters"));
        }
        let mut user = self.users.get(id).await?;
        self.check_same_team(ctx, &user)?;
        user.password_hash = self.adapter.hash_password(password)?;
        user.updated_at = Utc::now();
        self.users.save(&user).await?;
        self.sessions.delete_for_user(id).await?;
        Ok(())
    }

    async fn insert_user(&self, team_id: &str, req: CreateUser) -> Result<UserSummary> {
        let now = Utc::now();
        let user = User {
            id: new_id(),
            email: req.email,
            name: req.name,
            password_hash: self.adapter.hash_password(&req.password)?,
            role: req.role,
            team_id: team_id.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.users.save(&user).await?;
        Ok(user.summary())
    }

    fn check_same_team(&self, ctx: &AuthContext, user: &User) -> Result<()> {
        if user.team_id != ctx.team_id {
            // Cross-team rows are invisible, not forbidden
            return Err(Error::not_found(format!("user {}", user.id)));
        }
        Ok(())
    }
}

fn validate_new_user(email: &str, password: &str) -> Result<()> {
    if !email.contains('@') {
        return Err(Error::invalid_input("invalid email address"));
    }
    if password.len() < 8 {
        return Err(Error::invalid_input("password must be at least 8 characters"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testsupport::{mock_auth_adapter, stores};

    fn service() -> UserService {
        let (users, sessions, settings) = stores();
        UserService::new(users, sessions, settings, mock_auth_adapter())
    }

    #[tokio::test]
    async fn setup_is_one_shot() {
        let service = service();
        let admin = service
            .setup("admin@quarry.dev", "Admin", "password-1")
            .await
            .unwrap();
        assert_eq!(admin.role, Role::Admin);

        let err = service
            .setup("second@quarry.dev", "Nope", "password-2")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn create_requires_admin_and_unique_email() {
        let service = service();
        let admin = service
            .setup("admin@quarry.dev", "Admin", "password-1")
            .await
            .unwrap();
        let ctx = AuthContext {
            user_id: admin.id.clone(),
            email: admin.email.clone(),
            role: Role::Admin,
            team_id: admin.team_id.clone(),
            session_id: "ses1".into(),
        };

        let req = CreateUser {
            email: "m@quarry.dev".into(),
            name: "M".into(),
            password: "password-2".into(),
            role: Role::Member,
        };
        service.create(&ctx, req.clone()).await.unwrap();
        assert_eq!(
            service.create(&ctx, req.clone()).await.unwrap_err().kind(),
            ErrorKind::AlreadyExists
        );

        let member_ctx = AuthContext {
            role: Role::Member,
            ..ctx
        };
        let req2 = CreateUser {
            email: "v@quarry.dev".into(),
            ..req
        };
        assert_eq!(
            service.create(&member_ctx, req2).await.unwrap_err().kind(),
            ErrorKind::Forbidden
        );
    }

    #[tokio::test]
    async fn admin_cannot_delete_self() {
        let service = service();
        let admin = service
            .setup("admin@quarry.dev", "Admin", "password-1")
            .await
            .unwrap();
        let ctx = AuthContext {
            user_id: admin.id.clone(),
            email: admin.email,
            role: Role::Admin,
            team_id: admin.team_id,
            session_id: "ses1".into(),
        };
        assert_eq!(
            service.delete(&ctx, &admin.id).await.unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
    }
}
