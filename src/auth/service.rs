use crate::auth::normalize_email;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::session::{SessionStore, generate_token, token_key};
use crate::config::AuthConfig;
use crate::core::repository::{NewUser, UserRepository};
use crate::core::types::{Role, User};
use crate::core::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Issued on register and login
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub expires_in: u64,
    pub user: User,
}

pub struct AuthService {
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionStore>,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionStore>,
        config: AuthConfig,
    ) -> Self {
        Self { users, sessions, config }
    }

    fn check_password(&self, password: &str) -> DomainResult<()> {
        if password.chars().count() < self.config.min_password_len {
            return Err(DomainError::Validation(format!(
                "password must be at least {} characters",
                self.config.min_password_len
            )));
        }
        Ok(())
    }

    async fn hash(password: String) -> DomainResult<String> {
        tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| DomainError::Upstream(e.to_string()))?
            .map_err(|e| DomainError::Upstream(e.to_string()))
    }

    async fn create_account(&self, registration: Registration, role: Role) -> DomainResult<User> {
        let email = normalize_email(&registration.email)
            .ok_or_else(|| DomainError::Validation("invalid email address".into()))?;
        let name = registration.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::Validation("name is required".into()));
        }
        self.check_password(&registration.password)?;

        let password_hash = Self::hash(registration.password).await?;
        let user = self.users.create(NewUser { email, password_hash, name, role }).await?;
        info!(user_id = %user.id, role = %user.role, "Account created");
        Ok(user)
    }

    async fn issue(&self, user: User) -> DomainResult<Session> {
        let token = generate_token();
        self.sessions.put(&token_key(&token), user.id, self.config.session_ttl_secs).await?;
        Ok(Session { token, expires_in: self.config.session_ttl_secs, user })
    }

    pub async fn register(&self, registration: Registration) -> DomainResult<Session> {
        let user = self.create_account(registration, Role::Member).await?;
        self.issue(user).await
    }

    /// Create an admin, or promote an existing account with the same email
    pub async fn create_admin(&self, registration: Registration) -> DomainResult<User> {
        let email = normalize_email(&registration.email)
            .ok_or_else(|| DomainError::Validation("invalid email address".into()))?;
        if let Some(existing) = self.users.get_by_email(&email).await? {
            return Ok(self.users.set_role(existing.id, Role::Admin).await?);
        }
        self.create_account(registration, Role::Admin).await
    }

    pub async fn login(&self, credentials: Credentials) -> DomainResult<Session> {
        let invalid = || DomainError::Unauthorized("invalid email or password".into());

        let email = normalize_email(&credentials.email).ok_or_else(invalid)?;
        let user = self.users.get_by_email(&email).await?.ok_or_else(invalid)?;

        let stored = user.password_hash.clone();
        let password = credentials.password;
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
            .await
            .map_err(|e| DomainError::Upstream(e.to_string()))?
            .map_err(|e| {
                warn!(user_id = %user.id, "Unusable password hash: {}", e);
                invalid()
            })?;
        if !matches {
            return Err(invalid());
        }

        self.issue(user).await
    }

    /// Revoke a token; unknown tokens are not an error
    pub async fn logout(&self, token: &str) -> DomainResult<()> {
        self.sessions.delete(&token_key(token)).await?;
        Ok(())
    }

    /// Resolve a bearer token to its user
    pub async fn authenticate(&self, token: &str) -> DomainResult<User> {
        let unauthorized = || DomainError::Unauthorized("session expired or invalid".into());
        let user_id = self.sessions.get(&token_key(token)).await?.ok_or_else(unauthorized)?;
        self.users.get(user_id).await?.ok_or_else(unauthorized)
    }
}
