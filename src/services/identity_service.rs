use std::sync::Arc;

use crate::database::Store;
use crate::dto::auth_dto::{LoginPayload, SignupPayload};
use crate::error::{Error, Result};
use crate::models::user::{NewUser, Role, User};
use crate::utils::{crypto, time, token};

/// An authenticated user as seen by the lifecycle services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: i64,
    pub name: String,
    pub role: Role,
    pub is_admin: bool,
}

impl Actor {
    pub fn is_employer(&self) -> bool {
        self.role == Role::Employer
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            role: user.role,
            is_admin: user.is_admin,
        }
    }
}

/// The acting party of a request. Passed explicitly into every service call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Principal {
    #[default]
    Anonymous,
    User(Actor),
}

impl Principal {
    pub fn actor(&self) -> Option<&Actor> {
        match self {
            Principal::User(actor) => Some(actor),
            Principal::Anonymous => None,
        }
    }

    pub fn user_id(&self) -> Option<i64> {
        self.actor().map(|a| a.id)
    }

    pub fn require_authenticated(&self) -> Result<&Actor> {
        self.actor()
            .ok_or_else(|| Error::Unauthorized("Not authenticated".into()))
    }

    pub fn require_admin(&self) -> Result<&Actor> {
        let actor = self.require_authenticated()?;
        if !actor.is_admin {
            return Err(Error::Forbidden("Admin access required".into()));
        }
        Ok(actor)
    }
}

#[derive(Clone)]
pub struct IdentityService {
    store: Arc<dyn Store>,
    session_ttl_hours: i64,
}

impl IdentityService {
    pub fn new(store: Arc<dyn Store>, session_ttl_hours: i64) -> Self {
        Self {
            store,
            session_ttl_hours,
        }
    }

    pub async fn signup(&self, payload: SignupPayload) -> Result<User> {
        let email = payload.email.trim().to_lowercase();
        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(Error::Conflict("Email already registered".into()));
        }
        let password_hash = crypto::hash_password(&payload.password)
            .map_err(|e| Error::Internal(format!("password hashing failed: {}", e)))?;

        let user = self
            .store
            .insert_user(NewUser {
                name: payload.name.trim().to_string(),
                email,
                password_hash,
                role: payload.role.unwrap_or(Role::Trainee),
                is_admin: false,
            })
            .await?;
        tracing::info!(user_id = user.id, role = %user.role, "user signed up");
        Ok(user)
    }

    /// Verifies the credentials and opens a session. Returns the raw token;
    /// only its digest is stored.
    pub async fn login(&self, payload: LoginPayload) -> Result<(User, String)> {
        let email = payload.email.trim().to_lowercase();
        let user = self
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or_else(|| Error::Unauthorized("Invalid credentials".into()))?;

        let valid = crypto::verify_password(&payload.password, &user.password_hash)
            .map_err(|e| Error::Internal(format!("stored password hash unreadable: {}", e)))?;
        if !valid {
            return Err(Error::Unauthorized("Invalid credentials".into()));
        }

        let raw = token::generate_session_token();
        self.store
            .insert_session(
                &crypto::hash_token(&raw),
                user.id,
                time::hours_from_now(self.session_ttl_hours),
            )
            .await?;
        tracing::info!(user_id = user.id, "session opened");
        Ok((user, raw))
    }

    pub async fn logout(&self, raw_token: &str) -> Result<()> {
        self.store
            .delete_session(&crypto::hash_token(raw_token))
            .await
    }

    /// Never fails: unknown, expired or unreadable sessions are anonymous.
    pub async fn resolve(&self, raw_token: Option<&str>) -> Principal {
        let Some(raw) = raw_token.filter(|t| !t.is_empty()) else {
            return Principal::Anonymous;
        };

        let session = match self.store.find_session(&crypto::hash_token(raw)).await {
            Ok(Some(session)) if !session.is_expired(time::now()) => session,
            Ok(_) => return Principal::Anonymous,
            Err(e) => {
                tracing::warn!(error = %e, "session lookup failed, treating request as anonymous");
                return Principal::Anonymous;
            }
        };

        match self.store.find_user(session.user_id).await {
            Ok(Some(user)) => Principal::User(Actor::from(&user)),
            Ok(None) => Principal::Anonymous,
            Err(e) => {
                tracing::warn!(user_id = session.user_id, error = %e, "principal lookup failed");
                Principal::Anonymous
            }
        }
    }

    pub async fn current_user(&self, principal: &Principal) -> Result<Option<User>> {
        match principal.user_id() {
            Some(id) => self.store.find_user(id).await,
            None => Ok(None),
        }
    }

    pub async fn purge_expired_sessions(&self) -> Result<u64> {
        self.store.purge_expired_sessions(time::now()).await
    }

    /// Creates the configured admin account unless the email is already taken.
    pub async fn bootstrap_admin(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<Option<User>> {
        let email = email.trim().to_lowercase();
        if self.store.find_user_by_email(&email).await?.is_some() {
            return Ok(None);
        }
        let password_hash = crypto::hash_password(password)
            .map_err(|e| Error::Internal(format!("password hashing failed: {}", e)))?;
        let user = self
            .store
            .insert_user(NewUser {
                name: name.unwrap_or("Administrator").to_string(),
                email,
                password_hash,
                role: Role::Trainee,
                is_admin: true,
            })
            .await?;
        tracing::info!(user_id = user.id, "bootstrap admin created");
        Ok(Some(user))
    }
}
