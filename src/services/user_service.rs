use std::sync::Arc;

use crate::database::Store;
use crate::error::{Error, Result};
use crate::models::{
    application::ApplicationScope,
    user::{AccountChanges, ProfileChanges, Role, User},
};
use crate::services::cascade::CascadeReport;
use crate::services::identity_service::{Actor, Principal};
use crate::services::offer_service::OfferService;
use crate::storage::{FileStore, Upload, IMAGE_EXTENSIONS};
use crate::utils::{crypto, time, token};

pub const PROFILE_PIC_NAMESPACE: &str = "users";
const NAME_CHANGE_LIMIT: i64 = 2;
const NAME_CHANGE_WINDOW_DAYS: i64 = 30;
const TEMPORARY_PASSWORD_LENGTH: usize = 10;

#[derive(Debug, Clone, Default)]
pub struct ProfileEdit {
    pub name: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
}

/// Fields an admin may change on any account.
#[derive(Debug, Clone, Default)]
pub struct AdminUserEdit {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub is_admin: Option<bool>,
    pub password: Option<String>,
}

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn Store>,
    files: Arc<dyn FileStore>,
    offers: OfferService,
}

fn hash(password: &str) -> Result<String> {
    crypto::hash_password(password)
        .map_err(|e| Error::Internal(format!("password hashing failed: {}", e)))
}

impl UserService {
    pub fn new(store: Arc<dyn Store>, files: Arc<dyn FileStore>, offers: OfferService) -> Self {
        Self {
            store,
            files,
            offers,
        }
    }

    pub async fn list_users(&self, principal: &Principal) -> Result<Vec<User>> {
        let admin = principal.require_admin()?;
        self.store.list_users_except(admin.id).await
    }

    pub async fn update_profile(
        &self,
        principal: &Principal,
        edit: ProfileEdit,
        picture: Option<Upload>,
    ) -> Result<User> {
        let actor = principal.require_authenticated()?;
        let current = self
            .store
            .find_user(actor.id)
            .await?
            .ok_or_else(|| Error::NotFound("User not found".into()))?;

        let name = edit
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty() && *n != current.name);
        if name.is_some() {
            let since = time::days_ago(NAME_CHANGE_WINDOW_DAYS);
            let recent = self.store.count_name_changes_since(actor.id, since).await?;
            if recent >= NAME_CHANGE_LIMIT {
                return Err(Error::Forbidden(
                    "Name change limit reached (2 changes per 30 days)".into(),
                ));
            }
        }

        let email = edit
            .email
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty() && *e != current.email);
        if let Some(email) = &email {
            if self.store.find_user_by_email(email).await?.is_some() {
                return Err(Error::Conflict("Email already in use".into()));
            }
        }

        let profile_pic = match picture.filter(|u| !u.is_empty()) {
            Some(upload) => Some(
                self.files
                    .store(PROFILE_PIC_NAMESPACE, "user", &upload, IMAGE_EXTENSIONS)
                    .await?,
            ),
            None => None,
        };

        let changes = ProfileChanges {
            name: name.clone(),
            email,
            bio: edit.bio,
            profile_pic: profile_pic.clone(),
        };
        let updated = match self.store.update_profile(actor.id, changes).await {
            Ok(user) => user,
            Err(e) => {
                if let Some(path) = profile_pic.as_deref() {
                    self.discard_file(path).await;
                }
                return Err(e);
            }
        };

        if let Some(new_name) = &name {
            if let Err(e) = self
                .store
                .record_name_change(actor.id, &current.name, new_name)
                .await
            {
                tracing::warn!(user_id = actor.id, error = %e, "failed to record name change");
            }
        }
        if profile_pic.is_some() {
            if let Some(old) = current.profile_pic.as_deref() {
                self.discard_file(old).await;
            }
        }

        tracing::info!(user_id = actor.id, "profile updated");
        Ok(updated)
    }

    /// Admin only. Every dependent step is best-effort; the user row delete
    /// is the one whose failure is reported.
    pub async fn delete_user(&self, principal: &Principal, id: i64) -> Result<CascadeReport> {
        let admin = principal.require_admin()?;
        let user = self
            .store
            .find_user(id)
            .await?
            .ok_or_else(|| Error::NotFound("User not found".into()))?;

        let mut report = CascadeReport::new(format!("user {}", id));

        let posts = report.record("load_posts", self.store.posts_by_user(id).await);
        for post in posts.unwrap_or_default() {
            if let Some(path) = post.image_path.as_deref() {
                report.record("delete_post_image", self.files.delete(path).await);
            }
        }
        report.record("delete_posts", self.store.delete_posts_by_user(id).await);
        report.record("delete_likes", self.store.delete_likes_by_user(id).await);
        report.record(
            "delete_name_changes",
            self.store.delete_name_changes(id).await,
        );
        report.record(
            "delete_comments",
            self.store.delete_comments_by_user(id).await,
        );
        report.record("delete_follows", self.store.delete_follows_for_user(id).await);
        report.record(
            "delete_notifications",
            self.store.delete_notifications_for_user(id).await,
        );

        let applications = report.record(
            "load_applications",
            self.store
                .list_applications(&ApplicationScope::Applicant(id), None)
                .await,
        );
        for application in applications.unwrap_or_default() {
            if let Some(path) = application.resume_path.as_deref() {
                report.record("delete_resume_file", self.files.delete(path).await);
            }
            report.record(
                "delete_application",
                self.store.delete_application(application.id).await,
            );
        }

        if user.role == Role::Employer {
            let owner = Actor::from(&user);
            let removed = self.offers.purge_owned_by(&owner, &mut report).await;
            tracing::info!(user_id = id, removed, "employer internships removed");
            report.record(
                "delete_hotel_ratings",
                self.store.delete_ratings_for_hotel(&user.name).await,
            );
        }

        if !self.store.delete_user(id).await? {
            return Err(Error::NotFound("User not found".into()));
        }

        if let Some(path) = user.profile_pic.as_deref() {
            report.record("delete_profile_pic", self.files.delete(path).await);
        }

        if report.is_clean() {
            tracing::info!(user_id = id, admin_id = admin.id, "user deleted");
        } else {
            tracing::warn!(
                user_id = id,
                admin_id = admin.id,
                failed_steps = report.failures.len(),
                "user deleted with cleanup failures"
            );
        }
        Ok(report)
    }

    /// Admin only. A new password revokes the user's open sessions.
    pub async fn admin_update(
        &self,
        principal: &Principal,
        id: i64,
        edit: AdminUserEdit,
    ) -> Result<User> {
        let admin = principal.require_admin()?;
        let email = edit
            .email
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty());
        if let Some(email) = &email {
            if let Some(owner) = self.store.find_user_by_email(email).await? {
                if owner.id != id {
                    return Err(Error::Conflict("Email already in use".into()));
                }
            }
        }
        let password_hash = match edit.password.filter(|p| !p.is_empty()) {
            Some(password) => Some(hash(&password)?),
            None => None,
        };
        let changes = AccountChanges {
            name: edit
                .name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            email,
            role: edit.role,
            is_admin: edit.is_admin,
            password_hash,
        };
        if changes.is_empty() {
            return Err(Error::BadRequest("No fields to update".into()));
        }

        let password_changed = changes.password_hash.is_some();
        let user = self
            .store
            .update_account(id, changes)
            .await?
            .ok_or_else(|| Error::NotFound("User not found".into()))?;
        if password_changed {
            self.revoke_sessions(id).await;
        }
        tracing::info!(user_id = id, admin_id = admin.id, "account updated by admin");
        Ok(user)
    }

    /// Admin only. Returns the new password, generated when none is given.
    pub async fn reset_password(
        &self,
        principal: &Principal,
        id: i64,
        password: Option<String>,
    ) -> Result<String> {
        let admin = principal.require_admin()?;
        let password = password
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| token::generate_access_token(TEMPORARY_PASSWORD_LENGTH));
        let changes = AccountChanges {
            password_hash: Some(hash(&password)?),
            ..AccountChanges::default()
        };
        self.store
            .update_account(id, changes)
            .await?
            .ok_or_else(|| Error::NotFound("User not found".into()))?;
        self.revoke_sessions(id).await;
        tracing::info!(user_id = id, admin_id = admin.id, "password reset by admin");
        Ok(password)
    }

    async fn revoke_sessions(&self, user_id: i64) {
        match self.store.delete_sessions_for_user(user_id).await {
            Ok(revoked) => tracing::debug!(user_id, revoked, "sessions revoked"),
            Err(e) => tracing::warn!(user_id, error = %e, "failed to revoke sessions"),
        }
    }

    async fn discard_file(&self, path: &str) {
        if let Err(e) = self.files.delete(path).await {
            tracing::warn!(path, error = %e, "failed to remove profile picture");
        }
    }
}
