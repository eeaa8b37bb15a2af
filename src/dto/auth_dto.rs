use chrono::{DateTime, Utc};
use serde::Serialize;
use validator::Validate;

use crate::dto::submission::Submission;
use crate::error::{Error, Result};
use crate::models::user::{Role, User};

#[derive(Debug, Clone, Validate)]
pub struct SignupPayload {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, max = 128))]
    pub password: String,
    pub role: Option<Role>,
}

impl SignupPayload {
    pub fn from_submission(submission: &Submission) -> Result<Self> {
        let role = submission
            .text("type")
            .map(|raw| raw.to_lowercase().parse::<Role>())
            .transpose()
            .map_err(Error::BadRequest)?;
        Ok(Self {
            name: submission.text("name").unwrap_or_default(),
            email: submission.text("email").unwrap_or_default(),
            password: submission.raw_text("password").unwrap_or_default(),
            role,
        })
    }
}

#[derive(Debug, Clone, Validate)]
pub struct LoginPayload {
    #[validate(length(min = 1))]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

impl LoginPayload {
    pub fn from_submission(submission: &Submission) -> Self {
        Self {
            email: submission.text("email").unwrap_or_default(),
            password: submission.raw_text("password").unwrap_or_default(),
        }
    }
}

/// What clients see of a user.
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(rename = "type")]
    pub role: Role,
    pub is_admin: bool,
    pub bio: Option<String>,
    pub profile_pic: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            is_admin: user.is_admin,
            bio: user.bio,
            profile_pic: user.profile_pic,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserEnvelope {
    pub user: Option<UserView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserList {
    pub users: Vec<UserView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub user: UserView,
    pub token: String,
}

#[derive(Debug, Clone, Default, Validate)]
pub struct ProfilePayload {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 2000))]
    pub bio: Option<String>,
}

/// Admin edit of any account. Every field is optional.
#[derive(Debug, Clone, Default, Validate)]
pub struct AdminUserPayload {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub role: Option<Role>,
    pub is_admin: Option<bool>,
    #[validate(length(min = 6, max = 128))]
    pub password: Option<String>,
}

impl AdminUserPayload {
    pub fn from_submission(submission: &Submission) -> Result<Self> {
        let role = submission
            .text("type")
            .map(|raw| raw.to_lowercase().parse::<Role>())
            .transpose()
            .map_err(Error::BadRequest)?;
        Ok(Self {
            name: submission.text("name"),
            email: submission.text("email"),
            role,
            is_admin: submission.boolean("is_admin")?,
            password: submission.raw_text("password"),
        })
    }
}

/// Admin reset; a password is generated when none is given.
#[derive(Debug, Clone, Default, Validate)]
pub struct PasswordResetPayload {
    #[validate(length(min = 6, max = 128))]
    pub password: Option<String>,
}

impl PasswordResetPayload {
    pub fn from_submission(submission: &Submission) -> Self {
        Self {
            password: submission.raw_text("password"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PasswordReset {
    pub user_id: i64,
    pub temporary_password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserDeleted {
    pub deleted_user_id: i64,
    pub cleanup_failures: usize,
}
