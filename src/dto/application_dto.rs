use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use validator::Validate;

use crate::dto::submission::Submission;
use crate::error::{Error, Result};
use crate::models::application::{Application, ApplicationStatus};
use crate::services::application_service::ApplicationForm;

#[derive(Debug, Clone, Validate)]
pub struct SubmitApplicationPayload {
    #[validate(range(min = 1))]
    pub internship_id: i64,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[validate(length(max = 200))]
    pub school: Option<String>,
    pub extra: Option<JsonValue>,
}

impl SubmitApplicationPayload {
    pub fn from_submission(submission: &Submission) -> Result<Self> {
        let internship_id = submission
            .integer("internship_id")?
            .ok_or_else(|| Error::BadRequest("internship_id is required".into()))?;
        let extra = submission.json("extra")?;
        if matches!(&extra, Some(v) if !v.is_object()) {
            return Err(Error::BadRequest("extra must be a JSON object".into()));
        }
        Ok(Self {
            internship_id,
            name: submission.text("name").unwrap_or_default(),
            email: submission.text("email").unwrap_or_default(),
            phone: submission.text("phone"),
            school: submission.text("school"),
            extra,
        })
    }
}

impl From<SubmitApplicationPayload> for ApplicationForm {
    fn from(p: SubmitApplicationPayload) -> Self {
        Self {
            internship_id: p.internship_id,
            name: p.name,
            email: p.email,
            phone: p.phone,
            school: p.school,
            extra: p.extra,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StatusPayload {
    pub status: String,
}

impl StatusPayload {
    pub fn from_submission(submission: &Submission) -> Result<Self> {
        let status = submission
            .text("status")
            .ok_or_else(|| Error::BadRequest("status is required".into()))?;
        Ok(Self { status })
    }

    pub fn parse(&self) -> Result<ApplicationStatus> {
        self.status
            .trim()
            .parse()
            .map_err(|_| Error::BadRequest("status must be pending, approved or rejected".into()))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicationListQuery {
    pub internship_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicationSubmitted {
    pub id: i64,
    pub resume_path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicationEnvelope {
    pub application: Application,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicationList {
    pub applications: Vec<Application>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkApplicationsDeleted {
    pub deleted_ids: Vec<i64>,
    pub failed_ids: Vec<i64>,
}
