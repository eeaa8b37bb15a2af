use serde_json::{json, Value as JsonValue};
use std::sync::Arc;

use crate::config::AccessPolicy;
use crate::database::Store;
use crate::error::{Error, Result};
use crate::models::application::{
    Application, ApplicationScope, ApplicationStatus, NewApplication,
};
use crate::services::identity_service::Principal;
use crate::services::notification_service::{NotificationPayload, NotificationService};
use crate::services::ownership::OwnershipResolver;
use crate::storage::{FileStore, Upload, RESUME_EXTENSIONS};

pub const RESUME_NAMESPACE: &str = "resumes";
const RESUME_PREFIX: &str = "resume";

/// Applicant-supplied part of a submission.
#[derive(Debug, Clone)]
pub struct ApplicationForm {
    pub internship_id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub school: Option<String>,
    pub extra: Option<JsonValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkDeleteOutcome {
    pub deleted_ids: Vec<i64>,
    pub failed_ids: Vec<i64>,
}

#[derive(Clone)]
pub struct ApplicationService {
    store: Arc<dyn Store>,
    files: Arc<dyn FileStore>,
    ownership: OwnershipResolver,
    notifications: NotificationService,
    access: AccessPolicy,
}

impl ApplicationService {
    pub fn new(
        store: Arc<dyn Store>,
        files: Arc<dyn FileStore>,
        ownership: OwnershipResolver,
        notifications: NotificationService,
        access: AccessPolicy,
    ) -> Self {
        Self {
            store,
            files,
            ownership,
            notifications,
            access,
        }
    }

    /// Open to anonymous visitors. The resume never blocks the submission:
    /// a bad upload is dropped, and a store that rejects the resume column
    /// gets the row without it.
    pub async fn submit(
        &self,
        principal: &Principal,
        form: ApplicationForm,
        resume: Option<Upload>,
    ) -> Result<Application> {
        let offer = self
            .store
            .find_offer(form.internship_id)
            .await?
            .ok_or_else(|| Error::NotFound("Internship not found".into()))?;

        let resume_path = match resume.filter(|u| !u.is_empty()) {
            Some(upload) => match self
                .files
                .store(RESUME_NAMESPACE, RESUME_PREFIX, &upload, RESUME_EXTENSIONS)
                .await
            {
                Ok(path) => Some(path),
                Err(e) => {
                    tracing::warn!(
                        offer_id = offer.id,
                        file_name = %upload.file_name,
                        error = %e,
                        "resume upload dropped"
                    );
                    None
                }
            },
            None => None,
        };

        let mut row = NewApplication {
            internship_id: offer.id,
            user_id: principal.user_id(),
            applicant_name: form.name,
            email: form.email,
            phone: form.phone,
            school: form.school,
            resume_path: resume_path.clone(),
            extra: form.extra,
        };

        let application = match self.store.insert_application(row.clone()).await {
            Ok(application) => application,
            Err(e) if resume_path.is_some() => {
                tracing::warn!(
                    offer_id = offer.id,
                    error = %e,
                    "insert with resume failed, retrying without it"
                );
                row.resume_path = None;
                let application = self.store.insert_application(row).await?;
                if let Some(path) = resume_path.as_deref() {
                    if let Err(e) = self.files.delete(path).await {
                        tracing::warn!(path, error = %e, "failed to remove orphaned resume");
                    }
                }
                application
            }
            Err(e) => return Err(e),
        };

        tracing::info!(
            application_id = application.id,
            offer_id = offer.id,
            "application submitted"
        );

        match self.ownership.offer_owner_id(&offer).await {
            Ok(Some(owner_id)) => {
                let payload = NotificationPayload {
                    kind: "new_application".into(),
                    title: Some("New application received".into()),
                    body: Some(format!(
                        "New application for internship #{} by {}",
                        offer.id, application.applicant_name
                    )),
                    data: Some(json!({
                        "application_id": application.id,
                        "internship_id": offer.id,
                    })),
                };
                self.notifications
                    .notify_best_effort(&[owner_id], &payload, principal.user_id())
                    .await;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(offer_id = offer.id, error = %e, "offer owner lookup failed");
            }
        }

        Ok(application)
    }

    /// What the principal may see: admin all, employers their offers'
    /// applications, trainees their own, anonymous nothing.
    pub async fn list(
        &self,
        principal: &Principal,
        internship_id: Option<i64>,
    ) -> Result<Vec<Application>> {
        let Some(actor) = principal.actor() else {
            return Ok(Vec::new());
        };
        let scope = if actor.is_admin {
            ApplicationScope::All
        } else if actor.is_employer() {
            ApplicationScope::Offers(self.ownership.owned_offer_ids(actor).await?)
        } else {
            ApplicationScope::Applicant(actor.id)
        };
        if matches!(&scope, ApplicationScope::Offers(ids) if ids.is_empty()) {
            return Ok(Vec::new());
        }
        self.store.list_applications(&scope, internship_id).await
    }

    /// Any status may follow any status.
    pub async fn update_status(
        &self,
        principal: &Principal,
        id: i64,
        status: ApplicationStatus,
    ) -> Result<Application> {
        let application = self
            .store
            .find_application(id)
            .await?
            .ok_or_else(|| Error::NotFound("Application not found".into()))?;

        if self.access == AccessPolicy::Strict {
            let actor = principal.require_authenticated()?;
            if !self.ownership.may_review_application(actor, &application).await {
                return Err(Error::Forbidden("Not allowed".into()));
            }
        }

        let updated = self
            .store
            .set_application_status(id, status)
            .await?
            .ok_or_else(|| Error::NotFound("Application not found".into()))?;

        tracing::info!(
            application_id = id,
            from = %application.status,
            to = %status,
            "application status changed"
        );

        if let Some(recipient) = updated.user_id {
            let payload = NotificationPayload {
                kind: "application_status".into(),
                title: Some("Application status updated".into()),
                body: Some(format!("Your application status changed to {}", status)),
                data: Some(json!({
                    "application_id": updated.id,
                    "internship_id": updated.internship_id,
                    "new_status": status,
                })),
            };
            self.notifications
                .notify_best_effort(&[recipient], &payload, principal.user_id())
                .await;
        }

        Ok(updated)
    }

    pub async fn delete(&self, principal: &Principal, id: i64) -> Result<()> {
        let actor = principal.require_authenticated()?;
        let application = self
            .store
            .find_application(id)
            .await?
            .ok_or_else(|| Error::NotFound("Application not found".into()))?;
        if !self.ownership.owns_application(actor, &application).await {
            return Err(Error::Forbidden("Not allowed".into()));
        }
        self.remove(&application).await
    }

    /// Splits `ids` into what was deleted and what was missing, foreign or failed.
    pub async fn bulk_delete(&self, principal: &Principal, ids: &[i64]) -> Result<BulkDeleteOutcome> {
        let actor = principal.require_authenticated()?;
        let mut outcome = BulkDeleteOutcome::default();

        for &id in ids {
            if id <= 0 {
                outcome.failed_ids.push(id);
                continue;
            }
            let application = match self.store.find_application(id).await {
                Ok(Some(application)) => application,
                Ok(None) => {
                    outcome.failed_ids.push(id);
                    continue;
                }
                Err(e) => {
                    tracing::warn!(application_id = id, error = %e, "bulk delete lookup failed");
                    outcome.failed_ids.push(id);
                    continue;
                }
            };
            if !self.ownership.owns_application(actor, &application).await {
                outcome.failed_ids.push(id);
                continue;
            }
            match self.remove(&application).await {
                Ok(()) => outcome.deleted_ids.push(id),
                Err(e) => {
                    tracing::warn!(application_id = id, error = %e, "bulk delete failed");
                    outcome.failed_ids.push(id);
                }
            }
        }
        Ok(outcome)
    }

    /// Removes the resume (best effort) and then the row.
    async fn remove(&self, application: &Application) -> Result<()> {
        if let Some(path) = application.resume_path.as_deref() {
            if let Err(e) = self.files.delete(path).await {
                tracing::warn!(
                    application_id = application.id,
                    path,
                    error = %e,
                    "failed to remove resume file"
                );
            }
        }
        if !self.store.delete_application(application.id).await? {
            return Err(Error::NotFound("Application not found".into()));
        }
        tracing::info!(application_id = application.id, "application deleted");
        Ok(())
    }
}
