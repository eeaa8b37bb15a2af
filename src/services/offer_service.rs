use std::sync::Arc;

use crate::config::AccessPolicy;
use crate::database::Store;
use crate::error::{Error, Result};
use crate::models::{
    application::ApplicationScope,
    offer::{NewOffer, Offer, OfferFields, OfferQuery},
};
use crate::services::cascade::CascadeReport;
use crate::services::identity_service::{Actor, Principal};
use crate::services::ownership::{OfferOwnership, OwnershipResolver};
use crate::storage::{FileStore, Upload, IMAGE_EXTENSIONS};

pub const OFFER_IMAGE_NAMESPACE: &str = "internships";
const OFFER_IMAGE_PREFIX: &str = "offer";

#[derive(Clone)]
pub struct OfferService {
    store: Arc<dyn Store>,
    files: Arc<dyn FileStore>,
    ownership: OwnershipResolver,
    access: AccessPolicy,
}

impl OfferService {
    pub fn new(
        store: Arc<dyn Store>,
        files: Arc<dyn FileStore>,
        ownership: OwnershipResolver,
        access: AccessPolicy,
    ) -> Self {
        Self {
            store,
            files,
            ownership,
            access,
        }
    }

    pub async fn list(&self, query: &OfferQuery) -> Result<Vec<Offer>> {
        self.store.list_offers(query).await
    }

    pub async fn get(&self, id: i64) -> Result<Offer> {
        self.store
            .find_offer(id)
            .await?
            .ok_or_else(|| Error::NotFound("Internship not found".into()))
    }

    pub async fn create(
        &self,
        principal: &Principal,
        mut fields: OfferFields,
        image: Option<Upload>,
    ) -> Result<Offer> {
        let actor = principal.require_authenticated()?;
        if self.access == AccessPolicy::Strict && !(actor.is_employer() || actor.is_admin) {
            return Err(Error::Forbidden(
                "Only employers can create internships".into(),
            ));
        }
        if fields.title.is_empty() {
            return Err(Error::BadRequest("At least one title is required".into()));
        }
        check_rating(fields.rating)?;

        let hotel = fields
            .hotel
            .take()
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(|| actor.name.clone());
        let employer_id = match self.ownership.mode() {
            OfferOwnership::EmployerKey => Some(actor.id),
            OfferOwnership::HotelName => None,
        };

        fields.image = match image.filter(|u| !u.is_empty()) {
            Some(upload) => Some(self.store_image(&upload).await?),
            None => None,
        };
        let stored_image = fields.image.clone();

        let inserted = self
            .store
            .insert_offer(NewOffer {
                hotel,
                employer_id,
                fields,
            })
            .await;
        let offer = match inserted {
            Ok(offer) => offer,
            Err(e) => {
                if let Some(path) = stored_image {
                    self.discard_file(&path).await;
                }
                return Err(e);
            }
        };

        tracing::info!(
            offer_id = offer.id,
            actor_id = actor.id,
            hotel = %offer.hotel,
            "internship created"
        );
        Ok(offer)
    }

    /// Partial update. A new image is written before the row changes and the
    /// old one is removed only after the row points at the new file.
    pub async fn edit(
        &self,
        principal: &Principal,
        id: i64,
        mut fields: OfferFields,
        image: Option<Upload>,
    ) -> Result<Offer> {
        let actor = principal.require_authenticated()?;
        let offer = self.get(id).await?;
        if !self.ownership.owns_offer(actor, &offer) {
            return Err(Error::Forbidden("Not allowed".into()));
        }
        check_rating(fields.rating)?;
        fields.hotel = fields.hotel.filter(|h| !h.trim().is_empty());

        let new_image = match image.filter(|u| !u.is_empty()) {
            Some(upload) => Some(self.store_image(&upload).await?),
            None => None,
        };
        fields.image = new_image.clone();

        if fields.is_empty() {
            return Ok(offer);
        }

        let updated = match self.store.update_offer(id, fields).await {
            Ok(updated) => updated,
            Err(e) => {
                if let Some(path) = &new_image {
                    self.discard_file(path).await;
                }
                return Err(e);
            }
        };

        if new_image.is_some() {
            if let Some(old) = offer.image.as_deref() {
                self.discard_file(old).await;
            }
        }
        tracing::info!(offer_id = id, actor_id = actor.id, "internship updated");
        Ok(updated)
    }

    pub async fn delete(&self, principal: &Principal, id: i64) -> Result<CascadeReport> {
        let actor = principal.require_authenticated()?;
        let offer = self.get(id).await?;
        if !self.ownership.owns_offer(actor, &offer) {
            return Err(Error::Forbidden("Not allowed".into()));
        }
        self.purge(&offer).await
    }

    /// Admin only. Unknown or failing ids are skipped; returns how many went.
    pub async fn bulk_delete(&self, principal: &Principal, ids: &[i64]) -> Result<u64> {
        principal.require_admin()?;
        let mut report = CascadeReport::new("bulk internship delete");
        Ok(self.purge_many(ids, &mut report).await)
    }

    /// Every offer the calling employer owns.
    pub async fn delete_mine(&self, principal: &Principal) -> Result<u64> {
        let actor = principal.require_authenticated()?;
        if !actor.is_employer() {
            return Err(Error::Forbidden(
                "Only employers can delete their internships".into(),
            ));
        }
        let ids = self.ownership.owned_offer_ids(actor).await?;
        let mut report = CascadeReport::new(format!("internships of user {}", actor.id));
        let deleted = self.purge_many(&ids, &mut report).await;
        tracing::info!(actor_id = actor.id, deleted, "employer removed own internships");
        Ok(deleted)
    }

    /// Removes every offer `owner` owns under the configured ownership mode.
    pub(crate) async fn purge_owned_by(&self, owner: &Actor, report: &mut CascadeReport) -> u64 {
        let ids = match self.ownership.owned_offer_ids(owner).await {
            Ok(ids) => ids,
            Err(e) => {
                report.record::<()>("resolve_owned_internships", Err(e));
                return 0;
            }
        };
        self.purge_many(&ids, report).await
    }

    async fn purge_many(&self, ids: &[i64], report: &mut CascadeReport) -> u64 {
        let mut deleted = 0;
        for &id in ids {
            let offer = match self.store.find_offer(id).await {
                Ok(Some(offer)) => offer,
                Ok(None) => continue,
                Err(e) => {
                    report.record::<()>("load_internship", Err(e));
                    continue;
                }
            };
            match self.purge(&offer).await {
                Ok(sub) => {
                    report.absorb(sub);
                    deleted += 1;
                }
                Err(e) => {
                    report.record::<()>("delete_internship", Err(e));
                }
            }
        }
        deleted
    }

    /// Deletion cascade for one offer. Everything before the row delete is
    /// best-effort; the row delete decides the outcome.
    pub(crate) async fn purge(&self, offer: &Offer) -> Result<CascadeReport> {
        let mut report = CascadeReport::new(format!("internship {}", offer.id));

        let applications = report.record(
            "load_applications",
            self.store
                .list_applications(&ApplicationScope::Offers(vec![offer.id]), None)
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

        report.record(
            "delete_notifications",
            self.store.delete_notifications_for_offer(offer.id).await,
        );

        if !self.store.delete_offer(offer.id).await? {
            return Err(Error::NotFound("Internship not found".into()));
        }

        if let Some(image) = offer.image.as_deref() {
            report.record("delete_offer_image", self.files.delete(image).await);
        }

        tracing::info!(
            offer_id = offer.id,
            failed_steps = report.failures.len(),
            "internship deleted"
        );
        Ok(report)
    }

    async fn store_image(&self, upload: &Upload) -> Result<String> {
        self.files
            .store(
                OFFER_IMAGE_NAMESPACE,
                OFFER_IMAGE_PREFIX,
                upload,
                IMAGE_EXTENSIONS,
            )
            .await
    }

    async fn discard_file(&self, path: &str) {
        if let Err(e) = self.files.delete(path).await {
            tracing::warn!(path, error = %e, "failed to remove internship image");
        }
    }
}

fn check_rating(rating: Option<i32>) -> Result<()> {
    match rating {
        Some(r) if !(0..=5).contains(&r) => {
            Err(Error::BadRequest("rating must be between 0 and 5".into()))
        }
        _ => Ok(()),
    }
}
