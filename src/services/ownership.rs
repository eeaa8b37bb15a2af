//! Who owns which offer, and through it, which application.
//!
//! Offers are owned either through `internships.employer_id` or, on
//! deployments migrated from the name-keyed schema, by the employer whose
//! display name equals `internships.hotel`. Exactly one of the two paths is
//! authoritative for a deployment; a null `employer_id` in key mode means
//! "nobody but an admin", it does not fall back to the name.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::database::Store;
use crate::error::Result;
use crate::models::{application::Application, offer::Offer, user::Role};
use crate::services::identity_service::Actor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferOwnership {
    /// `internships.employer_id` decides.
    EmployerKey,
    /// `internships.hotel` compared with the employer's name.
    HotelName,
}

impl fmt::Display for OfferOwnership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OfferOwnership::EmployerKey => f.write_str("employer_id"),
            OfferOwnership::HotelName => f.write_str("hotel_name"),
        }
    }
}

impl FromStr for OfferOwnership {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "employer_id" => Ok(OfferOwnership::EmployerKey),
            "hotel_name" => Ok(OfferOwnership::HotelName),
            other => Err(format!("unknown offer ownership mode '{}'", other)),
        }
    }
}

#[derive(Clone)]
pub struct OwnershipResolver {
    mode: OfferOwnership,
    store: Arc<dyn Store>,
}

impl OwnershipResolver {
    pub fn new(mode: OfferOwnership, store: Arc<dyn Store>) -> Self {
        Self { mode, store }
    }

    pub fn mode(&self) -> OfferOwnership {
        self.mode
    }

    pub fn owns_offer(&self, actor: &Actor, offer: &Offer) -> bool {
        if actor.is_admin {
            return true;
        }
        match self.mode {
            OfferOwnership::EmployerKey => offer.employer_id == Some(actor.id),
            OfferOwnership::HotelName => actor.role == Role::Employer && actor.name == offer.hotel,
        }
    }

    /// Admin, the linked submitter, or the employer owning the parent offer.
    pub async fn owns_application(&self, actor: &Actor, application: &Application) -> bool {
        if actor.is_admin {
            return true;
        }
        if application.user_id == Some(actor.id) {
            return true;
        }
        self.owns_parent_offer(actor, application).await
    }

    /// Who may move an application between statuses: admin or the owning employer.
    /// The submitter may withdraw an application but not review it.
    pub async fn may_review_application(&self, actor: &Actor, application: &Application) -> bool {
        actor.is_admin || self.owns_parent_offer(actor, application).await
    }

    async fn owns_parent_offer(&self, actor: &Actor, application: &Application) -> bool {
        if actor.role != Role::Employer {
            return false;
        }
        let Some(internship_id) = application.internship_id else {
            return false;
        };
        match self.store.find_offer(internship_id).await {
            Ok(Some(offer)) => self.owns_offer(actor, &offer),
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(
                    application_id = application.id,
                    offer_id = internship_id,
                    error = %e,
                    "offer lookup failed during ownership check"
                );
                false
            }
        }
    }

    /// Ids of every offer the actor owns, resolved at the set level.
    pub async fn owned_offer_ids(&self, actor: &Actor) -> Result<Vec<i64>> {
        match self.mode {
            OfferOwnership::EmployerKey => self.store.offer_ids_by_employer(actor.id).await,
            OfferOwnership::HotelName if actor.role == Role::Employer => {
                self.store.offer_ids_by_hotel(&actor.name).await
            }
            OfferOwnership::HotelName => Ok(Vec::new()),
        }
    }

    /// The user to notify about activity on `offer`: its employer key when
    /// set, otherwise the employer whose name matches the hotel.
    pub async fn offer_owner_id(&self, offer: &Offer) -> Result<Option<i64>> {
        if let Some(id) = offer.employer_id {
            return Ok(Some(id));
        }
        Ok(self
            .store
            .find_employer_by_name(&offer.hotel)
            .await?
            .map(|u| u.id))
    }
}
