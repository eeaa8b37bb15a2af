use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::search::SearchTerm;

/// An internship posting, stored in the `internships` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Offer {
    pub id: i64,
    pub hotel: String,
    pub employer_id: Option<i64>,
    pub location: Option<String>,
    pub title_ar: Option<String>,
    pub title_fr: Option<String>,
    pub title_en: Option<String>,
    pub type_ar: Option<String>,
    pub type_fr: Option<String>,
    pub type_en: Option<String>,
    pub duration_ar: Option<String>,
    pub duration_fr: Option<String>,
    pub duration_en: Option<String>,
    pub description_ar: Option<String>,
    pub description_fr: Option<String>,
    pub description_en: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub image: Option<String>,
    pub rating: i32,
    pub created_at: DateTime<Utc>,
}

/// Text fields of an offer that exist once per locale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Localized {
    pub ar: Option<String>,
    pub fr: Option<String>,
    pub en: Option<String>,
}

impl Localized {
    pub fn is_empty(&self) -> bool {
        self.ar.is_none() && self.fr.is_none() && self.en.is_none()
    }
}

/// Allow-listed offer columns. On insert `None` means NULL, on update it means "keep".
#[derive(Debug, Clone, Default)]
pub struct OfferFields {
    pub hotel: Option<String>,
    pub location: Option<String>,
    pub title: Localized,
    pub kind: Localized,
    pub duration: Localized,
    pub description: Localized,
    pub start_date: Option<NaiveDate>,
    pub rating: Option<i32>,
    pub image: Option<String>,
}

impl OfferFields {
    pub fn is_empty(&self) -> bool {
        self.hotel.is_none()
            && self.location.is_none()
            && self.title.is_empty()
            && self.kind.is_empty()
            && self.duration.is_empty()
            && self.description.is_empty()
            && self.start_date.is_none()
            && self.rating.is_none()
            && self.image.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct NewOffer {
    pub hotel: String,
    pub employer_id: Option<i64>,
    pub fields: OfferFields,
}

#[derive(Debug, Clone, Default)]
pub struct OfferQuery {
    /// Hotel, location, titles and types.
    pub search: Option<SearchTerm>,
    pub location: Option<SearchTerm>,
    /// Exact, case-insensitive.
    pub hotel: Option<String>,
    pub limit: Option<i64>,
}

impl OfferQuery {
    pub fn matches(&self, offer: &Offer) -> bool {
        if let Some(hotel) = &self.hotel {
            if !offer.hotel.eq_ignore_ascii_case(hotel) {
                return false;
            }
        }
        if let Some(location) = &self.location {
            if !location.matches_any([offer.location.as_deref()]) {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let fields = [
                Some(offer.hotel.as_str()),
                offer.location.as_deref(),
                offer.title_ar.as_deref(),
                offer.title_fr.as_deref(),
                offer.title_en.as_deref(),
                offer.type_ar.as_deref(),
                offer.type_fr.as_deref(),
                offer.type_en.as_deref(),
            ];
            if !search.matches_any(fields) {
                return false;
            }
        }
        true
    }
}
