use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::dto::submission::Submission;
use crate::error::{Error, Result};
use crate::models::offer::{Localized, Offer, OfferFields, OfferQuery};
use crate::models::search::SearchTerm;
use crate::utils::validation::parse_date;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OfferListQuery {
    pub search: Option<String>,
    pub location: Option<String>,
    pub hotel: Option<String>,
}

impl From<OfferListQuery> for OfferQuery {
    fn from(q: OfferListQuery) -> Self {
        let term = |v: Option<String>| v.as_deref().and_then(SearchTerm::parse);
        Self {
            search: term(q.search),
            location: term(q.location),
            hotel: q.hotel.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
            limit: None,
        }
    }
}

fn localized(submission: &Submission, prefix: &str) -> Localized {
    Localized {
        ar: submission.text(&format!("{}_ar", prefix)),
        fr: submission.text(&format!("{}_fr", prefix)),
        en: submission.text(&format!("{}_en", prefix)),
    }
}

/// Reads the editable columns from a body. Anything outside the allow-list,
/// including a plain `image` field, is ignored.
pub fn offer_fields(submission: &Submission) -> Result<OfferFields> {
    let out_of_range = || Error::BadRequest("rating must be between 0 and 5".into());
    let rating = submission
        .integer("rating")
        .map_err(|_| out_of_range())?
        .map(|r| i32::try_from(r).map_err(|_| out_of_range()))
        .transpose()?;

    let start_date = submission
        .text("start_date")
        .map(|raw| parse_date("start_date", &raw))
        .transpose()?;

    Ok(OfferFields {
        hotel: submission.text("hotel"),
        location: submission.text("location"),
        title: localized(submission, "title"),
        kind: localized(submission, "type"),
        duration: localized(submission, "duration"),
        description: localized(submission, "description"),
        start_date,
        rating,
        image: None,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct LocalizedView {
    pub ar: Option<String>,
    pub fr: Option<String>,
    pub en: Option<String>,
}

fn view(ar: Option<String>, fr: Option<String>, en: Option<String>) -> LocalizedView {
    LocalizedView { ar, fr, en }
}

#[derive(Debug, Clone, Serialize)]
pub struct OfferView {
    pub id: i64,
    pub hotel: String,
    pub employer_id: Option<i64>,
    pub location: Option<String>,
    pub title: LocalizedView,
    #[serde(rename = "type")]
    pub kind: LocalizedView,
    pub duration: LocalizedView,
    pub description: LocalizedView,
    pub start_date: Option<NaiveDate>,
    pub image: Option<String>,
    pub rating: i32,
    pub created_at: DateTime<Utc>,
}

impl From<Offer> for OfferView {
    fn from(o: Offer) -> Self {
        Self {
            id: o.id,
            hotel: o.hotel,
            employer_id: o.employer_id,
            location: o.location,
            title: view(o.title_ar, o.title_fr, o.title_en),
            kind: view(o.type_ar, o.type_fr, o.type_en),
            duration: view(o.duration_ar, o.duration_fr, o.duration_en),
            description: view(o.description_ar, o.description_fr, o.description_en),
            start_date: o.start_date,
            image: o.image,
            rating: o.rating,
            created_at: o.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OfferEnvelope {
    pub internship: OfferView,
}

#[derive(Debug, Clone, Serialize)]
pub struct OfferList {
    pub internships: Vec<OfferView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OfferCreated {
    pub id: i64,
    pub internship: OfferView,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkOfferDeleted {
    pub deleted_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OwnOffersDeleted {
    pub deleted_internships: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn allow_list_ignores_unknown_and_image_fields() {
        let s = Submission::from_json(json!({
            "title_en": "Chef de partie",
            "type_fr": "Stage",
            "image": "../../etc/passwd",
            "salary": 1000,
            "rating": "4",
            "start_date": "2025-09-01",
        }))
        .unwrap();
        let fields = offer_fields(&s).unwrap();
        assert_eq!(fields.title.en.as_deref(), Some("Chef de partie"));
        assert_eq!(fields.kind.fr.as_deref(), Some("Stage"));
        assert_eq!(fields.rating, Some(4));
        assert!(fields.image.is_none());
        assert!(fields.start_date.is_some());
    }

    #[test]
    fn rejects_non_iso_start_dates() {
        let s = Submission::from_json(json!({ "start_date": "tomorrow" })).unwrap();
        assert!(offer_fields(&s).is_err());
    }
}
