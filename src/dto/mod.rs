pub mod application_dto;
pub mod auth_dto;
pub mod notification_dto;
pub mod offer_dto;
pub mod search_dto;
pub mod social_dto;
pub mod submission;

use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{Error, Result};
use submission::Submission;

/// `{"success": true, ...payload}`
#[derive(Debug, Clone, Serialize)]
pub struct ApiSuccess<T: Serialize> {
    pub success: bool,
    #[serde(flatten)]
    pub data: T,
}

impl<T: Serialize> ApiSuccess<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> ApiSuccess<Self> {
        ApiSuccess::new(Self {
            message: message.into(),
        })
    }
}

/// Body of the bulk endpoints.
#[derive(Debug, Clone)]
pub struct IdList {
    pub ids: Vec<i64>,
}

impl IdList {
    pub fn from_submission(submission: &Submission) -> Result<Self> {
        let ids = submission
            .id_list("ids")?
            .ok_or_else(|| Error::BadRequest("Missing or invalid ids".into()))?;
        Ok(Self { ids })
    }
}

/// `Query<T>` whose rejection is the JSON error envelope.
#[derive(Debug, Clone)]
pub struct QueryParams<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| Error::BadRequest(e.body_text()))?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_is_flattened_next_to_success() {
        #[derive(Serialize)]
        struct Created {
            id: i64,
        }
        let value = serde_json::to_value(ApiSuccess::new(Created { id: 4 })).unwrap();
        assert_eq!(value, json!({ "success": true, "id": 4 }));
    }

    #[test]
    fn id_list_must_be_present() {
        let empty = Submission::from_json(json!({ "id": [1] })).unwrap();
        assert!(matches!(
            IdList::from_submission(&empty),
            Err(Error::BadRequest(msg)) if msg == "Missing or invalid ids"
        ));
        let given = Submission::from_json(json!({ "ids": [1, 2] })).unwrap();
        assert_eq!(IdList::from_submission(&given).unwrap().ids, vec![1, 2]);
    }
}
