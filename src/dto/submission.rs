//! Request bodies that may arrive as JSON, urlencoded forms or multipart.

use std::collections::{hash_map::Entry, HashMap};

use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
    Form, Json,
};
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};
use crate::storage::Upload;

/// Field bag with the files of a multipart body kept apart.
#[derive(Debug, Default, Clone)]
pub struct Submission {
    fields: HashMap<String, JsonValue>,
    files: HashMap<String, Upload>,
}

impl Submission {
    pub fn from_json(value: JsonValue) -> Result<Self> {
        match value {
            JsonValue::Object(map) => Ok(Self {
                fields: map.into_iter().collect(),
                files: HashMap::new(),
            }),
            JsonValue::Null => Ok(Self::default()),
            _ => Err(Error::BadRequest("Expected a JSON object".into())),
        }
    }

    /// Repeated keys (`ids=1&ids=2`, `ids[]=1&ids[]=2`) collect into an array.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut fields: HashMap<String, JsonValue> = HashMap::new();
        for (key, value) in pairs {
            let value = JsonValue::String(value);
            let (key, listed) = match key.strip_suffix("[]") {
                Some(base) => (base.to_string(), true),
                None => (key, false),
            };
            match fields.entry(key) {
                Entry::Occupied(mut slot) => match slot.get_mut() {
                    JsonValue::Array(items) => items.push(value),
                    existing => {
                        let first = existing.take();
                        *existing = JsonValue::Array(vec![first, value]);
                    }
                },
                Entry::Vacant(slot) => {
                    slot.insert(if listed {
                        JsonValue::Array(vec![value])
                    } else {
                        value
                    });
                }
            }
        }
        Self {
            fields,
            files: HashMap::new(),
        }
    }

    /// Trimmed text of a scalar field; blank and null count as absent.
    pub fn text(&self, key: &str) -> Option<String> {
        let value = match self.fields.get(key)? {
            JsonValue::String(s) => s.trim().to_string(),
            JsonValue::Number(n) => n.to_string(),
            JsonValue::Bool(b) => b.to_string(),
            _ => return None,
        };
        (!value.is_empty()).then_some(value)
    }

    /// Untrimmed string value, for secrets where whitespace is significant.
    pub fn raw_text(&self, key: &str) -> Option<String> {
        match self.fields.get(key)? {
            JsonValue::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    }

    pub fn integer(&self, key: &str) -> Result<Option<i64>> {
        match self.fields.get(key) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(JsonValue::Number(n)) => n
                .as_i64()
                .map(Some)
                .ok_or_else(|| Error::BadRequest(format!("{} must be an integer", key))),
            Some(_) => match self.text(key) {
                None => Ok(None),
                Some(raw) => raw
                    .parse::<i64>()
                    .map(Some)
                    .map_err(|_| Error::BadRequest(format!("{} must be an integer", key))),
            },
        }
    }

    /// JSON booleans, `0`/`1`, or the usual form spellings (`on`, `yes`, ...).
    pub fn boolean(&self, key: &str) -> Result<Option<bool>> {
        match self.fields.get(key) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(JsonValue::Bool(b)) => Ok(Some(*b)),
            Some(_) => match self.text(key).map(|raw| raw.to_lowercase()).as_deref() {
                None => Ok(None),
                Some("1" | "true" | "on" | "yes") => Ok(Some(true)),
                Some("0" | "false" | "off" | "no") => Ok(Some(false)),
                Some(_) => Err(Error::BadRequest(format!("{} must be a boolean", key))),
            },
        }
    }

    /// A JSON array of ids, or comma-separated text from a form.
    pub fn id_list(&self, key: &str) -> Result<Option<Vec<i64>>> {
        let invalid = || Error::BadRequest(format!("{} must be a list of integers", key));
        let parse = |raw: &str| raw.trim().parse::<i64>().map_err(|_| invalid());
        match self.fields.get(key) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(JsonValue::Array(items)) => items
                .iter()
                .map(|item| match item {
                    JsonValue::Number(n) => n.as_i64().ok_or_else(invalid),
                    JsonValue::String(raw) => parse(raw),
                    _ => Err(invalid()),
                })
                .collect::<Result<Vec<_>>>()
                .map(Some),
            Some(JsonValue::String(raw)) => raw
                .split(',')
                .filter(|part| !part.trim().is_empty())
                .map(parse)
                .collect::<Result<Vec<_>>>()
                .map(Some),
            Some(_) => Err(invalid()),
        }
    }

    /// A JSON field, or a text field holding serialized JSON.
    pub fn json(&self, key: &str) -> Result<Option<JsonValue>> {
        match self.fields.get(key) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(JsonValue::String(raw)) if raw.trim().is_empty() => Ok(None),
            Some(JsonValue::String(raw)) => serde_json::from_str(raw)
                .map(Some)
                .map_err(|_| Error::BadRequest(format!("{} must be valid JSON", key))),
            Some(other) => Ok(Some(other.clone())),
        }
    }

    pub fn take_file(&mut self, key: &str) -> Option<Upload> {
        self.files.remove(key).filter(|u| !u.is_empty())
    }

    async fn from_multipart(mut multipart: Multipart) -> Result<Self> {
        let mut submission = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            if name.is_empty() {
                continue;
            }
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let bytes = field.bytes().await?;
                    if !bytes.is_empty() {
                        submission
                            .files
                            .insert(name.clone(), Upload::new(name, file_name, bytes));
                    }
                }
                None => {
                    let text = field.text().await?;
                    submission.fields.insert(name, JsonValue::String(text));
                }
            }
        }
        Ok(submission)
    }
}

#[async_trait]
impl<S> FromRequest<S> for Submission
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| Error::BadRequest(e.body_text()))?;
            Self::from_multipart(multipart).await
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
                .await
                .map_err(|e| Error::BadRequest(e.body_text()))?;
            Ok(Self::from_pairs(pairs))
        } else if content_type.starts_with("application/json") {
            let Json(value) = Json::<JsonValue>::from_request(req, state)
                .await
                .map_err(|e| Error::BadRequest(e.body_text()))?;
            Self::from_json(value)
        } else {
            Ok(Self::default())
        }
    }
}
