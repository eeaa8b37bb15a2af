use serde::{Deserialize, Serialize};

use crate::models::search::{SearchResults, SearchScope};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    #[serde(rename = "type")]
    pub scope: Option<String>,
}

/// Echoes the normalized query next to the sections that were searched.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub q: String,
    #[serde(rename = "type")]
    pub scope: SearchScope,
    #[serde(flatten)]
    pub results: SearchResults,
}
