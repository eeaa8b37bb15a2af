use axum::{extract::State, response::IntoResponse, Json};

use crate::{
    dto::{
        search_dto::{SearchQuery, SearchResponse},
        ApiSuccess, QueryParams,
    },
    error::Result,
    middleware::auth::CurrentPrincipal,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/search",
    params(
        ("q" = String, Query, description = "Words matched in order, case-insensitively"),
        ("type" = Option<String>, Query, description = "all, posts, offers or users")
    ),
    responses(
        (status = 200, description = "At most 50 hits per section"),
        (status = 400, description = "Missing query or unknown type")
    )
)]
#[axum::debug_handler]
pub async fn search(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    QueryParams(query): QueryParams<SearchQuery>,
) -> Result<impl IntoResponse> {
    let (term, scope, results) = state
        .search_service
        .search(&principal, query.q, query.scope)
        .await?;
    Ok(Json(ApiSuccess::new(SearchResponse {
        q: term.as_text(),
        scope,
        results,
    })))
}
