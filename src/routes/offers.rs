use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::{
    dto::{
        offer_dto::{
            offer_fields, BulkOfferDeleted, OfferCreated, OfferEnvelope, OfferList,
            OfferListQuery, OfferView, OwnOffersDeleted,
        },
        submission::Submission,
        ApiSuccess, IdList, Message, QueryParams,
    },
    error::Result,
    middleware::auth::CurrentPrincipal,
    models::offer::OfferQuery,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/internships",
    params(
        ("search" = Option<String>, Query, description = "Matches hotel, location, titles and types"),
        ("location" = Option<String>, Query, description = "Location contains"),
        ("hotel" = Option<String>, Query, description = "Exact hotel name")
    ),
    responses((status = 200, description = "Internships in localized shape"))
)]
#[axum::debug_handler]
pub async fn list_offers(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<OfferListQuery>,
) -> Result<impl IntoResponse> {
    let offers = state.offer_service.list(&OfferQuery::from(query)).await?;
    Ok(Json(ApiSuccess::new(OfferList {
        internships: offers.into_iter().map(OfferView::from).collect(),
    })))
}

#[utoipa::path(
    get,
    path = "/api/internships/{id}",
    params(("id" = i64, Path, description = "Internship ID")),
    responses(
        (status = 200, description = "Internship"),
        (status = 404, description = "Internship not found")
    )
)]
#[axum::debug_handler]
pub async fn get_offer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let offer = state.offer_service.get(id).await?;
    Ok(Json(ApiSuccess::new(OfferEnvelope {
        internship: OfferView::from(offer),
    })))
}

#[utoipa::path(
    post,
    path = "/api/internships",
    responses(
        (status = 201, description = "Internship created"),
        (status = 400, description = "Invalid payload or image"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not an employer")
    )
)]
#[axum::debug_handler]
pub async fn create_offer(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    mut submission: Submission,
) -> Result<impl IntoResponse> {
    let fields = offer_fields(&submission)?;
    let image = submission.take_file("image_file");
    let offer = state.offer_service.create(&principal, fields, image).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiSuccess::new(OfferCreated {
            id: offer.id,
            internship: OfferView::from(offer),
        })),
    ))
}

#[utoipa::path(
    patch,
    path = "/api/internships/{id}",
    params(("id" = i64, Path, description = "Internship ID")),
    responses(
        (status = 200, description = "Internship updated"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Internship not found")
    )
)]
#[axum::debug_handler]
pub async fn update_offer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    CurrentPrincipal(principal): CurrentPrincipal,
    mut submission: Submission,
) -> Result<impl IntoResponse> {
    let fields = offer_fields(&submission)?;
    let image = submission.take_file("image_file");
    let offer = state
        .offer_service
        .edit(&principal, id, fields, image)
        .await?;
    Ok(Json(ApiSuccess::new(OfferEnvelope {
        internship: OfferView::from(offer),
    })))
}

#[utoipa::path(
    delete,
    path = "/api/internships/{id}",
    params(("id" = i64, Path, description = "Internship ID")),
    responses(
        (status = 200, description = "Internship and its applications deleted"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Internship not found")
    )
)]
#[axum::debug_handler]
pub async fn delete_offer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<impl IntoResponse> {
    state.offer_service.delete(&principal, id).await?;
    Ok(Json(Message::new("Internship deleted")))
}

#[utoipa::path(
    post,
    path = "/api/internships/bulk-delete",
    responses(
        (status = 200, description = "Number of internships deleted"),
        (status = 403, description = "Admin only")
    )
)]
#[axum::debug_handler]
pub async fn bulk_delete_offers(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    submission: Submission,
) -> Result<impl IntoResponse> {
    let payload = IdList::from_submission(&submission)?;
    let deleted_count = state
        .offer_service
        .bulk_delete(&principal, &payload.ids)
        .await?;
    Ok(Json(ApiSuccess::new(BulkOfferDeleted { deleted_count })))
}

#[utoipa::path(
    post,
    path = "/api/internships/delete-mine",
    responses(
        (status = 200, description = "Number of own internships deleted"),
        (status = 403, description = "Employers only")
    )
)]
#[axum::debug_handler]
pub async fn delete_my_offers(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<impl IntoResponse> {
    let deleted_internships = state.offer_service.delete_mine(&principal).await?;
    Ok(Json(ApiSuccess::new(OwnOffersDeleted {
        deleted_internships,
    })))
}
