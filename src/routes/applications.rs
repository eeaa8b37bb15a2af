use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    dto::{
        application_dto::{
            ApplicationEnvelope, ApplicationList, ApplicationListQuery, ApplicationSubmitted,
            BulkApplicationsDeleted, StatusPayload, SubmitApplicationPayload,
        },
        submission::Submission,
        ApiSuccess, IdList, Message, QueryParams,
    },
    error::Result,
    middleware::auth::CurrentPrincipal,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/applications",
    responses(
        (status = 201, description = "Application stored, owner notified"),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Internship not found")
    )
)]
#[axum::debug_handler]
pub async fn submit_application(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    mut submission: Submission,
) -> Result<impl IntoResponse> {
    let payload = SubmitApplicationPayload::from_submission(&submission)?;
    payload.validate()?;
    let resume = submission.take_file("resume");

    let application = state
        .application_service
        .submit(&principal, payload.into(), resume)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiSuccess::new(ApplicationSubmitted {
            id: application.id,
            resume_path: application.resume_path,
        })),
    ))
}

#[utoipa::path(
    get,
    path = "/api/applications",
    params(("internship_id" = Option<i64>, Query, description = "Restrict to one internship")),
    responses((status = 200, description = "Applications visible to the caller"))
)]
#[axum::debug_handler]
pub async fn list_applications(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    QueryParams(query): QueryParams<ApplicationListQuery>,
) -> Result<impl IntoResponse> {
    let applications = state
        .application_service
        .list(&principal, query.internship_id)
        .await?;
    Ok(Json(ApiSuccess::new(ApplicationList { applications })))
}

#[utoipa::path(
    patch,
    path = "/api/applications/{id}/status",
    params(("id" = i64, Path, description = "Application ID")),
    responses(
        (status = 200, description = "Status changed, submitter notified"),
        (status = 400, description = "Missing or unknown status"),
        (status = 403, description = "Caller may not review this application"),
        (status = 404, description = "Application not found")
    )
)]
#[axum::debug_handler]
pub async fn update_application_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    CurrentPrincipal(principal): CurrentPrincipal,
    submission: Submission,
) -> Result<impl IntoResponse> {
    let status = StatusPayload::from_submission(&submission)?.parse()?;
    let application = state
        .application_service
        .update_status(&principal, id, status)
        .await?;
    Ok(Json(ApiSuccess::new(ApplicationEnvelope { application })))
}

#[utoipa::path(
    delete,
    path = "/api/applications/{id}",
    params(("id" = i64, Path, description = "Application ID")),
    responses(
        (status = 200, description = "Application and resume removed"),
        (status = 403, description = "Not allowed"),
        (status = 404, description = "Application not found")
    )
)]
#[axum::debug_handler]
pub async fn delete_application(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<impl IntoResponse> {
    state.application_service.delete(&principal, id).await?;
    Ok(Json(Message::new("Application deleted")))
}

#[utoipa::path(
    post,
    path = "/api/applications/bulk-delete",
    responses(
        (status = 200, description = "Deleted and failed ids"),
        (status = 400, description = "Missing or invalid ids")
    )
)]
#[axum::debug_handler]
pub async fn bulk_delete_applications(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    submission: Submission,
) -> Result<impl IntoResponse> {
    let payload = IdList::from_submission(&submission)?;
    let outcome = state
        .application_service
        .bulk_delete(&principal, &payload.ids)
        .await?;
    Ok(Json(ApiSuccess::new(BulkApplicationsDeleted {
        deleted_ids: outcome.deleted_ids,
        failed_ids: outcome.failed_ids,
    })))
}
