use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};

use crate::{
    dto::{
        notification_dto::{MarkedRead, NotificationList, NotificationQuery},
        ApiSuccess, Message, QueryParams,
    },
    error::Result,
    middleware::auth::CurrentPrincipal,
    AppState,
};

// Mounted behind `require_session`, so anonymous callers never get here.

#[utoipa::path(
    get,
    path = "/api/notifications",
    params(
        ("page" = Option<i64>, Query, description = "1-based page"),
        ("limit" = Option<i64>, Query, description = "Page size, at most 100")
    ),
    responses(
        (status = 200, description = "Newest first, with unread count"),
        (status = 401, description = "Not authenticated")
    )
)]
#[axum::debug_handler]
pub async fn list_notifications(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    QueryParams(query): QueryParams<NotificationQuery>,
) -> Result<impl IntoResponse> {
    let actor = principal.require_authenticated()?;
    let page = state
        .notification_service
        .list(actor.id, query.page, query.limit)
        .await?;
    Ok(Json(ApiSuccess::new(NotificationList {
        notifications: page.items,
        unread: page.unread,
        page: page.page,
        limit: page.limit,
    })))
}

#[utoipa::path(
    post,
    path = "/api/notifications/{id}/read",
    params(("id" = i64, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Marked as read"),
        (status = 404, description = "Not found for this recipient")
    )
)]
#[axum::debug_handler]
pub async fn mark_notification_read(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<impl IntoResponse> {
    let actor = principal.require_authenticated()?;
    state.notification_service.mark_read(actor.id, id).await?;
    Ok(Json(Message::new("Notification marked as read")))
}

#[utoipa::path(
    post,
    path = "/api/notifications/read-all",
    responses((status = 200, description = "Number of notifications marked"))
)]
#[axum::debug_handler]
pub async fn mark_all_notifications_read(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<impl IntoResponse> {
    let actor = principal.require_authenticated()?;
    let updated = state.notification_service.mark_all_read(actor.id).await?;
    Ok(Json(ApiSuccess::new(MarkedRead { updated })))
}

#[utoipa::path(
    delete,
    path = "/api/notifications/{id}",
    params(("id" = i64, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Hidden from the recipient"),
        (status = 404, description = "Not found for this recipient")
    )
)]
#[axum::debug_handler]
pub async fn delete_notification(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<impl IntoResponse> {
    let actor = principal.require_authenticated()?;
    state.notification_service.delete(actor.id, id).await?;
    Ok(Json(Message::new("Notification deleted")))
}
