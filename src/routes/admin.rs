use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    dto::{
        auth_dto::{
            AdminUserPayload, PasswordReset, PasswordResetPayload, UserDeleted, UserEnvelope,
            UserList, UserView,
        },
        submission::Submission,
        ApiSuccess,
    },
    error::Result,
    middleware::auth::CurrentPrincipal,
    services::user_service::AdminUserEdit,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/admin/users",
    responses(
        (status = 200, description = "Every user except the caller"),
        (status = 403, description = "Admin only")
    )
)]
#[axum::debug_handler]
pub async fn list_users(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<impl IntoResponse> {
    let users = state.user_service.list_users(&principal).await?;
    Ok(Json(ApiSuccess::new(UserList {
        users: users.into_iter().map(UserView::from).collect(),
    })))
}

#[utoipa::path(
    delete,
    path = "/api/admin/users/{id}",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User and dependent records removed"),
        (status = 404, description = "User not found")
    )
)]
#[axum::debug_handler]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<impl IntoResponse> {
    let report = state.user_service.delete_user(&principal, id).await?;
    Ok(Json(ApiSuccess::new(UserDeleted {
        deleted_user_id: id,
        cleanup_failures: report.failures.len(),
    })))
}

#[utoipa::path(
    patch,
    path = "/api/admin/users/{id}",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "Updated user"),
        (status = 400, description = "No fields to update"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Email already in use")
    )
)]
#[axum::debug_handler]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    CurrentPrincipal(principal): CurrentPrincipal,
    submission: Submission,
) -> Result<impl IntoResponse> {
    let payload = AdminUserPayload::from_submission(&submission)?;
    payload.validate()?;
    let edit = AdminUserEdit {
        name: payload.name,
        email: payload.email,
        role: payload.role,
        is_admin: payload.is_admin,
        password: payload.password,
    };
    let user = state.user_service.admin_update(&principal, id, edit).await?;
    Ok(Json(ApiSuccess::new(UserEnvelope {
        user: Some(UserView::from(user)),
    })))
}

#[utoipa::path(
    post,
    path = "/api/admin/users/{id}/reset-password",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "New password; the user's sessions are revoked"),
        (status = 404, description = "User not found")
    )
)]
#[axum::debug_handler]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    CurrentPrincipal(principal): CurrentPrincipal,
    submission: Submission,
) -> Result<impl IntoResponse> {
    let payload = PasswordResetPayload::from_submission(&submission);
    payload.validate()?;
    let temporary_password = state
        .user_service
        .reset_password(&principal, id, payload.password)
        .await?;
    Ok(Json(ApiSuccess::new(PasswordReset {
        user_id: id,
        temporary_password,
    })))
}
