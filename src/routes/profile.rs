use axum::{extract::State, response::IntoResponse, Json};
use validator::Validate;

use crate::{
    dto::{
        auth_dto::{ProfilePayload, UserEnvelope, UserView},
        submission::Submission,
        ApiSuccess,
    },
    error::Result,
    middleware::auth::CurrentPrincipal,
    services::user_service::ProfileEdit,
    AppState,
};

#[utoipa::path(
    patch,
    path = "/api/profile",
    responses(
        (status = 200, description = "Profile updated"),
        (status = 403, description = "Name change limit reached"),
        (status = 409, description = "Email already in use")
    )
)]
#[axum::debug_handler]
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    mut submission: Submission,
) -> Result<impl IntoResponse> {
    let payload = ProfilePayload {
        name: submission.text("name"),
        email: submission.text("email"),
        bio: submission.text("bio"),
    };
    payload.validate()?;
    let picture = submission.take_file("profile_pic");

    let edit = ProfileEdit {
        name: payload.name,
        email: payload.email,
        bio: payload.bio,
    };
    let user = state
        .user_service
        .update_profile(&principal, edit, picture)
        .await?;
    Ok(Json(ApiSuccess::new(UserEnvelope {
        user: Some(UserView::from(user)),
    })))
}
