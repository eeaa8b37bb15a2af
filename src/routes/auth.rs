use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use validator::Validate;

use crate::{
    dto::{
        auth_dto::{LoginPayload, LoginResponse, SignupPayload, UserEnvelope, UserView},
        submission::Submission,
        ApiSuccess, Message,
    },
    error::Result,
    middleware::auth::{expired_session_cookie, session_cookie, session_token, CurrentPrincipal},
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/auth/signup",
    responses(
        (status = 201, description = "Account created"),
        (status = 400, description = "Invalid payload"),
        (status = 409, description = "Email already registered")
    )
)]
#[axum::debug_handler]
pub async fn signup(
    State(state): State<AppState>,
    submission: Submission,
) -> Result<impl IntoResponse> {
    let payload = SignupPayload::from_submission(&submission)?;
    payload.validate()?;
    let user = state.identity_service.signup(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiSuccess::new(UserEnvelope {
            user: Some(UserView::from(user)),
        })),
    ))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    responses(
        (status = 200, description = "Session opened, cookie set"),
        (status = 401, description = "Invalid credentials")
    )
)]
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    submission: Submission,
) -> Result<impl IntoResponse> {
    let payload = LoginPayload::from_submission(&submission);
    payload.validate()?;
    let (user, token) = state.identity_service.login(payload).await?;
    let cookie = session_cookie(
        &token,
        state.settings.session_ttl_hours,
        state.settings.cookie_secure,
    );
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(ApiSuccess::new(LoginResponse {
            user: UserView::from(user),
            token,
        })),
    ))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 200, description = "Session closed"))
)]
#[axum::debug_handler]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<impl IntoResponse> {
    if let Some(token) = session_token(&headers) {
        state.identity_service.logout(&token).await?;
    }
    Ok((
        [(
            header::SET_COOKIE,
            expired_session_cookie(state.settings.cookie_secure),
        )],
        Json(Message::new("Logged out")),
    ))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses((status = 200, description = "Current user, or null when anonymous"))
)]
#[axum::debug_handler]
pub async fn whoami(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<impl IntoResponse> {
    let response = match state.identity_service.current_user(&principal).await? {
        Some(user) => Json(json!({ "success": true, "user": UserView::from(user) })),
        None => Json(json!({ "success": false, "user": null })),
    };
    Ok(response)
}
