use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    dto::{
        social_dto::{
            CommentEnvelope, CommentList, ContentPayload, FeedQuery, PostEnvelope, PostList,
            RatingPayload, RatingQuery,
        },
        submission::Submission,
        ApiSuccess, Message, QueryParams,
    },
    error::Result,
    middleware::auth::CurrentPrincipal,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/posts",
    params(("limit" = Option<i64>, Query, description = "At most 100")),
    responses((status = 200, description = "Newest posts with counts"))
)]
#[axum::debug_handler]
pub async fn feed(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<FeedQuery>,
) -> Result<impl IntoResponse> {
    let posts = state.social_service.feed(query.limit).await?;
    Ok(Json(ApiSuccess::new(PostList { posts })))
}

#[utoipa::path(
    post,
    path = "/api/posts",
    responses(
        (status = 201, description = "Post created"),
        (status = 400, description = "Empty post or bad image"),
        (status = 401, description = "Not authenticated")
    )
)]
#[axum::debug_handler]
pub async fn create_post(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    mut submission: Submission,
) -> Result<impl IntoResponse> {
    let content = submission.text("content");
    let image = submission.take_file("image");
    let post = state
        .social_service
        .create_post(&principal, content, image)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiSuccess::new(PostEnvelope { post }))))
}

#[utoipa::path(
    delete,
    path = "/api/posts/{id}",
    params(("id" = i64, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Post removed with likes and comments"),
        (status = 403, description = "Not the author")
    )
)]
#[axum::debug_handler]
pub async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<impl IntoResponse> {
    state.social_service.delete_post(&principal, id).await?;
    Ok(Json(Message::new("Post deleted")))
}

#[utoipa::path(
    patch,
    path = "/api/posts/{id}",
    params(("id" = i64, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Post after the edit"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Post not found")
    )
)]
#[axum::debug_handler]
pub async fn edit_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    CurrentPrincipal(principal): CurrentPrincipal,
    submission: Submission,
) -> Result<impl IntoResponse> {
    let payload = ContentPayload::from_submission(&submission);
    payload.validate()?;
    let post = state
        .social_service
        .edit_post(&principal, id, payload.content)
        .await?;
    Ok(Json(ApiSuccess::new(PostEnvelope { post })))
}

#[utoipa::path(
    post,
    path = "/api/posts/{id}/like",
    params(("id" = i64, Path, description = "Post ID")),
    responses((status = 200, description = "Like toggled"))
)]
#[axum::debug_handler]
pub async fn toggle_like(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<impl IntoResponse> {
    let toggle = state.social_service.toggle_like(&principal, id).await?;
    Ok(Json(ApiSuccess::new(toggle)))
}

#[utoipa::path(
    get,
    path = "/api/posts/{id}/comments",
    params(("id" = i64, Path, description = "Post ID")),
    responses((status = 200, description = "Comments, oldest first"))
)]
#[axum::debug_handler]
pub async fn list_comments(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let comments = state.social_service.comments(id).await?;
    Ok(Json(ApiSuccess::new(CommentList { comments })))
}

#[utoipa::path(
    post,
    path = "/api/posts/{id}/comments",
    params(("id" = i64, Path, description = "Post ID")),
    responses(
        (status = 201, description = "Comment added"),
        (status = 400, description = "Empty comment")
    )
)]
#[axum::debug_handler]
pub async fn add_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    CurrentPrincipal(principal): CurrentPrincipal,
    submission: Submission,
) -> Result<impl IntoResponse> {
    let payload = ContentPayload::from_submission(&submission);
    payload.validate()?;
    let comment = state
        .social_service
        .add_comment(&principal, id, payload.content)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiSuccess::new(CommentEnvelope { comment })),
    ))
}

#[utoipa::path(
    patch,
    path = "/api/comments/{id}",
    params(("id" = i64, Path, description = "Comment ID")),
    responses(
        (status = 200, description = "Comment after the edit"),
        (status = 400, description = "Empty comment"),
        (status = 403, description = "Not the author or an admin"),
        (status = 404, description = "Comment not found")
    )
)]
#[axum::debug_handler]
pub async fn edit_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    CurrentPrincipal(principal): CurrentPrincipal,
    submission: Submission,
) -> Result<impl IntoResponse> {
    let payload = ContentPayload::from_submission(&submission);
    payload.validate()?;
    let comment = state
        .social_service
        .edit_comment(&principal, id, payload.content)
        .await?;
    Ok(Json(ApiSuccess::new(CommentEnvelope { comment })))
}

#[utoipa::path(
    delete,
    path = "/api/comments/{id}",
    params(("id" = i64, Path, description = "Comment ID")),
    responses((status = 200, description = "Comment removed"))
)]
#[axum::debug_handler]
pub async fn delete_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<impl IntoResponse> {
    state.social_service.delete_comment(&principal, id).await?;
    Ok(Json(Message::new("Comment deleted")))
}

#[utoipa::path(
    post,
    path = "/api/users/{id}/follow",
    params(("id" = i64, Path, description = "User to follow")),
    responses(
        (status = 200, description = "Following; counts returned"),
        (status = 400, description = "Self-follow")
    )
)]
#[axum::debug_handler]
pub async fn follow(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<impl IntoResponse> {
    let info = state.social_service.follow(&principal, id).await?;
    Ok(Json(ApiSuccess::new(info)))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}/follow",
    params(("id" = i64, Path, description = "User to unfollow")),
    responses((status = 200, description = "Not following; counts returned"))
)]
#[axum::debug_handler]
pub async fn unfollow(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<impl IntoResponse> {
    let info = state.social_service.unfollow(&principal, id).await?;
    Ok(Json(ApiSuccess::new(info)))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}/follow-info",
    params(("id" = i64, Path, description = "User ID")),
    responses((status = 200, description = "Follower and following counts"))
)]
#[axum::debug_handler]
pub async fn follow_info(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<impl IntoResponse> {
    let info = state.social_service.follow_info(&principal, id).await?;
    Ok(Json(ApiSuccess::new(info)))
}

#[utoipa::path(
    post,
    path = "/api/ratings",
    responses(
        (status = 200, description = "Rating stored; summary returned"),
        (status = 400, description = "Rating outside 1..5")
    )
)]
#[axum::debug_handler]
pub async fn rate_hotel(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    submission: Submission,
) -> Result<impl IntoResponse> {
    let payload = RatingPayload::from_submission(&submission)?;
    payload.validate()?;
    let summary = state
        .social_service
        .rate_hotel(&principal, &payload.hotel, payload.rating)
        .await?;
    Ok(Json(ApiSuccess::new(summary)))
}

#[utoipa::path(
    get,
    path = "/api/ratings",
    params(("hotel" = String, Query, description = "Hotel name")),
    responses((status = 200, description = "Average, count and the caller's rating"))
)]
#[axum::debug_handler]
pub async fn hotel_rating(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    QueryParams(query): QueryParams<RatingQuery>,
) -> Result<impl IntoResponse> {
    let summary = state
        .social_service
        .hotel_rating(&principal, &query.hotel)
        .await?;
    Ok(Json(ApiSuccess::new(summary)))
}
