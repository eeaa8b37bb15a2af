use axum::{response::IntoResponse, Json};
use utoipa::OpenApi;

use crate::routes::{
    admin, applications, auth, health, notifications, offers, profile, search, social,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup,
        auth::login,
        auth::logout,
        auth::whoami,
        offers::list_offers,
        offers::get_offer,
        offers::create_offer,
        offers::update_offer,
        offers::delete_offer,
        offers::bulk_delete_offers,
        offers::delete_my_offers,
        applications::submit_application,
        applications::list_applications,
        applications::update_application_status,
        applications::delete_application,
        applications::bulk_delete_applications,
        notifications::list_notifications,
        notifications::mark_notification_read,
        notifications::mark_all_notifications_read,
        notifications::delete_notification,
        social::feed,
        social::create_post,
        social::edit_post,
        social::delete_post,
        social::toggle_like,
        social::list_comments,
        social::add_comment,
        social::edit_comment,
        social::delete_comment,
        social::follow,
        social::unfollow,
        social::follow_info,
        social::rate_hotel,
        social::hotel_rating,
        profile::update_profile,
        admin::list_users,
        admin::update_user,
        admin::reset_password,
        admin::delete_user,
        search::search,
        health::health,
    ),
    info(title = "StageConnect API")
)]
pub struct ApiDoc;

#[axum::debug_handler]
pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
