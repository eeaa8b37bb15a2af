pub mod admin;
pub mod applications;
pub mod auth;
pub mod docs;
pub mod health;
pub mod notifications;
pub mod offers;
pub mod profile;
pub mod search;
pub mod social;

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{delete, get, patch, post},
    Router,
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::middleware::{
    auth::{require_admin, require_session},
    cors::cors_layer,
    rate_limit::{rps_middleware, RateLimiter},
};
use crate::AppState;

const MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

/// Router-level knobs that do not belong to the services.
#[derive(Debug, Clone)]
pub struct RouterOptions {
    pub public_rps: u32,
    pub api_rps: u32,
    pub cors_origin: Option<String>,
    pub uploads_dir: String,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            public_rps: 50,
            api_rps: 100,
            cors_origin: None,
            uploads_dir: "./uploads".to_string(),
        }
    }
}

pub fn app(state: AppState, options: &RouterOptions) -> Router {
    let base_routes = Router::new()
        .route("/health", get(health::health))
        .route("/api/openapi.json", get(docs::openapi_json));

    // Reachable without a session; handlers still see the principal when there is one.
    let public_api = Router::new()
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::whoami))
        .route("/api/internships", get(offers::list_offers))
        .route("/api/internships/:id", get(offers::get_offer))
        .route(
            "/api/applications",
            post(applications::submit_application).get(applications::list_applications),
        )
        // Legacy access policy lets anonymous callers through; the service decides.
        .route(
            "/api/applications/:id/status",
            patch(applications::update_application_status),
        )
        .route("/api/posts", get(social::feed))
        .route("/api/posts/:id/comments", get(social::list_comments))
        .route("/api/users/:id/follow-info", get(social::follow_info))
        .route("/api/ratings", get(social::hotel_rating))
        .route("/api/search", get(search::search))
        .layer(from_fn_with_state(
            RateLimiter::new(options.public_rps),
            rps_middleware,
        ));

    let session_api = Router::new()
        .route("/api/internships", post(offers::create_offer))
        .route(
            "/api/internships/:id",
            patch(offers::update_offer)
                .post(offers::update_offer)
                .delete(offers::delete_offer),
        )
        .route("/api/internships/bulk-delete", post(offers::bulk_delete_offers))
        .route("/api/internships/delete-mine", post(offers::delete_my_offers))
        .route("/api/applications/:id", delete(applications::delete_application))
        .route(
            "/api/applications/bulk-delete",
            post(applications::bulk_delete_applications),
        )
        .route("/api/notifications", get(notifications::list_notifications))
        .route(
            "/api/notifications/read-all",
            post(notifications::mark_all_notifications_read),
        )
        .route(
            "/api/notifications/:id/read",
            post(notifications::mark_notification_read),
        )
        .route(
            "/api/notifications/:id",
            delete(notifications::delete_notification),
        )
        .route("/api/posts", post(social::create_post))
        .route(
            "/api/posts/:id",
            patch(social::edit_post).delete(social::delete_post),
        )
        .route("/api/posts/:id/like", post(social::toggle_like))
        .route("/api/posts/:id/comments", post(social::add_comment))
        .route(
            "/api/comments/:id",
            patch(social::edit_comment).delete(social::delete_comment),
        )
        .route(
            "/api/users/:id/follow",
            post(social::follow).delete(social::unfollow),
        )
        .route("/api/ratings", post(social::rate_hotel))
        .route("/api/profile", patch(profile::update_profile))
        .route_layer(from_fn_with_state(state.clone(), require_session))
        .layer(from_fn_with_state(
            RateLimiter::new(options.api_rps),
            rps_middleware,
        ));

    let admin_api = Router::new()
        .route("/api/admin/users", get(admin::list_users))
        .route(
            "/api/admin/users/:id",
            patch(admin::update_user).delete(admin::delete_user),
        )
        .route(
            "/api/admin/users/:id/reset-password",
            post(admin::reset_password),
        )
        .route_layer(from_fn_with_state(state.clone(), require_admin))
        .layer(from_fn_with_state(
            RateLimiter::new(options.api_rps),
            rps_middleware,
        ));

    tracing::info!(uploads_dir = %options.uploads_dir, "serving uploads");

    base_routes
        .merge(public_api)
        .merge(session_api)
        .merge(admin_api)
        .nest_service("/uploads", ServeDir::new(&options.uploads_dir))
        .with_state(state)
        .layer(cors_layer(options.cors_origin.as_deref()))
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}
