//! Persistence seams.
//!
//! Services talk to `dyn Store`; `PgStore` backs the running server and
//! `MemoryStore` backs tests and local experiments. Both mirror the same
//! foreign-key behavior (see `migrations/`).

pub mod memory;
pub mod pool;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{
    application::{Application, ApplicationScope, ApplicationStatus, NewApplication},
    follow::FollowInfo,
    notification::{NewNotification, Notification},
    offer::{NewOffer, Offer, OfferFields, OfferQuery},
    post::{Comment, LikeToggle, Post, PostSummary},
    rating::RatingSummary,
    search::{PostHit, SearchTerm, UserHit},
    session::Session,
    user::{AccountChanges, NewUser, ProfileChanges, User},
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict` when the email is taken.
    async fn insert_user(&self, user: NewUser) -> Result<User>;
    async fn find_user(&self, id: i64) -> Result<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn find_employer_by_name(&self, name: &str) -> Result<Option<User>>;
    async fn list_users_except(&self, id: i64) -> Result<Vec<User>>;
    async fn update_profile(&self, id: i64, changes: ProfileChanges) -> Result<User>;
    /// `None` when the user does not exist; `Conflict` when the email is taken.
    async fn update_account(&self, id: i64, changes: AccountChanges) -> Result<Option<User>>;
    async fn record_name_change(&self, user_id: i64, old_name: &str, new_name: &str)
        -> Result<()>;
    async fn count_name_changes_since(&self, user_id: i64, since: DateTime<Utc>) -> Result<i64>;
    async fn delete_name_changes(&self, user_id: i64) -> Result<u64>;
    async fn delete_user(&self, id: i64) -> Result<bool>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn insert_session(
        &self,
        token_hash: &str,
        user_id: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<Session>;
    async fn find_session(&self, token_hash: &str) -> Result<Option<Session>>;
    async fn delete_session(&self, token_hash: &str) -> Result<()>;
    async fn delete_sessions_for_user(&self, user_id: i64) -> Result<u64>;
    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64>;
}

#[async_trait]
pub trait OfferRepository: Send + Sync {
    async fn insert_offer(&self, offer: NewOffer) -> Result<Offer>;
    async fn find_offer(&self, id: i64) -> Result<Option<Offer>>;
    async fn list_offers(&self, query: &OfferQuery) -> Result<Vec<Offer>>;
    /// Applies only the `Some` fields.
    async fn update_offer(&self, id: i64, fields: OfferFields) -> Result<Offer>;
    async fn delete_offer(&self, id: i64) -> Result<bool>;
    async fn offer_ids_by_employer(&self, employer_id: i64) -> Result<Vec<i64>>;
    async fn offer_ids_by_hotel(&self, hotel: &str) -> Result<Vec<i64>>;
}

#[async_trait]
pub trait ApplicationRepository: Send + Sync {
    async fn insert_application(&self, application: NewApplication) -> Result<Application>;
    async fn find_application(&self, id: i64) -> Result<Option<Application>>;
    async fn list_applications(
        &self,
        scope: &ApplicationScope,
        internship_id: Option<i64>,
    ) -> Result<Vec<Application>>;
    async fn set_application_status(
        &self,
        id: i64,
        status: ApplicationStatus,
    ) -> Result<Option<Application>>;
    async fn delete_application(&self, id: i64) -> Result<bool>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn insert_notification(&self, notification: NewNotification) -> Result<Notification>;
    async fn list_notifications(
        &self,
        recipient_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>>;
    async fn count_unread(&self, recipient_id: i64) -> Result<i64>;
    async fn mark_read(&self, id: i64, recipient_id: i64) -> Result<bool>;
    async fn mark_all_read(&self, recipient_id: i64) -> Result<u64>;
    async fn soft_delete_notification(&self, id: i64, recipient_id: i64) -> Result<bool>;
    /// Removes notifications whose data carries `internship_id` equal to the offer.
    async fn delete_notifications_for_offer(&self, internship_id: i64) -> Result<u64>;
    /// Removes notifications where the user is recipient or actor.
    async fn delete_notifications_for_user(&self, user_id: i64) -> Result<u64>;
}

#[async_trait]
pub trait SocialRepository: Send + Sync {
    async fn insert_post(
        &self,
        user_id: i64,
        content: &str,
        image_path: Option<&str>,
    ) -> Result<Post>;
    async fn find_post(&self, id: i64) -> Result<Option<Post>>;
    async fn list_posts(&self, limit: i64) -> Result<Vec<PostSummary>>;
    async fn posts_by_user(&self, user_id: i64) -> Result<Vec<Post>>;
    async fn update_post_content(&self, id: i64, content: &str) -> Result<Option<Post>>;
    /// Likes and comments on the post go with it.
    async fn delete_post(&self, id: i64) -> Result<bool>;
    async fn delete_posts_by_user(&self, user_id: i64) -> Result<u64>;

    async fn toggle_like(&self, post_id: i64, user_id: i64) -> Result<LikeToggle>;
    async fn delete_likes_by_user(&self, user_id: i64) -> Result<u64>;

    async fn insert_comment(&self, post_id: i64, user_id: i64, content: &str) -> Result<Comment>;
    async fn find_comment(&self, id: i64) -> Result<Option<Comment>>;
    async fn comments_for_post(&self, post_id: i64) -> Result<Vec<Comment>>;
    async fn update_comment(&self, id: i64, content: &str) -> Result<Option<Comment>>;
    async fn delete_comment(&self, id: i64) -> Result<bool>;
    async fn delete_comments_by_user(&self, user_id: i64) -> Result<u64>;

    async fn follow(&self, follower_id: i64, following_id: i64) -> Result<()>;
    async fn unfollow(&self, follower_id: i64, following_id: i64) -> Result<()>;
    async fn follow_info(&self, user_id: i64, viewer: Option<i64>) -> Result<FollowInfo>;
    async fn delete_follows_for_user(&self, user_id: i64) -> Result<u64>;

    async fn upsert_rating(&self, hotel: &str, user_id: i64, rating: i32) -> Result<()>;
    async fn rating_summary(&self, hotel: &str, viewer: Option<i64>) -> Result<RatingSummary>;
    async fn delete_ratings_for_hotel(&self, hotel: &str) -> Result<u64>;
}

/// Offers are searched through [`OfferRepository::list_offers`].
#[async_trait]
pub trait SearchRepository: Send + Sync {
    /// Newest first; `liked_by_me` is false without a viewer.
    async fn search_posts(
        &self,
        term: &SearchTerm,
        viewer: Option<i64>,
        limit: i64,
    ) -> Result<Vec<PostHit>>;
    /// Distinct, alphabetical.
    async fn search_hotels(&self, term: &SearchTerm, limit: i64) -> Result<Vec<String>>;
    /// Matches name or email.
    async fn search_users(&self, term: &SearchTerm, limit: i64) -> Result<Vec<UserHit>>;
}

pub trait Store:
    UserRepository
    + SessionRepository
    + OfferRepository
    + ApplicationRepository
    + NotificationRepository
    + SocialRepository
    + SearchRepository
{
}

impl<T> Store for T where
    T: UserRepository
        + SessionRepository
        + OfferRepository
        + ApplicationRepository
        + NotificationRepository
        + SocialRepository
        + SearchRepository
{
}
