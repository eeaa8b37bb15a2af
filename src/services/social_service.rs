use std::sync::Arc;

use crate::database::Store;
use crate::error::{Error, Result};
use crate::models::{
    follow::FollowInfo,
    post::{Comment, LikeToggle, Post, PostSummary},
    rating::RatingSummary,
};
use crate::services::identity_service::{Actor, Principal};
use crate::storage::{FileStore, Upload, IMAGE_EXTENSIONS};
use crate::utils::validation::require_text;

pub const POST_IMAGE_NAMESPACE: &str = "posts";
const DEFAULT_FEED_SIZE: i64 = 50;
const MAX_FEED_SIZE: i64 = 100;

/// Posts, likes, comments, follows and hotel ratings.
#[derive(Clone)]
pub struct SocialService {
    store: Arc<dyn Store>,
    files: Arc<dyn FileStore>,
}

fn author_or_admin(actor: &Actor, author_id: i64) -> Result<()> {
    if actor.is_admin || actor.id == author_id {
        Ok(())
    } else {
        Err(Error::Forbidden("Not allowed".into()))
    }
}

impl SocialService {
    pub fn new(store: Arc<dyn Store>, files: Arc<dyn FileStore>) -> Self {
        Self { store, files }
    }

    pub async fn feed(&self, limit: Option<i64>) -> Result<Vec<PostSummary>> {
        let limit = limit.unwrap_or(DEFAULT_FEED_SIZE).clamp(1, MAX_FEED_SIZE);
        self.store.list_posts(limit).await
    }

    pub async fn create_post(
        &self,
        principal: &Principal,
        content: Option<String>,
        image: Option<Upload>,
    ) -> Result<Post> {
        let actor = principal.require_authenticated()?;
        let content = content.map(|c| c.trim().to_string()).unwrap_or_default();
        let image = image.filter(|u| !u.is_empty());
        if content.is_empty() && image.is_none() {
            return Err(Error::BadRequest("Post content or image is required".into()));
        }

        let image_path = match image {
            Some(upload) => Some(
                self.files
                    .store(POST_IMAGE_NAMESPACE, "post", &upload, IMAGE_EXTENSIONS)
                    .await?,
            ),
            None => None,
        };

        match self
            .store
            .insert_post(actor.id, &content, image_path.as_deref())
            .await
        {
            Ok(post) => Ok(post),
            Err(e) => {
                if let Some(path) = image_path.as_deref() {
                    self.discard_file(path).await;
                }
                Err(e)
            }
        }
    }

    pub async fn delete_post(&self, principal: &Principal, id: i64) -> Result<()> {
        let actor = principal.require_authenticated()?;
        let post = self.find_post(id).await?;
        author_or_admin(actor, post.user_id)?;

        if !self.store.delete_post(id).await? {
            return Err(Error::NotFound("Post not found".into()));
        }
        if let Some(path) = post.image_path.as_deref() {
            self.discard_file(path).await;
        }
        tracing::info!(post_id = id, actor_id = actor.id, "post deleted");
        Ok(())
    }

    /// Author only. Without new content the post is returned unchanged.
    pub async fn edit_post(
        &self,
        principal: &Principal,
        id: i64,
        content: Option<String>,
    ) -> Result<Post> {
        let actor = principal.require_authenticated()?;
        let post = self.find_post(id).await?;
        if post.user_id != actor.id {
            return Err(Error::Forbidden("Not allowed".into()));
        }
        let Some(content) = content else {
            return Ok(post);
        };
        let content = require_text("content", Some(content))?;
        let updated = self
            .store
            .update_post_content(id, &content)
            .await?
            .ok_or_else(|| Error::NotFound("Post not found".into()))?;
        tracing::info!(post_id = id, actor_id = actor.id, "post edited");
        Ok(updated)
    }

    pub async fn toggle_like(&self, principal: &Principal, post_id: i64) -> Result<LikeToggle> {
        let actor = principal.require_authenticated()?;
        self.find_post(post_id).await?;
        self.store.toggle_like(post_id, actor.id).await
    }

    pub async fn comments(&self, post_id: i64) -> Result<Vec<Comment>> {
        self.find_post(post_id).await?;
        self.store.comments_for_post(post_id).await
    }

    pub async fn add_comment(
        &self,
        principal: &Principal,
        post_id: i64,
        content: Option<String>,
    ) -> Result<Comment> {
        let actor = principal.require_authenticated()?;
        let content = require_text("content", content)?;
        self.find_post(post_id).await?;
        self.store.insert_comment(post_id, actor.id, &content).await
    }

    pub async fn edit_comment(
        &self,
        principal: &Principal,
        id: i64,
        content: Option<String>,
    ) -> Result<Comment> {
        let actor = principal.require_authenticated()?;
        let content = require_text("content", content)?;
        let comment = self
            .store
            .find_comment(id)
            .await?
            .ok_or_else(|| Error::NotFound("Comment not found".into()))?;
        author_or_admin(actor, comment.user_id)?;
        self.store
            .update_comment(id, &content)
            .await?
            .ok_or_else(|| Error::NotFound("Comment not found".into()))
    }

    pub async fn delete_comment(&self, principal: &Principal, id: i64) -> Result<()> {
        let actor = principal.require_authenticated()?;
        let comment = self
            .store
            .find_comment(id)
            .await?
            .ok_or_else(|| Error::NotFound("Comment not found".into()))?;
        author_or_admin(actor, comment.user_id)?;
        self.store.delete_comment(id).await?;
        Ok(())
    }

    pub async fn follow(&self, principal: &Principal, target_id: i64) -> Result<FollowInfo> {
        let actor = principal.require_authenticated()?;
        if actor.id == target_id {
            return Err(Error::BadRequest("You cannot follow yourself".into()));
        }
        self.ensure_user(target_id).await?;
        self.store.follow(actor.id, target_id).await?;
        self.store.follow_info(target_id, Some(actor.id)).await
    }

    pub async fn unfollow(&self, principal: &Principal, target_id: i64) -> Result<FollowInfo> {
        let actor = principal.require_authenticated()?;
        if actor.id == target_id {
            return Err(Error::BadRequest("You cannot follow yourself".into()));
        }
        self.ensure_user(target_id).await?;
        self.store.unfollow(actor.id, target_id).await?;
        self.store.follow_info(target_id, Some(actor.id)).await
    }

    pub async fn follow_info(&self, principal: &Principal, user_id: i64) -> Result<FollowInfo> {
        self.ensure_user(user_id).await?;
        self.store.follow_info(user_id, principal.user_id()).await
    }

    /// One rating per (hotel, user); a second submission replaces the first.
    pub async fn rate_hotel(
        &self,
        principal: &Principal,
        hotel: &str,
        rating: i32,
    ) -> Result<RatingSummary> {
        let actor = principal.require_authenticated()?;
        let hotel = hotel.trim();
        if hotel.is_empty() {
            return Err(Error::BadRequest("hotel is required".into()));
        }
        if !(1..=5).contains(&rating) {
            return Err(Error::BadRequest("rating must be between 1 and 5".into()));
        }
        self.store.upsert_rating(hotel, actor.id, rating).await?;
        self.store.rating_summary(hotel, Some(actor.id)).await
    }

    pub async fn hotel_rating(&self, principal: &Principal, hotel: &str) -> Result<RatingSummary> {
        let hotel = hotel.trim();
        if hotel.is_empty() {
            return Err(Error::BadRequest("hotel is required".into()));
        }
        self.store.rating_summary(hotel, principal.user_id()).await
    }

    async fn find_post(&self, id: i64) -> Result<Post> {
        self.store
            .find_post(id)
            .await?
            .ok_or_else(|| Error::NotFound("Post not found".into()))
    }

    async fn ensure_user(&self, id: i64) -> Result<()> {
        match self.store.find_user(id).await? {
            Some(_) => Ok(()),
            None => Err(Error::NotFound("User not found".into())),
        }
    }

    async fn discard_file(&self, path: &str) {
        if let Err(e) = self.files.delete(path).await {
            tracing::warn!(path, error = %e, "failed to remove post image");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{MemoryStore, UserRepository};
    use crate::models::post::LikeAction;
    use crate::models::user::{NewUser, Role};
    use crate::storage::MemoryFileStore;

    async fn member(store: &MemoryStore, name: &str) -> Principal {
        let user = store
            .insert_user(NewUser {
                name: name.into(),
                email: format!("{}@x.com", name.to_lowercase()),
                password_hash: "x".into(),
                role: Role::Trainee,
                is_admin: false,
            })
            .await
            .unwrap();
        Principal::User(Actor::from(&user))
    }

    #[tokio::test]
    async fn like_toggles_and_comments_need_text() {
        let store = Arc::new(MemoryStore::new());
        let social = SocialService::new(store.clone(), Arc::new(MemoryFileStore::new()));
        let ali = member(&store, "Ali").await;

        let post = social
            .create_post(&ali, Some("First day at the Hyatt".into()), None)
            .await
            .unwrap();

        let liked = social.toggle_like(&ali, post.id).await.unwrap();
        assert_eq!((liked.action, liked.count), (LikeAction::Liked, 1));
        let unliked = social.toggle_like(&ali, post.id).await.unwrap();
        assert_eq!((unliked.action, unliked.count), (LikeAction::Unliked, 0));

        assert!(matches!(
            social.add_comment(&ali, post.id, Some("  ".into())).await,
            Err(Error::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn only_the_author_or_an_admin_deletes_a_post() {
        let store = Arc::new(MemoryStore::new());
        let social = SocialService::new(store.clone(), Arc::new(MemoryFileStore::new()));
        let ali = member(&store, "Ali").await;
        let sara = member(&store, "Sara").await;

        let post = social.create_post(&ali, Some("hello".into()), None).await.unwrap();
        assert!(matches!(
            social.delete_post(&sara, post.id).await,
            Err(Error::Forbidden(_))
        ));
        social.delete_post(&ali, post.id).await.unwrap();
    }

    #[tokio::test]
    async fn posts_are_edited_by_their_author_only() {
        let store = Arc::new(MemoryStore::new());
        let social = SocialService::new(store.clone(), Arc::new(MemoryFileStore::new()));
        let ali = member(&store, "Ali").await;
        let sara = member(&store, "Sara").await;
        let post = social.create_post(&ali, Some("draft".into()), None).await.unwrap();

        assert!(matches!(
            social.edit_post(&sara, post.id, Some("hijack".into())).await,
            Err(Error::Forbidden(_))
        ));
        assert!(matches!(
            social.edit_post(&ali, 9999, Some("x".into())).await,
            Err(Error::NotFound(_))
        ));

        let unchanged = social.edit_post(&ali, post.id, None).await.unwrap();
        assert_eq!(unchanged.content, "draft");
        assert!(unchanged.updated_at.is_none());

        let edited = social
            .edit_post(&ali, post.id, Some(" final ".into()))
            .await
            .unwrap();
        assert_eq!(edited.content, "final");
        assert!(edited.updated_at.is_some());
    }

    #[tokio::test]
    async fn comments_are_edited_by_author_or_admin() {
        let store = Arc::new(MemoryStore::new());
        let social = SocialService::new(store.clone(), Arc::new(MemoryFileStore::new()));
        let ali = member(&store, "Ali").await;
        let sara = member(&store, "Sara").await;
        let admin = match member(&store, "Root").await {
            Principal::User(actor) => Principal::User(Actor {
                is_admin: true,
                ..actor
            }),
            Principal::Anonymous => unreachable!(),
        };

        let post = social.create_post(&ali, Some("hello".into()), None).await.unwrap();
        let comment = social
            .add_comment(&ali, post.id, Some("nice".into()))
            .await
            .unwrap();

        assert!(matches!(
            social.edit_comment(&sara, comment.id, Some("mine".into())).await,
            Err(Error::Forbidden(_))
        ));
        assert!(matches!(
            social.edit_comment(&ali, comment.id, Some(" ".into())).await,
            Err(Error::BadRequest(_))
        ));
        assert!(matches!(
            social.edit_comment(&ali, 9999, Some("x".into())).await,
            Err(Error::NotFound(_))
        ));

        let edited = social
            .edit_comment(&admin, comment.id, Some("moderated".into()))
            .await
            .unwrap();
        assert_eq!(edited.content, "moderated");
        assert_eq!(edited.author_name, "Ali");
        assert!(edited.updated_at.is_some());
    }

    #[tokio::test]
    async fn follow_is_idempotent_and_self_follow_rejected() {
        let store = Arc::new(MemoryStore::new());
        let social = SocialService::new(store.clone(), Arc::new(MemoryFileStore::new()));
        let ali = member(&store, "Ali").await;
        let sara = member(&store, "Sara").await;
        let sara_id = sara.user_id().unwrap();

        social.follow(&ali, sara_id).await.unwrap();
        let info = social.follow(&ali, sara_id).await.unwrap();
        assert_eq!(info.followers, 1);
        assert!(info.i_follow);

        assert!(matches!(
            social.follow(&sara, sara_id).await,
            Err(Error::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn rating_upserts_per_user() {
        let store = Arc::new(MemoryStore::new());
        let social = SocialService::new(store.clone(), Arc::new(MemoryFileStore::new()));
        let ali = member(&store, "Ali").await;

        social.rate_hotel(&ali, "Hyatt", 2).await.unwrap();
        let summary = social.rate_hotel(&ali, "Hyatt", 4).await.unwrap();
        assert_eq!(summary.count, 1);
        assert_eq!(summary.my_rating, Some(4));
        assert!((summary.avg - 4.0).abs() < f64::EPSILON);

        assert!(social.rate_hotel(&ali, "Hyatt", 0).await.is_err());
    }
}
