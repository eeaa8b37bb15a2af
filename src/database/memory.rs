use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{
    ApplicationRepository, NotificationRepository, OfferRepository, SearchRepository,
    SessionRepository, SocialRepository, UserRepository,
};
use crate::error::{Error, Result};
use crate::models::{
    application::{Application, ApplicationScope, ApplicationStatus, NewApplication},
    follow::FollowInfo,
    notification::{NewNotification, Notification},
    offer::{NewOffer, Offer, OfferFields, OfferQuery},
    post::{Comment, LikeAction, LikeToggle, Post, PostSummary},
    rating::RatingSummary,
    search::{PostHit, SearchTerm, UserHit},
    session::Session,
    user::{AccountChanges, NameChange, NewUser, ProfileChanges, Role, User},
};

#[derive(Debug, Clone)]
struct LikeRow {
    post_id: i64,
    user_id: i64,
}

#[derive(Debug, Clone)]
struct CommentRow {
    id: i64,
    post_id: i64,
    user_id: i64,
    content: String,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
struct FollowRow {
    follower_id: i64,
    following_id: i64,
}

#[derive(Debug, Clone)]
struct RatingRow {
    hotel: String,
    user_id: i64,
    rating: i32,
}

#[derive(Debug, Default)]
struct Tables {
    next_id: i64,
    users: Vec<User>,
    sessions: Vec<Session>,
    offers: Vec<Offer>,
    applications: Vec<Application>,
    notifications: Vec<Notification>,
    posts: Vec<Post>,
    likes: Vec<LikeRow>,
    comments: Vec<CommentRow>,
    follows: Vec<FollowRow>,
    ratings: Vec<RatingRow>,
    name_changes: Vec<NameChange>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn author_name(&self, user_id: i64) -> String {
        self.users
            .iter()
            .find(|u| u.id == user_id)
            .map(|u| u.name.clone())
            .unwrap_or_default()
    }

    fn comment(&self, row: &CommentRow) -> Comment {
        Comment {
            id: row.id,
            post_id: row.post_id,
            user_id: row.user_id,
            author_name: self.author_name(row.user_id),
            content: row.content.clone(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }

    fn summary(&self, post: &Post) -> PostSummary {
        PostSummary {
            id: post.id,
            user_id: post.user_id,
            author_name: self.author_name(post.user_id),
            content: post.content.clone(),
            image_path: post.image_path.clone(),
            like_count: self.likes.iter().filter(|l| l.post_id == post.id).count() as i64,
            comment_count: self.comments.iter().filter(|c| c.post_id == post.id).count() as i64,
            created_at: post.created_at,
        }
    }
}

/// In-process store with the same foreign-key behavior as the Postgres schema.
///
/// Individual operations can be made to fail with [`MemoryStore::fail_on`], and
/// [`MemoryStore::without_resume_column`] emulates a deployment whose
/// `applications` table predates the resume column.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    failing: Mutex<HashSet<String>>,
    legacy_applications: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn without_resume_column() -> Self {
        Self {
            legacy_applications: true,
            ..Self::default()
        }
    }

    /// Every later call of the named repository method fails with an upstream error.
    pub fn fail_on(&self, operation: &str) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(operation.to_string());
        }
    }

    pub fn clear_failures(&self) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.clear();
        }
    }

    /// Inserts an offer row as-is, bypassing the service layer.
    pub fn seed_offer(&self, offer: Offer) -> Result<()> {
        let mut t = self.tables()?;
        t.next_id = t.next_id.max(offer.id);
        t.offers.push(offer);
        Ok(())
    }

    fn check(&self, operation: &str) -> Result<()> {
        let failing = self
            .failing
            .lock()
            .map_err(|_| Error::Upstream("memory store poisoned".to_string()))?;
        if failing.contains(operation) {
            return Err(Error::Upstream(format!("injected failure in {}", operation)));
        }
        Ok(())
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| Error::Upstream("memory store poisoned".to_string()))
    }

    fn open(&self, operation: &str) -> Result<MutexGuard<'_, Tables>> {
        self.check(operation)?;
        self.tables()
    }
}

fn set_if_some<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

fn set_opt_if_some<T>(target: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *target = value;
    }
}

fn apply_fields(offer: &mut Offer, f: OfferFields) {
    set_if_some(&mut offer.hotel, f.hotel);
    set_opt_if_some(&mut offer.location, f.location);
    set_opt_if_some(&mut offer.title_ar, f.title.ar);
    set_opt_if_some(&mut offer.title_fr, f.title.fr);
    set_opt_if_some(&mut offer.title_en, f.title.en);
    set_opt_if_some(&mut offer.type_ar, f.kind.ar);
    set_opt_if_some(&mut offer.type_fr, f.kind.fr);
    set_opt_if_some(&mut offer.type_en, f.kind.en);
    set_opt_if_some(&mut offer.duration_ar, f.duration.ar);
    set_opt_if_some(&mut offer.duration_fr, f.duration.fr);
    set_opt_if_some(&mut offer.duration_en, f.duration.en);
    set_opt_if_some(&mut offer.description_ar, f.description.ar);
    set_opt_if_some(&mut offer.description_fr, f.description.fr);
    set_opt_if_some(&mut offer.description_en, f.description.en);
    set_opt_if_some(&mut offer.start_date, f.start_date);
    set_opt_if_some(&mut offer.image, f.image);
    set_if_some(&mut offer.rating, f.rating);
}

fn references_offer(notification: &Notification, internship_id: i64) -> bool {
    notification
        .data
        .as_ref()
        .and_then(|d| d.get("internship_id"))
        .and_then(|v| v.as_i64())
        == Some(internship_id)
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> Result<User> {
        let mut t = self.open("insert_user")?;
        if t.users.iter().any(|u| u.email == user.email) {
            return Err(Error::Conflict("Resource already exists".to_string()));
        }
        let now = Utc::now();
        let row = User {
            id: t.next_id(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            is_admin: user.is_admin,
            bio: None,
            profile_pic: None,
            created_at: now,
            updated_at: now,
        };
        t.users.push(row.clone());
        Ok(row)
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>> {
        let t = self.open("find_user")?;
        Ok(t.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let t = self.open("find_user_by_email")?;
        Ok(t.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_employer_by_name(&self, name: &str) -> Result<Option<User>> {
        let t = self.open("find_employer_by_name")?;
        Ok(t.users
            .iter()
            .find(|u| u.name == name && u.role == Role::Employer)
            .cloned())
    }

    async fn list_users_except(&self, id: i64) -> Result<Vec<User>> {
        let t = self.open("list_users_except")?;
        let mut users: Vec<User> = t.users.iter().filter(|u| u.id != id).cloned().collect();
        users.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(users)
    }

    async fn update_profile(&self, id: i64, changes: ProfileChanges) -> Result<User> {
        let mut t = self.open("update_profile")?;
        if let Some(email) = &changes.email {
            if t.users.iter().any(|u| u.id != id && &u.email == email) {
                return Err(Error::Conflict("Resource already exists".to_string()));
            }
        }
        let user = t
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| Error::NotFound("Resource not found".to_string()))?;
        set_if_some(&mut user.name, changes.name);
        set_if_some(&mut user.email, changes.email);
        set_opt_if_some(&mut user.bio, changes.bio);
        set_opt_if_some(&mut user.profile_pic, changes.profile_pic);
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn update_account(&self, id: i64, changes: AccountChanges) -> Result<Option<User>> {
        let mut t = self.open("update_account")?;
        if let Some(email) = &changes.email {
            if t.users.iter().any(|u| u.id != id && &u.email == email) {
                return Err(Error::Conflict("Resource already exists".to_string()));
            }
        }
        let Some(user) = t.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        set_if_some(&mut user.name, changes.name);
        set_if_some(&mut user.email, changes.email);
        set_if_some(&mut user.role, changes.role);
        set_if_some(&mut user.is_admin, changes.is_admin);
        set_if_some(&mut user.password_hash, changes.password_hash);
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn record_name_change(
        &self,
        user_id: i64,
        old_name: &str,
        new_name: &str,
    ) -> Result<()> {
        let mut t = self.open("record_name_change")?;
        let id = t.next_id();
        t.name_changes.push(NameChange {
            id,
            user_id,
            old_name: old_name.to_string(),
            new_name: new_name.to_string(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn count_name_changes_since(&self, user_id: i64, since: DateTime<Utc>) -> Result<i64> {
        let t = self.open("count_name_changes_since")?;
        Ok(t.name_changes
            .iter()
            .filter(|c| c.user_id == user_id && c.created_at >= since)
            .count() as i64)
    }

    async fn delete_name_changes(&self, user_id: i64) -> Result<u64> {
        let mut t = self.open("delete_name_changes")?;
        let before = t.name_changes.len();
        t.name_changes.retain(|c| c.user_id != user_id);
        Ok((before - t.name_changes.len()) as u64)
    }

    async fn delete_user(&self, id: i64) -> Result<bool> {
        let mut t = self.open("delete_user")?;
        let before = t.users.len();
        t.users.retain(|u| u.id != id);
        if t.users.len() == before {
            return Ok(false);
        }

        // ON DELETE CASCADE
        t.sessions.retain(|s| s.user_id != id);
        t.notifications.retain(|n| n.recipient_id != id);
        let own_posts: Vec<i64> = t
            .posts
            .iter()
            .filter(|p| p.user_id == id)
            .map(|p| p.id)
            .collect();
        t.posts.retain(|p| p.user_id != id);
        t.likes
            .retain(|l| l.user_id != id && !own_posts.contains(&l.post_id));
        t.comments
            .retain(|c| c.user_id != id && !own_posts.contains(&c.post_id));
        t.follows
            .retain(|f| f.follower_id != id && f.following_id != id);
        t.ratings.retain(|r| r.user_id != id);
        t.name_changes.retain(|c| c.user_id != id);

        // ON DELETE SET NULL
        for offer in t.offers.iter_mut().filter(|o| o.employer_id == Some(id)) {
            offer.employer_id = None;
        }
        for app in t.applications.iter_mut().filter(|a| a.user_id == Some(id)) {
            app.user_id = None;
        }
        for n in t.notifications.iter_mut().filter(|n| n.actor_id == Some(id)) {
            n.actor_id = None;
        }
        Ok(true)
    }
}

#[async_trait]
impl SessionRepository for MemoryStore {
    async fn insert_session(
        &self,
        token_hash: &str,
        user_id: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<Session> {
        let mut t = self.open("insert_session")?;
        let session = Session {
            token_hash: token_hash.to_string(),
            user_id,
            expires_at,
            created_at: Utc::now(),
        };
        t.sessions.push(session.clone());
        Ok(session)
    }

    async fn find_session(&self, token_hash: &str) -> Result<Option<Session>> {
        let t = self.open("find_session")?;
        Ok(t.sessions
            .iter()
            .find(|s| s.token_hash == token_hash)
            .cloned())
    }

    async fn delete_session(&self, token_hash: &str) -> Result<()> {
        let mut t = self.open("delete_session")?;
        t.sessions.retain(|s| s.token_hash != token_hash);
        Ok(())
    }

    async fn delete_sessions_for_user(&self, user_id: i64) -> Result<u64> {
        let mut t = self.open("delete_sessions_for_user")?;
        let before = t.sessions.len();
        t.sessions.retain(|s| s.user_id != user_id);
        Ok((before - t.sessions.len()) as u64)
    }

    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut t = self.open("purge_expired_sessions")?;
        let before = t.sessions.len();
        t.sessions.retain(|s| !s.is_expired(now));
        Ok((before - t.sessions.len()) as u64)
    }
}

#[async_trait]
impl OfferRepository for MemoryStore {
    async fn insert_offer(&self, offer: NewOffer) -> Result<Offer> {
        let mut t = self.open("insert_offer")?;
        let mut row = Offer {
            id: t.next_id(),
            hotel: offer.hotel,
            employer_id: offer.employer_id,
            location: None,
            title_ar: None,
            title_fr: None,
            title_en: None,
            type_ar: None,
            type_fr: None,
            type_en: None,
            duration_ar: None,
            duration_fr: None,
            duration_en: None,
            description_ar: None,
            description_fr: None,
            description_en: None,
            start_date: None,
            image: None,
            rating: 0,
            created_at: Utc::now(),
        };
        apply_fields(&mut row, offer.fields);
        t.offers.push(row.clone());
        Ok(row)
    }

    async fn find_offer(&self, id: i64) -> Result<Option<Offer>> {
        let t = self.open("find_offer")?;
        Ok(t.offers.iter().find(|o| o.id == id).cloned())
    }

    async fn list_offers(&self, query: &OfferQuery) -> Result<Vec<Offer>> {
        let t = self.open("list_offers")?;
        let mut offers: Vec<Offer> = t
            .offers
            .iter()
            .filter(|o| query.matches(o))
            .cloned()
            .collect();
        offers.sort_by_key(|o| o.id);
        if let Some(limit) = query.limit {
            offers.truncate(limit.max(0) as usize);
        }
        Ok(offers)
    }

    async fn update_offer(&self, id: i64, fields: OfferFields) -> Result<Offer> {
        let mut t = self.open("update_offer")?;
        let offer = t
            .offers
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| Error::NotFound("Resource not found".to_string()))?;
        apply_fields(offer, fields);
        Ok(offer.clone())
    }

    async fn delete_offer(&self, id: i64) -> Result<bool> {
        let mut t = self.open("delete_offer")?;
        let before = t.offers.len();
        t.offers.retain(|o| o.id != id);
        if t.offers.len() == before {
            return Ok(false);
        }
        for app in t
            .applications
            .iter_mut()
            .filter(|a| a.internship_id == Some(id))
        {
            app.internship_id = None;
        }
        Ok(true)
    }

    async fn offer_ids_by_employer(&self, employer_id: i64) -> Result<Vec<i64>> {
        let t = self.open("offer_ids_by_employer")?;
        Ok(t.offers
            .iter()
            .filter(|o| o.employer_id == Some(employer_id))
            .map(|o| o.id)
            .collect())
    }

    async fn offer_ids_by_hotel(&self, hotel: &str) -> Result<Vec<i64>> {
        let t = self.open("offer_ids_by_hotel")?;
        Ok(t.offers
            .iter()
            .filter(|o| o.hotel == hotel)
            .map(|o| o.id)
            .collect())
    }
}

#[async_trait]
impl ApplicationRepository for MemoryStore {
    async fn insert_application(&self, application: NewApplication) -> Result<Application> {
        let mut t = self.open("insert_application")?;
        if self.legacy_applications && application.resume_path.is_some() {
            return Err(Error::Upstream(
                "column \"resume_path\" of relation \"applications\" does not exist".to_string(),
            ));
        }
        if !t.offers.iter().any(|o| o.id == application.internship_id) {
            return Err(Error::Upstream(
                "insert violates foreign key constraint on internship_id".to_string(),
            ));
        }
        let now = Utc::now();
        let row = Application {
            id: t.next_id(),
            internship_id: Some(application.internship_id),
            user_id: application.user_id,
            applicant_name: application.applicant_name,
            email: application.email,
            phone: application.phone,
            school: application.school,
            resume_path: application.resume_path,
            status: ApplicationStatus::Pending,
            date_applied: now.date_naive(),
            extra: application.extra,
            created_at: now,
        };
        t.applications.push(row.clone());
        Ok(row)
    }

    async fn find_application(&self, id: i64) -> Result<Option<Application>> {
        let t = self.open("find_application")?;
        Ok(t.applications.iter().find(|a| a.id == id).cloned())
    }

    async fn list_applications(
        &self,
        scope: &ApplicationScope,
        internship_id: Option<i64>,
    ) -> Result<Vec<Application>> {
        let t = self.open("list_applications")?;
        let mut rows: Vec<Application> = t
            .applications
            .iter()
            .filter(|a| match scope {
                ApplicationScope::All => true,
                ApplicationScope::Offers(ids) => {
                    a.internship_id.map(|id| ids.contains(&id)).unwrap_or(false)
                }
                ApplicationScope::Applicant(user_id) => a.user_id == Some(*user_id),
            })
            .filter(|a| internship_id.is_none() || a.internship_id == internship_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.date_applied.cmp(&a.date_applied).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn set_application_status(
        &self,
        id: i64,
        status: ApplicationStatus,
    ) -> Result<Option<Application>> {
        let mut t = self.open("set_application_status")?;
        Ok(t.applications.iter_mut().find(|a| a.id == id).map(|a| {
            a.status = status;
            a.clone()
        }))
    }

    async fn delete_application(&self, id: i64) -> Result<bool> {
        let mut t = self.open("delete_application")?;
        let before = t.applications.len();
        t.applications.retain(|a| a.id != id);
        Ok(t.applications.len() < before)
    }
}

#[async_trait]
impl NotificationRepository for MemoryStore {
    async fn insert_notification(&self, notification: NewNotification) -> Result<Notification> {
        let mut t = self.open("insert_notification")?;
        if !t.users.iter().any(|u| u.id == notification.recipient_id) {
            return Err(Error::Upstream(
                "insert violates foreign key constraint on recipient_id".to_string(),
            ));
        }
        let row = Notification {
            id: t.next_id(),
            recipient_id: notification.recipient_id,
            actor_id: notification.actor_id,
            kind: notification.kind,
            title: notification.title,
            body: notification.body,
            data: notification.data,
            read_at: None,
            deleted_at: None,
            created_at: Utc::now(),
        };
        t.notifications.push(row.clone());
        Ok(row)
    }

    async fn list_notifications(
        &self,
        recipient_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>> {
        let t = self.open("list_notifications")?;
        let mut rows: Vec<Notification> = t
            .notifications
            .iter()
            .filter(|n| n.recipient_id == recipient_id && n.deleted_at.is_none())
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count_unread(&self, recipient_id: i64) -> Result<i64> {
        let t = self.open("count_unread")?;
        Ok(t.notifications
            .iter()
            .filter(|n| {
                n.recipient_id == recipient_id && n.read_at.is_none() && n.deleted_at.is_none()
            })
            .count() as i64)
    }

    async fn mark_read(&self, id: i64, recipient_id: i64) -> Result<bool> {
        let mut t = self.open("mark_read")?;
        let now = Utc::now();
        Ok(t.notifications
            .iter_mut()
            .find(|n| n.id == id && n.recipient_id == recipient_id && n.deleted_at.is_none())
            .map(|n| {
                n.read_at.get_or_insert(now);
            })
            .is_some())
    }

    async fn mark_all_read(&self, recipient_id: i64) -> Result<u64> {
        let mut t = self.open("mark_all_read")?;
        let now = Utc::now();
        let mut updated = 0;
        for n in t.notifications.iter_mut().filter(|n| {
            n.recipient_id == recipient_id && n.read_at.is_none() && n.deleted_at.is_none()
        }) {
            n.read_at = Some(now);
            updated += 1;
        }
        Ok(updated)
    }

    async fn soft_delete_notification(&self, id: i64, recipient_id: i64) -> Result<bool> {
        let mut t = self.open("soft_delete_notification")?;
        let now = Utc::now();
        Ok(t.notifications
            .iter_mut()
            .find(|n| n.id == id && n.recipient_id == recipient_id && n.deleted_at.is_none())
            .map(|n| n.deleted_at = Some(now))
            .is_some())
    }

    async fn delete_notifications_for_offer(&self, internship_id: i64) -> Result<u64> {
        let mut t = self.open("delete_notifications_for_offer")?;
        let before = t.notifications.len();
        t.notifications
            .retain(|n| !references_offer(n, internship_id));
        Ok((before - t.notifications.len()) as u64)
    }

    async fn delete_notifications_for_user(&self, user_id: i64) -> Result<u64> {
        let mut t = self.open("delete_notifications_for_user")?;
        let before = t.notifications.len();
        t.notifications
            .retain(|n| n.recipient_id != user_id && n.actor_id != Some(user_id));
        Ok((before - t.notifications.len()) as u64)
    }
}

#[async_trait]
impl SocialRepository for MemoryStore {
    async fn insert_post(
        &self,
        user_id: i64,
        content: &str,
        image_path: Option<&str>,
    ) -> Result<Post> {
        let mut t = self.open("insert_post")?;
        let row = Post {
            id: t.next_id(),
            user_id,
            content: content.to_string(),
            image_path: image_path.map(str::to_string),
            created_at: Utc::now(),
            updated_at: None,
        };
        t.posts.push(row.clone());
        Ok(row)
    }

    async fn find_post(&self, id: i64) -> Result<Option<Post>> {
        let t = self.open("find_post")?;
        Ok(t.posts.iter().find(|p| p.id == id).cloned())
    }

    async fn list_posts(&self, limit: i64) -> Result<Vec<PostSummary>> {
        let t = self.open("list_posts")?;
        let mut posts: Vec<&Post> = t.posts.iter().collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(posts
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|p| t.summary(p))
            .collect())
    }

    async fn posts_by_user(&self, user_id: i64) -> Result<Vec<Post>> {
        let t = self.open("posts_by_user")?;
        Ok(t.posts
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn update_post_content(&self, id: i64, content: &str) -> Result<Option<Post>> {
        let mut t = self.open("update_post_content")?;
        Ok(t.posts.iter_mut().find(|p| p.id == id).map(|post| {
            post.content = content.to_string();
            post.updated_at = Some(Utc::now());
            post.clone()
        }))
    }

    async fn delete_post(&self, id: i64) -> Result<bool> {
        let mut t = self.open("delete_post")?;
        let before = t.posts.len();
        t.posts.retain(|p| p.id != id);
        if t.posts.len() == before {
            return Ok(false);
        }
        t.likes.retain(|l| l.post_id != id);
        t.comments.retain(|c| c.post_id != id);
        Ok(true)
    }

    async fn delete_posts_by_user(&self, user_id: i64) -> Result<u64> {
        let mut t = self.open("delete_posts_by_user")?;
        let ids: Vec<i64> = t
            .posts
            .iter()
            .filter(|p| p.user_id == user_id)
            .map(|p| p.id)
            .collect();
        t.posts.retain(|p| p.user_id != user_id);
        t.likes.retain(|l| !ids.contains(&l.post_id));
        t.comments.retain(|c| !ids.contains(&c.post_id));
        Ok(ids.len() as u64)
    }

    async fn toggle_like(&self, post_id: i64, user_id: i64) -> Result<LikeToggle> {
        let mut t = self.open("toggle_like")?;
        if !t.posts.iter().any(|p| p.id == post_id) {
            return Err(Error::NotFound("Post not found".to_string()));
        }
        let before = t.likes.len();
        t.likes
            .retain(|l| !(l.post_id == post_id && l.user_id == user_id));
        let action = if t.likes.len() < before {
            LikeAction::Unliked
        } else {
            t.likes.push(LikeRow { post_id, user_id });
            LikeAction::Liked
        };
        let count = t.likes.iter().filter(|l| l.post_id == post_id).count() as i64;
        Ok(LikeToggle { action, count })
    }

    async fn delete_likes_by_user(&self, user_id: i64) -> Result<u64> {
        let mut t = self.open("delete_likes_by_user")?;
        let before = t.likes.len();
        t.likes.retain(|l| l.user_id != user_id);
        Ok((before - t.likes.len()) as u64)
    }

    async fn insert_comment(&self, post_id: i64, user_id: i64, content: &str) -> Result<Comment> {
        let mut t = self.open("insert_comment")?;
        let row = CommentRow {
            id: t.next_id(),
            post_id,
            user_id,
            content: content.to_string(),
            created_at: Utc::now(),
            updated_at: None,
        };
        t.comments.push(row.clone());
        Ok(t.comment(&row))
    }

    async fn find_comment(&self, id: i64) -> Result<Option<Comment>> {
        let t = self.open("find_comment")?;
        Ok(t.comments.iter().find(|c| c.id == id).map(|c| t.comment(c)))
    }

    async fn comments_for_post(&self, post_id: i64) -> Result<Vec<Comment>> {
        let t = self.open("comments_for_post")?;
        Ok(t.comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .map(|c| t.comment(c))
            .collect())
    }

    async fn update_comment(&self, id: i64, content: &str) -> Result<Option<Comment>> {
        let mut t = self.open("update_comment")?;
        let Some(row) = t.comments.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        row.content = content.to_string();
        row.updated_at = Some(Utc::now());
        let row = row.clone();
        Ok(Some(t.comment(&row)))
    }

    async fn delete_comment(&self, id: i64) -> Result<bool> {
        let mut t = self.open("delete_comment")?;
        let before = t.comments.len();
        t.comments.retain(|c| c.id != id);
        Ok(t.comments.len() < before)
    }

    async fn delete_comments_by_user(&self, user_id: i64) -> Result<u64> {
        let mut t = self.open("delete_comments_by_user")?;
        let before = t.comments.len();
        t.comments.retain(|c| c.user_id != user_id);
        Ok((before - t.comments.len()) as u64)
    }

    async fn follow(&self, follower_id: i64, following_id: i64) -> Result<()> {
        let mut t = self.open("follow")?;
        let exists = t
            .follows
            .iter()
            .any(|f| f.follower_id == follower_id && f.following_id == following_id);
        if !exists {
            t.follows.push(FollowRow {
                follower_id,
                following_id,
            });
        }
        Ok(())
    }

    async fn unfollow(&self, follower_id: i64, following_id: i64) -> Result<()> {
        let mut t = self.open("unfollow")?;
        t.follows
            .retain(|f| !(f.follower_id == follower_id && f.following_id == following_id));
        Ok(())
    }

    async fn follow_info(&self, user_id: i64, viewer: Option<i64>) -> Result<FollowInfo> {
        let t = self.open("follow_info")?;
        Ok(FollowInfo {
            followers: t.follows.iter().filter(|f| f.following_id == user_id).count() as i64,
            following: t.follows.iter().filter(|f| f.follower_id == user_id).count() as i64,
            i_follow: viewer
                .map(|v| {
                    t.follows
                        .iter()
                        .any(|f| f.follower_id == v && f.following_id == user_id)
                })
                .unwrap_or(false),
        })
    }

    async fn delete_follows_for_user(&self, user_id: i64) -> Result<u64> {
        let mut t = self.open("delete_follows_for_user")?;
        let before = t.follows.len();
        t.follows
            .retain(|f| f.follower_id != user_id && f.following_id != user_id);
        Ok((before - t.follows.len()) as u64)
    }

    async fn upsert_rating(&self, hotel: &str, user_id: i64, rating: i32) -> Result<()> {
        let mut t = self.open("upsert_rating")?;
        match t
            .ratings
            .iter_mut()
            .find(|r| r.hotel == hotel && r.user_id == user_id)
        {
            Some(existing) => existing.rating = rating,
            None => t.ratings.push(RatingRow {
                hotel: hotel.to_string(),
                user_id,
                rating,
            }),
        }
        Ok(())
    }

    async fn rating_summary(&self, hotel: &str, viewer: Option<i64>) -> Result<RatingSummary> {
        let t = self.open("rating_summary")?;
        let rows: Vec<&RatingRow> = t.ratings.iter().filter(|r| r.hotel == hotel).collect();
        let count = rows.len() as i64;
        let avg = if count == 0 {
            0.0
        } else {
            rows.iter().map(|r| r.rating as f64).sum::<f64>() / count as f64
        };
        let my_rating = viewer.and_then(|v| rows.iter().find(|r| r.user_id == v).map(|r| r.rating));
        Ok(RatingSummary {
            avg,
            count,
            my_rating,
        })
    }

    async fn delete_ratings_for_hotel(&self, hotel: &str) -> Result<u64> {
        let mut t = self.open("delete_ratings_for_hotel")?;
        let before = t.ratings.len();
        t.ratings.retain(|r| r.hotel != hotel);
        Ok((before - t.ratings.len()) as u64)
    }
}

#[async_trait]
impl SearchRepository for MemoryStore {
    async fn search_posts(
        &self,
        term: &SearchTerm,
        viewer: Option<i64>,
        limit: i64,
    ) -> Result<Vec<PostHit>> {
        let t = self.open("search_posts")?;
        let mut posts: Vec<&Post> = t.posts.iter().filter(|p| term.matches(&p.content)).collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(posts
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|p| PostHit {
                post: t.summary(p),
                liked_by_me: viewer
                    .is_some_and(|v| t.likes.iter().any(|l| l.post_id == p.id && l.user_id == v)),
            })
            .collect())
    }

    async fn search_hotels(&self, term: &SearchTerm, limit: i64) -> Result<Vec<String>> {
        let t = self.open("search_hotels")?;
        let mut hotels: Vec<String> = t
            .offers
            .iter()
            .filter(|o| term.matches(&o.hotel))
            .map(|o| o.hotel.clone())
            .collect();
        hotels.sort();
        hotels.dedup();
        hotels.truncate(limit.max(0) as usize);
        Ok(hotels)
    }

    async fn search_users(&self, term: &SearchTerm, limit: i64) -> Result<Vec<UserHit>> {
        let t = self.open("search_users")?;
        let mut users: Vec<&User> = t
            .users
            .iter()
            .filter(|u| term.matches(&u.name) || term.matches(&u.email))
            .collect();
        users.sort_by_key(|u| u.id);
        Ok(users
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|u| UserHit {
                id: u.id,
                name: u.name.clone(),
                email: Some(u.email.clone()),
                bio: u.bio.clone(),
                profile_pic: u.profile_pic.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn employer(name: &str, email: &str) -> NewUser {
        NewUser {
            name: name.to_string(),
            email: email.to_string(),
            password_hash: "x".to_string(),
            role: Role::Employer,
            is_admin: false,
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let store = MemoryStore::new();
        store.insert_user(employer("Hyatt", "h@x.com")).await.unwrap();
        let err = store
            .insert_user(employer("Other", "h@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn deleting_a_user_nulls_offer_employer() {
        let store = MemoryStore::new();
        let user = store.insert_user(employer("Hyatt", "h@x.com")).await.unwrap();
        let offer = store
            .insert_offer(NewOffer {
                hotel: "Hyatt".into(),
                employer_id: Some(user.id),
                fields: OfferFields::default(),
            })
            .await
            .unwrap();

        assert!(store.delete_user(user.id).await.unwrap());
        let offer = store.find_offer(offer.id).await.unwrap().unwrap();
        assert_eq!(offer.employer_id, None);
    }

    #[tokio::test]
    async fn injected_failures_hit_only_the_named_operation() {
        let store = MemoryStore::new();
        store.fail_on("find_user");
        assert!(store.find_user(1).await.is_err());
        assert!(store.find_user_by_email("a@x.com").await.is_ok());
        store.clear_failures();
        assert!(store.find_user(1).await.is_ok());
    }
}
