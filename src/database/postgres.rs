use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{
    ApplicationRepository, NotificationRepository, OfferRepository, SearchRepository,
    SessionRepository, SocialRepository, UserRepository,
};
use crate::error::Result;
use crate::models::{
    application::{Application, ApplicationScope, ApplicationStatus, NewApplication},
    follow::FollowInfo,
    notification::{NewNotification, Notification},
    offer::{NewOffer, Offer, OfferFields, OfferQuery},
    post::{Comment, LikeAction, LikeToggle, Post, PostSummary},
    rating::RatingSummary,
    search::{PostHit, SearchTerm, UserHit},
    session::Session,
    user::{AccountChanges, NewUser, ProfileChanges, User},
};

const USER_COLUMNS: &str =
    "id, name, email, password_hash, role, is_admin, bio, profile_pic, created_at, updated_at";

const OFFER_COLUMNS: &str = "id, hotel, employer_id, location, title_ar, title_fr, title_en, \
     type_ar, type_fr, type_en, duration_ar, duration_fr, duration_en, \
     description_ar, description_fr, description_en, start_date, image, rating, created_at";

const APPLICATION_COLUMNS: &str = "id, internship_id, user_id, applicant_name, email, phone, \
     school, resume_path, status, date_applied, extra, created_at";

const NOTIFICATION_COLUMNS: &str =
    "id, recipient_id, actor_id, type, title, body, data, read_at, deleted_at, created_at";

const POST_COLUMNS: &str = "id, user_id, content, image_path, created_at, updated_at";

const COMMENT_SELECT: &str = "SELECT c.id, c.post_id, c.user_id, u.name AS author_name, \
     c.content, c.created_at, c.updated_at
     FROM post_comments c JOIN users u ON u.id = c.user_id";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn insert_user(&self, user: NewUser) -> Result<User> {
        let sql = format!(
            "INSERT INTO users (name, email, password_hash, role, is_admin)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {}",
            USER_COLUMNS
        );
        let row = sqlx::query_as::<_, User>(&sql)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .bind(user.is_admin)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let row = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_employer_by_name(&self, name: &str) -> Result<Option<User>> {
        let sql = format!(
            "SELECT {} FROM users WHERE name = $1 AND role = 'employer' ORDER BY id LIMIT 1",
            USER_COLUMNS
        );
        let row = sqlx::query_as::<_, User>(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_users_except(&self, id: i64) -> Result<Vec<User>> {
        let sql = format!(
            "SELECT {} FROM users WHERE id <> $1 ORDER BY id DESC",
            USER_COLUMNS
        );
        let rows = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn update_profile(&self, id: i64, changes: ProfileChanges) -> Result<User> {
        let sql = format!(
            "UPDATE users
             SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                bio = COALESCE($4, bio),
                profile_pic = COALESCE($5, profile_pic),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {}",
            USER_COLUMNS
        );
        let row = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(changes.name)
            .bind(changes.email)
            .bind(changes.bio)
            .bind(changes.profile_pic)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn update_account(&self, id: i64, changes: AccountChanges) -> Result<Option<User>> {
        let sql = format!(
            "UPDATE users
             SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                role = COALESCE($4, role),
                is_admin = COALESCE($5, is_admin),
                password_hash = COALESCE($6, password_hash),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {}",
            USER_COLUMNS
        );
        let row = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(changes.name)
            .bind(changes.email)
            .bind(changes.role.map(|r| r.as_str()))
            .bind(changes.is_admin)
            .bind(changes.password_hash)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn record_name_change(
        &self,
        user_id: i64,
        old_name: &str,
        new_name: &str,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO user_name_changes (user_id, old_name, new_name) VALUES ($1, $2, $3)",
        )
        .bind(user_id)
        .bind(old_name)
        .bind(new_name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn count_name_changes_since(&self, user_id: i64, since: DateTime<Utc>) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM user_name_changes WHERE user_id = $1 AND created_at >= $2",
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn delete_name_changes(&self, user_id: i64) -> Result<u64> {
        let res = sqlx::query("DELETE FROM user_name_changes WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }

    async fn delete_user(&self, id: i64) -> Result<bool> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

#[async_trait]
impl SessionRepository for PgStore {
    async fn insert_session(
        &self,
        token_hash: &str,
        user_id: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<Session> {
        let row = sqlx::query_as::<_, Session>(
            "INSERT INTO sessions (token_hash, user_id, expires_at)
             VALUES ($1, $2, $3)
             RETURNING token_hash, user_id, expires_at, created_at",
        )
        .bind(token_hash)
        .bind(user_id)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_session(&self, token_hash: &str) -> Result<Option<Session>> {
        let row = sqlx::query_as::<_, Session>(
            "SELECT token_hash, user_id, expires_at, created_at FROM sessions WHERE token_hash = $1",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_session(&self, token_hash: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_sessions_for_user(&self, user_id: i64) -> Result<u64> {
        let res = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }

    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64> {
        let res = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }
}

#[async_trait]
impl OfferRepository for PgStore {
    async fn insert_offer(&self, offer: NewOffer) -> Result<Offer> {
        let f = offer.fields;
        let sql = format!(
            "INSERT INTO internships (
                hotel, employer_id, location,
                title_ar, title_fr, title_en,
                type_ar, type_fr, type_en,
                duration_ar, duration_fr, duration_en,
                description_ar, description_fr, description_en,
                start_date, image, rating
            ) VALUES (
                $1,$2,$3,
                $4,$5,$6,
                $7,$8,$9,
                $10,$11,$12,
                $13,$14,$15,
                $16,$17,COALESCE($18, 0)
            )
            RETURNING {}",
            OFFER_COLUMNS
        );
        let row = sqlx::query_as::<_, Offer>(&sql)
            .bind(offer.hotel)
            .bind(offer.employer_id)
            .bind(f.location)
            .bind(f.title.ar)
            .bind(f.title.fr)
            .bind(f.title.en)
            .bind(f.kind.ar)
            .bind(f.kind.fr)
            .bind(f.kind.en)
            .bind(f.duration.ar)
            .bind(f.duration.fr)
            .bind(f.duration.en)
            .bind(f.description.ar)
            .bind(f.description.fr)
            .bind(f.description.en)
            .bind(f.start_date)
            .bind(f.image)
            .bind(f.rating)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_offer(&self, id: i64) -> Result<Option<Offer>> {
        let sql = format!("SELECT {} FROM internships WHERE id = $1", OFFER_COLUMNS);
        let row = sqlx::query_as::<_, Offer>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_offers(&self, query: &OfferQuery) -> Result<Vec<Offer>> {
        let sql = format!(
            "SELECT {} FROM internships
             WHERE ($1::TEXT IS NULL OR LOWER(hotel) = LOWER($1))
               AND ($2::TEXT IS NULL OR location ILIKE $2)
               AND ($3::TEXT IS NULL
                    OR hotel ILIKE $3 OR location ILIKE $3
                    OR title_ar ILIKE $3 OR title_fr ILIKE $3 OR title_en ILIKE $3
                    OR type_ar ILIKE $3 OR type_fr ILIKE $3 OR type_en ILIKE $3)
             ORDER BY id ASC
             LIMIT $4",
            OFFER_COLUMNS
        );
        let rows = sqlx::query_as::<_, Offer>(&sql)
            .bind(query.hotel.as_deref())
            .bind(query.location.as_ref().map(SearchTerm::like_pattern))
            .bind(query.search.as_ref().map(SearchTerm::like_pattern))
            .bind(query.limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn update_offer(&self, id: i64, fields: OfferFields) -> Result<Offer> {
        let f = fields;
        let sql = format!(
            "UPDATE internships
             SET
                hotel = COALESCE($2, hotel),
                location = COALESCE($3, location),
                title_ar = COALESCE($4, title_ar),
                title_fr = COALESCE($5, title_fr),
                title_en = COALESCE($6, title_en),
                type_ar = COALESCE($7, type_ar),
                type_fr = COALESCE($8, type_fr),
                type_en = COALESCE($9, type_en),
                duration_ar = COALESCE($10, duration_ar),
                duration_fr = COALESCE($11, duration_fr),
                duration_en = COALESCE($12, duration_en),
                description_ar = COALESCE($13, description_ar),
                description_fr = COALESCE($14, description_fr),
                description_en = COALESCE($15, description_en),
                start_date = COALESCE($16, start_date),
                image = COALESCE($17, image),
                rating = COALESCE($18, rating)
             WHERE id = $1
             RETURNING {}",
            OFFER_COLUMNS
        );
        let row = sqlx::query_as::<_, Offer>(&sql)
            .bind(id)
            .bind(f.hotel)
            .bind(f.location)
            .bind(f.title.ar)
            .bind(f.title.fr)
            .bind(f.title.en)
            .bind(f.kind.ar)
            .bind(f.kind.fr)
            .bind(f.kind.en)
            .bind(f.duration.ar)
            .bind(f.duration.fr)
            .bind(f.duration.en)
            .bind(f.description.ar)
            .bind(f.description.fr)
            .bind(f.description.en)
            .bind(f.start_date)
            .bind(f.image)
            .bind(f.rating)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn delete_offer(&self, id: i64) -> Result<bool> {
        let res = sqlx::query("DELETE FROM internships WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn offer_ids_by_employer(&self, employer_id: i64) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM internships WHERE employer_id = $1 ORDER BY id",
        )
        .bind(employer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn offer_ids_by_hotel(&self, hotel: &str) -> Result<Vec<i64>> {
        let ids =
            sqlx::query_scalar::<_, i64>("SELECT id FROM internships WHERE hotel = $1 ORDER BY id")
                .bind(hotel)
                .fetch_all(&self.pool)
                .await?;
        Ok(ids)
    }
}

#[async_trait]
impl ApplicationRepository for PgStore {
    async fn insert_application(&self, application: NewApplication) -> Result<Application> {
        let sql = format!(
            "INSERT INTO applications (
                internship_id, user_id, applicant_name, email, phone, school,
                resume_path, status, extra
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending', $8)
            RETURNING {}",
            APPLICATION_COLUMNS
        );
        let row = sqlx::query_as::<_, Application>(&sql)
            .bind(application.internship_id)
            .bind(application.user_id)
            .bind(application.applicant_name)
            .bind(application.email)
            .bind(application.phone)
            .bind(application.school)
            .bind(application.resume_path)
            .bind(application.extra)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_application(&self, id: i64) -> Result<Option<Application>> {
        let sql = format!(
            "SELECT {} FROM applications WHERE id = $1",
            APPLICATION_COLUMNS
        );
        let row = sqlx::query_as::<_, Application>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_applications(
        &self,
        scope: &ApplicationScope,
        internship_id: Option<i64>,
    ) -> Result<Vec<Application>> {
        let (offer_ids, applicant): (Option<Vec<i64>>, Option<i64>) = match scope {
            ApplicationScope::All => (None, None),
            ApplicationScope::Offers(ids) => (Some(ids.clone()), None),
            ApplicationScope::Applicant(user_id) => (None, Some(*user_id)),
        };
        let sql = format!(
            "SELECT {} FROM applications
             WHERE ($1::BIGINT[] IS NULL OR internship_id = ANY($1))
               AND ($2::BIGINT IS NULL OR user_id = $2)
               AND ($3::BIGINT IS NULL OR internship_id = $3)
             ORDER BY date_applied DESC, id DESC",
            APPLICATION_COLUMNS
        );
        let rows = sqlx::query_as::<_, Application>(&sql)
            .bind(offer_ids)
            .bind(applicant)
            .bind(internship_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn set_application_status(
        &self,
        id: i64,
        status: ApplicationStatus,
    ) -> Result<Option<Application>> {
        let sql = format!(
            "UPDATE applications SET status = $2 WHERE id = $1 RETURNING {}",
            APPLICATION_COLUMNS
        );
        let row = sqlx::query_as::<_, Application>(&sql)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn delete_application(&self, id: i64) -> Result<bool> {
        let res = sqlx::query("DELETE FROM applications WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

#[async_trait]
impl NotificationRepository for PgStore {
    async fn insert_notification(&self, notification: NewNotification) -> Result<Notification> {
        let sql = format!(
            "INSERT INTO notifications (recipient_id, actor_id, type, title, body, data)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {}",
            NOTIFICATION_COLUMNS
        );
        let row = sqlx::query_as::<_, Notification>(&sql)
            .bind(notification.recipient_id)
            .bind(notification.actor_id)
            .bind(notification.kind)
            .bind(notification.title)
            .bind(notification.body)
            .bind(notification.data)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_notifications(
        &self,
        recipient_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>> {
        let sql = format!(
            "SELECT {} FROM notifications
             WHERE recipient_id = $1 AND deleted_at IS NULL
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3",
            NOTIFICATION_COLUMNS
        );
        let rows = sqlx::query_as::<_, Notification>(&sql)
            .bind(recipient_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn count_unread(&self, recipient_id: i64) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications
             WHERE recipient_id = $1 AND read_at IS NULL AND deleted_at IS NULL",
        )
        .bind(recipient_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn mark_read(&self, id: i64, recipient_id: i64) -> Result<bool> {
        let res = sqlx::query(
            "UPDATE notifications SET read_at = COALESCE(read_at, NOW())
             WHERE id = $1 AND recipient_id = $2 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(recipient_id)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn mark_all_read(&self, recipient_id: i64) -> Result<u64> {
        let res = sqlx::query(
            "UPDATE notifications SET read_at = NOW()
             WHERE recipient_id = $1 AND read_at IS NULL AND deleted_at IS NULL",
        )
        .bind(recipient_id)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected())
    }

    async fn soft_delete_notification(&self, id: i64, recipient_id: i64) -> Result<bool> {
        let res = sqlx::query(
            "UPDATE notifications SET deleted_at = NOW()
             WHERE id = $1 AND recipient_id = $2 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(recipient_id)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete_notifications_for_offer(&self, internship_id: i64) -> Result<u64> {
        let res = sqlx::query(
            "DELETE FROM notifications
             WHERE data @> jsonb_build_object('internship_id', $1::BIGINT)",
        )
        .bind(internship_id)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected())
    }

    async fn delete_notifications_for_user(&self, user_id: i64) -> Result<u64> {
        let res = sqlx::query("DELETE FROM notifications WHERE recipient_id = $1 OR actor_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }
}

#[async_trait]
impl SocialRepository for PgStore {
    async fn insert_post(
        &self,
        user_id: i64,
        content: &str,
        image_path: Option<&str>,
    ) -> Result<Post> {
        let sql = format!(
            "INSERT INTO posts (user_id, content, image_path) VALUES ($1, $2, $3)
             RETURNING {}",
            POST_COLUMNS
        );
        let row = sqlx::query_as::<_, Post>(&sql)
        .bind(user_id)
        .bind(content)
        .bind(image_path)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_post(&self, id: i64) -> Result<Option<Post>> {
        let sql = format!("SELECT {} FROM posts WHERE id = $1", POST_COLUMNS);
        let row = sqlx::query_as::<_, Post>(&sql)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_posts(&self, limit: i64) -> Result<Vec<PostSummary>> {
        let rows = sqlx::query_as::<_, PostSummary>(
            "SELECT p.id, p.user_id, u.name AS author_name, p.content, p.image_path,
                    (SELECT COUNT(*) FROM post_likes l WHERE l.post_id = p.id) AS like_count,
                    (SELECT COUNT(*) FROM post_comments c WHERE c.post_id = p.id) AS comment_count,
                    p.created_at
             FROM posts p
             JOIN users u ON u.id = p.user_id
             ORDER BY p.created_at DESC, p.id DESC
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn posts_by_user(&self, user_id: i64) -> Result<Vec<Post>> {
        let sql = format!("SELECT {} FROM posts WHERE user_id = $1", POST_COLUMNS);
        let rows = sqlx::query_as::<_, Post>(&sql)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn update_post_content(&self, id: i64, content: &str) -> Result<Option<Post>> {
        let sql = format!(
            "UPDATE posts SET content = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            POST_COLUMNS
        );
        let row = sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .bind(content)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn delete_post(&self, id: i64) -> Result<bool> {
        let res = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete_posts_by_user(&self, user_id: i64) -> Result<u64> {
        let res = sqlx::query("DELETE FROM posts WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }

    async fn toggle_like(&self, post_id: i64, user_id: i64) -> Result<LikeToggle> {
        let removed = sqlx::query("DELETE FROM post_likes WHERE post_id = $1 AND user_id = $2")
            .bind(post_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        let action = if removed > 0 {
            LikeAction::Unliked
        } else {
            sqlx::query(
                "INSERT INTO post_likes (post_id, user_id) VALUES ($1, $2)
                 ON CONFLICT (post_id, user_id) DO NOTHING",
            )
            .bind(post_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
            LikeAction::Liked
        };
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM post_likes WHERE post_id = $1")
                .bind(post_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(LikeToggle { action, count })
    }

    async fn delete_likes_by_user(&self, user_id: i64) -> Result<u64> {
        let res = sqlx::query("DELETE FROM post_likes WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }

    async fn insert_comment(&self, post_id: i64, user_id: i64, content: &str) -> Result<Comment> {
        let row = sqlx::query_as::<_, Comment>(
            "WITH inserted AS (
                INSERT INTO post_comments (post_id, user_id, content) VALUES ($1, $2, $3)
                RETURNING id, post_id, user_id, content, created_at, updated_at
             )
             SELECT i.id, i.post_id, i.user_id, u.name AS author_name, i.content,
                    i.created_at, i.updated_at
             FROM inserted i JOIN users u ON u.id = i.user_id",
        )
        .bind(post_id)
        .bind(user_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_comment(&self, id: i64) -> Result<Option<Comment>> {
        let sql = format!("{} WHERE c.id = $1", COMMENT_SELECT);
        let row = sqlx::query_as::<_, Comment>(&sql)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn comments_for_post(&self, post_id: i64) -> Result<Vec<Comment>> {
        let sql = format!(
            "{} WHERE c.post_id = $1 ORDER BY c.created_at ASC, c.id ASC",
            COMMENT_SELECT
        );
        let rows = sqlx::query_as::<_, Comment>(&sql)
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn update_comment(&self, id: i64, content: &str) -> Result<Option<Comment>> {
        let updated = sqlx::query(
            "UPDATE post_comments SET content = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(content)
        .execute(&self.pool)
        .await?
        .rows_affected();
        if updated == 0 {
            return Ok(None);
        }
        self.find_comment(id).await
    }

    async fn delete_comment(&self, id: i64) -> Result<bool> {
        let res = sqlx::query("DELETE FROM post_comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete_comments_by_user(&self, user_id: i64) -> Result<u64> {
        let res = sqlx::query("DELETE FROM post_comments WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }

    async fn follow(&self, follower_id: i64, following_id: i64) -> Result<()> {
        sqlx::query(
            "INSERT INTO follows (follower_id, following_id) VALUES ($1, $2)
             ON CONFLICT (follower_id, following_id) DO NOTHING",
        )
        .bind(follower_id)
        .bind(following_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn unfollow(&self, follower_id: i64, following_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND following_id = $2")
            .bind(follower_id)
            .bind(following_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn follow_info(&self, user_id: i64, viewer: Option<i64>) -> Result<FollowInfo> {
        let (followers, following, i_follow) = sqlx::query_as::<_, (i64, i64, bool)>(
            "SELECT
                (SELECT COUNT(*) FROM follows WHERE following_id = $1),
                (SELECT COUNT(*) FROM follows WHERE follower_id = $1),
                EXISTS(SELECT 1 FROM follows WHERE follower_id = $2 AND following_id = $1)",
        )
        .bind(user_id)
        .bind(viewer)
        .fetch_one(&self.pool)
        .await?;
        Ok(FollowInfo {
            followers,
            following,
            i_follow,
        })
    }

    async fn delete_follows_for_user(&self, user_id: i64) -> Result<u64> {
        let res = sqlx::query("DELETE FROM follows WHERE follower_id = $1 OR following_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }

    async fn upsert_rating(&self, hotel: &str, user_id: i64, rating: i32) -> Result<()> {
        sqlx::query(
            "INSERT INTO hotel_ratings (hotel_name, user_id, rating) VALUES ($1, $2, $3)
             ON CONFLICT (hotel_name, user_id)
             DO UPDATE SET rating = EXCLUDED.rating, updated_at = NOW()",
        )
        .bind(hotel)
        .bind(user_id)
        .bind(rating)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn rating_summary(&self, hotel: &str, viewer: Option<i64>) -> Result<RatingSummary> {
        let (avg, count, my_rating) = sqlx::query_as::<_, (f64, i64, Option<i32>)>(
            "SELECT
                COALESCE(AVG(rating)::FLOAT8, 0),
                COUNT(*),
                (SELECT rating FROM hotel_ratings WHERE hotel_name = $1 AND user_id = $2)
             FROM hotel_ratings
             WHERE hotel_name = $1",
        )
        .bind(hotel)
        .bind(viewer)
        .fetch_one(&self.pool)
        .await?;
        Ok(RatingSummary {
            avg,
            count,
            my_rating,
        })
    }

    async fn delete_ratings_for_hotel(&self, hotel: &str) -> Result<u64> {
        let res = sqlx::query("DELETE FROM hotel_ratings WHERE hotel_name = $1")
            .bind(hotel)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }
}

#[async_trait]
impl SearchRepository for PgStore {
    async fn search_posts(
        &self,
        term: &SearchTerm,
        viewer: Option<i64>,
        limit: i64,
    ) -> Result<Vec<PostHit>> {
        let rows = sqlx::query_as::<_, PostHit>(
            "SELECT p.id, p.user_id, u.name AS author_name, p.content, p.image_path,
                    (SELECT COUNT(*) FROM post_likes l WHERE l.post_id = p.id) AS like_count,
                    (SELECT COUNT(*) FROM post_comments c WHERE c.post_id = p.id) AS comment_count,
                    p.created_at,
                    EXISTS(
                        SELECT 1 FROM post_likes l WHERE l.post_id = p.id AND l.user_id = $2
                    ) AS liked_by_me
             FROM posts p
             JOIN users u ON u.id = p.user_id
             WHERE p.content ILIKE $1
             ORDER BY p.created_at DESC, p.id DESC
             LIMIT $3",
        )
        .bind(term.like_pattern())
        .bind(viewer)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn search_hotels(&self, term: &SearchTerm, limit: i64) -> Result<Vec<String>> {
        let rows = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT hotel FROM internships WHERE hotel ILIKE $1 ORDER BY hotel LIMIT $2",
        )
        .bind(term.like_pattern())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn search_users(&self, term: &SearchTerm, limit: i64) -> Result<Vec<UserHit>> {
        let rows = sqlx::query_as::<_, UserHit>(
            "SELECT id, name, email, bio, profile_pic FROM users
             WHERE name ILIKE $1 OR email ILIKE $1
             ORDER BY id
             LIMIT $2",
        )
        .bind(term.like_pattern())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
