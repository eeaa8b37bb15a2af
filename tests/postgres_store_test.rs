//! Runs against a real Postgres when `DATABASE_URL` is set; otherwise each
//! test returns early.

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use stageconnect_backend::{
    database::{
        pool::create_pool, ApplicationRepository, NotificationRepository, OfferRepository,
        PgStore, SearchRepository, SessionRepository, SocialRepository, UserRepository,
    },
    error::Error,
    models::{
        application::{ApplicationScope, NewApplication},
        notification::NewNotification,
        offer::{Localized, NewOffer, Offer, OfferFields, OfferQuery},
        search::SearchTerm,
        user::{AccountChanges, NewUser, Role, User},
    },
    utils::time,
};

async fn pg() -> Option<PgStore> {
    dotenvy::dotenv().ok();
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping Postgres store test");
        return None;
    };
    let pool = create_pool(&url).await.expect("connect");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrate");
    Some(PgStore::new(pool))
}

fn unique(label: &str) -> String {
    format!("{}-{}", label, Uuid::new_v4().simple())
}

async fn user(store: &PgStore, name: &str, role: Role) -> User {
    store
        .insert_user(NewUser {
            name: name.into(),
            email: format!("{}@pg.test", unique("user")),
            password_hash: "x".into(),
            role,
            is_admin: false,
        })
        .await
        .expect("insert user")
}

async fn offer(store: &PgStore, hotel: &str, employer_id: Option<i64>, title_en: &str) -> Offer {
    store
        .insert_offer(NewOffer {
            hotel: hotel.into(),
            employer_id,
            fields: OfferFields {
                location: Some("Agadir".into()),
                title: Localized {
                    fr: Some("Stage".into()),
                    en: Some(title_en.into()),
                    ..Localized::default()
                },
                ..OfferFields::default()
            },
        })
        .await
        .expect("insert offer")
}

fn application(internship_id: i64, user_id: Option<i64>) -> NewApplication {
    NewApplication {
        internship_id,
        user_id,
        applicant_name: "Karim".into(),
        email: "karim@pg.test".into(),
        phone: None,
        school: None,
        resume_path: None,
        extra: None,
    }
}

fn note(recipient_id: i64, actor_id: Option<i64>, data: serde_json::Value) -> NewNotification {
    NewNotification {
        recipient_id,
        actor_id,
        kind: "new_application".into(),
        title: None,
        body: None,
        data: Some(data),
    }
}

#[tokio::test]
async fn offer_cleanup_matches_notification_json_by_containment() {
    let Some(store) = pg().await else { return };
    let owner = user(&store, "Owner", Role::Employer).await;
    let hotel = unique("hotel");
    let gone = offer(&store, &hotel, Some(owner.id), "Front desk").await;
    let kept = offer(&store, &hotel, Some(owner.id), "Kitchen").await;

    for data in [
        json!({ "internship_id": gone.id, "application_id": 1 }),
        json!({ "internship_id": kept.id }),
        json!({ "internship_id": gone.id.to_string() }),
        json!({ "application_id": gone.id }),
    ] {
        store
            .insert_notification(note(owner.id, None, data))
            .await
            .unwrap();
    }

    assert_eq!(store.delete_notifications_for_offer(gone.id).await.unwrap(), 1);
    let left = store.list_notifications(owner.id, 10, 0).await.unwrap();
    assert_eq!(left.len(), 3);
    assert!(left
        .iter()
        .all(|n| n.data.as_ref().and_then(|d| d.get("internship_id")) != Some(&json!(gone.id))));
}

#[tokio::test]
async fn scoped_listing_filters_by_the_offer_id_array() {
    let Some(store) = pg().await else { return };
    let applicant = user(&store, "Applicant", Role::Trainee).await;
    let hotel = unique("hotel");
    let a = offer(&store, &hotel, None, "A").await;
    let b = offer(&store, &hotel, None, "B").await;
    let c = offer(&store, &hotel, None, "C").await;
    for id in [a.id, b.id, c.id] {
        store
            .insert_application(application(id, Some(applicant.id)))
            .await
            .unwrap();
    }

    let scoped = store
        .list_applications(&ApplicationScope::Offers(vec![a.id, b.id]), None)
        .await
        .unwrap();
    let mut ids: Vec<i64> = scoped.iter().filter_map(|x| x.internship_id).collect();
    ids.sort();
    assert_eq!(ids, vec![a.id, b.id]);

    let narrowed = store
        .list_applications(&ApplicationScope::Offers(vec![a.id, b.id]), Some(b.id))
        .await
        .unwrap();
    assert_eq!(narrowed.len(), 1);

    // An employer with no offers sees nothing, not everything.
    let none = store
        .list_applications(&ApplicationScope::Offers(Vec::new()), None)
        .await
        .unwrap();
    assert!(none.is_empty());

    let own = store
        .list_applications(&ApplicationScope::Applicant(applicant.id), None)
        .await
        .unwrap();
    assert_eq!(own.len(), 3);
}

#[tokio::test]
async fn partial_offer_update_keeps_untouched_columns() {
    let Some(store) = pg().await else { return };
    let original = offer(&store, &unique("hotel"), None, "Front desk").await;

    let updated = store
        .update_offer(
            original.id,
            OfferFields {
                title: Localized {
                    en: Some("Night audit".into()),
                    ..Localized::default()
                },
                rating: Some(5),
                ..OfferFields::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.title_en.as_deref(), Some("Night audit"));
    assert_eq!(updated.rating, 5);
    assert_eq!(updated.title_fr.as_deref(), Some("Stage"));
    assert_eq!(updated.location.as_deref(), Some("Agadir"));
    assert_eq!(updated.hotel, original.hotel);

    assert!(matches!(
        store.update_offer(i64::MAX, OfferFields::default()).await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn deleting_a_user_applies_the_foreign_key_actions() {
    let Some(store) = pg().await else { return };
    let leaving = user(&store, "Leaving", Role::Employer).await;
    let staying = user(&store, "Staying", Role::Employer).await;
    let posting = offer(&store, &unique("hotel"), Some(leaving.id), "Spa").await;
    let applied = store
        .insert_application(application(posting.id, Some(leaving.id)))
        .await
        .unwrap();
    let token = unique("token");
    store
        .insert_session(&token, leaving.id, time::hours_from_now(1))
        .await
        .unwrap();
    store
        .insert_notification(note(leaving.id, None, json!({})))
        .await
        .unwrap();
    let sent = store
        .insert_notification(note(staying.id, Some(leaving.id), json!({})))
        .await
        .unwrap();

    assert!(store.delete_user(leaving.id).await.unwrap());

    let posting = store.find_offer(posting.id).await.unwrap().unwrap();
    assert_eq!(posting.employer_id, None);
    let applied = store.find_application(applied.id).await.unwrap().unwrap();
    assert_eq!(applied.user_id, None);
    assert!(store.find_session(&token).await.unwrap().is_none());
    assert!(store
        .list_notifications(leaving.id, 10, 0)
        .await
        .unwrap()
        .is_empty());
    let inbox = store.list_notifications(staying.id, 10, 0).await.unwrap();
    let kept = inbox.iter().find(|n| n.id == sent.id).unwrap();
    assert_eq!(kept.actor_id, None);
}

#[tokio::test]
async fn like_metacharacters_in_searches_match_literally() {
    let Some(store) = pg().await else { return };
    let hotel = unique("hotel");
    let literal = offer(&store, &hotel, None, "Stay 50% off_site").await;
    offer(&store, &hotel, None, "Room 500 off-site").await;

    for raw in ["50%", "off_site", "50% off_site"] {
        let found = store
            .list_offers(&OfferQuery {
                hotel: Some(hotel.clone()),
                search: SearchTerm::parse(raw),
                ..OfferQuery::default()
            })
            .await
            .unwrap();
        let ids: Vec<i64> = found.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![literal.id], "query {:?}", raw);
    }

    let everything = store
        .list_offers(&OfferQuery {
            hotel: Some(hotel.to_uppercase()),
            search: SearchTerm::parse("off"),
            limit: Some(1),
            ..OfferQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(everything.len(), 1);
}

#[tokio::test]
async fn search_queries_report_likes_and_distinct_hotels() {
    let Some(store) = pg().await else { return };
    let marker = unique("marker");
    let author = user(&store, &marker, Role::Employer).await;
    let viewer = user(&store, "Viewer", Role::Trainee).await;
    let liked = store
        .insert_post(author.id, &format!("{} pool party", marker), None)
        .await
        .unwrap();
    store
        .insert_post(author.id, &format!("{} spa day", marker), None)
        .await
        .unwrap();
    store.toggle_like(liked.id, viewer.id).await.unwrap();
    offer(&store, &marker, None, "A").await;
    offer(&store, &marker, None, "B").await;

    let term = SearchTerm::parse(&marker).unwrap();
    let posts = store.search_posts(&term, Some(viewer.id), 50).await.unwrap();
    assert_eq!(posts.len(), 2);
    let hit = posts.iter().find(|p| p.post.id == liked.id).unwrap();
    assert!(hit.liked_by_me);
    assert_eq!(hit.post.like_count, 1);
    assert_eq!(hit.post.author_name, marker);

    let anonymous = store.search_posts(&term, None, 50).await.unwrap();
    assert!(anonymous.iter().all(|p| !p.liked_by_me));

    assert_eq!(store.search_hotels(&term, 50).await.unwrap(), vec![marker.clone()]);
    let users = store.search_users(&term, 50).await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].id, author.id);

    let pool_only = SearchTerm::parse(&format!("{} pool", marker)).unwrap();
    assert_eq!(store.search_posts(&pool_only, None, 50).await.unwrap().len(), 1);
}

#[tokio::test]
async fn account_updates_coalesce_and_guard_email() {
    let Some(store) = pg().await else { return };
    let member = user(&store, "Member", Role::Trainee).await;
    let other = user(&store, "Other", Role::Trainee).await;
    for _ in 0..2 {
        store
            .insert_session(&unique("token"), member.id, time::hours_from_now(1))
            .await
            .unwrap();
    }

    let updated = store
        .update_account(
            member.id,
            AccountChanges {
                role: Some(Role::Employer),
                is_admin: Some(true),
                ..AccountChanges::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.role, Role::Employer);
    assert!(updated.is_admin);
    assert_eq!(updated.name, "Member");
    assert_eq!(updated.email, member.email);
    assert_eq!(updated.password_hash, member.password_hash);
    assert!(updated.updated_at >= member.updated_at);

    assert!(matches!(
        store
            .update_account(
                member.id,
                AccountChanges {
                    email: Some(other.email.clone()),
                    ..AccountChanges::default()
                },
            )
            .await,
        Err(Error::Conflict(_))
    ));
    assert!(store
        .update_account(
            i64::MAX,
            AccountChanges {
                name: Some("Ghost".into()),
                ..AccountChanges::default()
            },
        )
        .await
        .unwrap()
        .is_none());

    assert_eq!(store.delete_sessions_for_user(member.id).await.unwrap(), 2);
}

#[tokio::test]
async fn edits_stamp_posts_and_comments() {
    let Some(store) = pg().await else { return };
    let author = user(&store, "Author", Role::Trainee).await;
    let post = store.insert_post(author.id, "draft", None).await.unwrap();
    assert!(post.updated_at.is_none());
    let comment = store
        .insert_comment(post.id, author.id, "first")
        .await
        .unwrap();

    let before = Utc::now() - chrono::Duration::minutes(1);
    let post = store
        .update_post_content(post.id, "final")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(post.content, "final");
    assert!(post.updated_at.unwrap() > before);

    let comment = store
        .update_comment(comment.id, "edited")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(comment.content, "edited");
    assert_eq!(comment.author_name, "Author");
    assert!(comment.updated_at.is_some());

    assert!(store.update_comment(i64::MAX, "x").await.unwrap().is_none());
    assert!(store
        .update_post_content(i64::MAX, "x")
        .await
        .unwrap()
        .is_none());
}
