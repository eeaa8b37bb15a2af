use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use serde_json::json;
use tokio_test::assert_ok;

use stageconnect_backend::{
    config::AccessPolicy,
    database::{
        ApplicationRepository, MemoryStore, NotificationRepository, OfferRepository,
        SessionRepository, UserRepository,
    },
    dto::auth_dto::{LoginPayload, SignupPayload},
    error::Error,
    models::{
        application::{ApplicationScope, ApplicationStatus},
        offer::{Localized, Offer, OfferFields},
        user::{Role, User},
    },
    services::{
        application_service::ApplicationForm,
        identity_service::{Actor, Principal},
        ownership::OfferOwnership,
        user_service::AdminUserEdit,
    },
    storage::{MemoryFileStore, Upload},
    AppState, Settings,
};

struct Harness {
    state: AppState,
    store: Arc<MemoryStore>,
    files: Arc<MemoryFileStore>,
}

fn harness_with(store: MemoryStore, ownership: OfferOwnership, access: AccessPolicy) -> Harness {
    let store = Arc::new(store);
    let files = Arc::new(MemoryFileStore::new());
    let settings = Settings {
        ownership,
        access,
        ..Settings::default()
    };
    let state = AppState::from_parts(store.clone(), files.clone(), settings);
    Harness {
        state,
        store,
        files,
    }
}

fn harness(ownership: OfferOwnership) -> Harness {
    harness_with(MemoryStore::new(), ownership, AccessPolicy::Strict)
}

async fn signup(h: &Harness, name: &str, email: &str, role: Role) -> User {
    h.state
        .identity_service
        .signup(SignupPayload {
            name: name.into(),
            email: email.into(),
            password: "secret-password".into(),
            role: Some(role),
        })
        .await
        .expect("signup")
}

async fn admin(h: &Harness) -> Principal {
    let user = h
        .state
        .identity_service
        .bootstrap_admin("root@stageconnect.test", "root-password", None)
        .await
        .expect("bootstrap")
        .expect("admin created");
    as_principal(&user)
}

fn as_principal(user: &User) -> Principal {
    Principal::User(Actor::from(user))
}

fn offer(id: i64, hotel: &str, employer_id: Option<i64>) -> Offer {
    Offer {
        id,
        hotel: hotel.into(),
        employer_id,
        location: Some("Agadir".into()),
        title_ar: None,
        title_fr: Some("Stage réception".into()),
        title_en: Some("Front desk internship".into()),
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
        rating: 4,
        created_at: Utc::now(),
    }
}

fn form(internship_id: i64, name: &str) -> ApplicationForm {
    ApplicationForm {
        internship_id,
        name: name.into(),
        email: format!("{}@mail.test", name.to_lowercase()),
        phone: None,
        school: Some("ISTA Agadir".into()),
        extra: Some(json!({ "languages": ["fr", "en"] })),
    }
}

fn resume() -> Upload {
    Upload::new("resume", "cv.pdf", Bytes::from_static(b"%PDF-1.7 resume"))
}

#[tokio::test]
async fn hotel_name_ownership_links_employer_to_offer_and_notifies() {
    let h = harness(OfferOwnership::HotelName);
    let hyatt = signup(&h, "Hyatt", "hr@hyatt.test", Role::Employer).await;
    let trainee = signup(&h, "Amina", "amina@mail.test", Role::Trainee).await;
    assert_ok!(h.store.seed_offer(offer(7, "Hyatt", None)));

    let seeded = h.state.offer_service.get(7).await.unwrap();
    assert!(h.state.ownership.owns_offer(&Actor::from(&hyatt), &seeded));

    let application = h
        .state
        .application_service
        .submit(&as_principal(&trainee), form(7, "Amina"), None)
        .await
        .unwrap();
    assert_eq!(application.user_id, Some(trainee.id));
    assert_eq!(application.status, ApplicationStatus::Pending);

    let page = h
        .state
        .notification_service
        .list(hyatt.id, None, None)
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.unread, 1);
    let note = &page.items[0];
    assert_eq!(note.kind, "new_application");
    assert_eq!(note.actor_id, Some(trainee.id));
    assert_eq!(
        note.data.as_ref().and_then(|d| d.get("internship_id")).cloned(),
        Some(json!(7))
    );

    let visible = h
        .state
        .application_service
        .list(&as_principal(&hyatt), None)
        .await
        .unwrap();
    assert_eq!(visible.len(), 1);
}

#[tokio::test]
async fn employer_key_mode_ignores_matching_hotel_name() {
    let h = harness(OfferOwnership::EmployerKey);
    let hyatt = signup(&h, "Hyatt", "hr@hyatt.test", Role::Employer).await;
    assert_ok!(h.store.seed_offer(offer(3, "Hyatt", None)));

    let seeded = h.state.offer_service.get(3).await.unwrap();
    assert!(!h.state.ownership.owns_offer(&Actor::from(&hyatt), &seeded));

    let err = h
        .state
        .offer_service
        .delete(&as_principal(&hyatt), 3)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));
    assert!(h.state.offer_service.get(3).await.is_ok());
}

#[tokio::test]
async fn deleting_an_offer_removes_applications_resumes_and_notifications() {
    let h = harness(OfferOwnership::EmployerKey);
    let employer = signup(&h, "Sofitel", "hr@sofitel.test", Role::Employer).await;
    assert_ok!(h.store.seed_offer(offer(11, "Sofitel", Some(employer.id))));
    assert_ok!(h.store.seed_offer(offer(12, "Sofitel", Some(employer.id))));

    for name in ["Karim", "Lina"] {
        h.state
            .application_service
            .submit(&Principal::Anonymous, form(11, name), Some(resume()))
            .await
            .unwrap();
    }
    h.state
        .application_service
        .submit(&Principal::Anonymous, form(12, "Omar"), None)
        .await
        .unwrap();
    assert_eq!(h.files.len(), 2);

    let report = h
        .state
        .offer_service
        .delete(&as_principal(&employer), 11)
        .await
        .unwrap();
    assert!(report.is_clean());
    assert!(h.files.is_empty());

    let again = h
        .state
        .offer_service
        .delete(&as_principal(&employer), 11)
        .await
        .unwrap_err();
    assert!(matches!(again, Error::NotFound(_)));

    let remaining = h
        .store
        .list_applications(&ApplicationScope::All, None)
        .await
        .unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].internship_id, Some(12));

    let notes = h
        .store
        .list_notifications(employer.id, 50, 0)
        .await
        .unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(
        notes[0].data.as_ref().and_then(|d| d.get("internship_id")).cloned(),
        Some(json!(12))
    );
}

#[tokio::test]
async fn user_delete_survives_failing_dependent_steps() {
    let h = harness(OfferOwnership::EmployerKey);
    let root = admin(&h).await;
    let employer = signup(&h, "Marriott", "hr@marriott.test", Role::Employer).await;
    let trainee = signup(&h, "Yassine", "yassine@mail.test", Role::Trainee).await;

    for id in 1..=3 {
        assert_ok!(h.store.seed_offer(offer(id, "Marriott", Some(employer.id))));
    }
    for id in 1..=3 {
        h.state
            .application_service
            .submit(&as_principal(&trainee), form(id, "Yassine"), Some(resume()))
            .await
            .unwrap();
    }

    h.files.fail_deletes(true);
    h.store.fail_on("delete_follows_for_user");

    let report = h
        .state
        .user_service
        .delete_user(&root, trainee.id)
        .await
        .unwrap();
    assert!(!report.is_clean());
    assert!(report
        .failures
        .iter()
        .any(|f| f.step == "delete_follows"));
    assert_eq!(
        report
            .failures
            .iter()
            .filter(|f| f.step == "delete_resume_file")
            .count(),
        3
    );

    assert!(h.store.find_user(trainee.id).await.unwrap().is_none());
    let left = h
        .store
        .list_applications(&ApplicationScope::All, None)
        .await
        .unwrap();
    assert!(left.is_empty());

    let again = h
        .state
        .user_service
        .delete_user(&root, trainee.id)
        .await
        .unwrap_err();
    assert!(matches!(again, Error::NotFound(_)));
}

#[tokio::test]
async fn deleting_an_employer_takes_their_offers_along() {
    let h = harness(OfferOwnership::EmployerKey);
    let root = admin(&h).await;
    let employer = signup(&h, "Hilton", "hr@hilton.test", Role::Employer).await;
    assert_ok!(h.store.seed_offer(offer(21, "Hilton", Some(employer.id))));
    assert_ok!(h.store.seed_offer(offer(22, "Hilton", Some(employer.id))));
    assert_ok!(h.store.seed_offer(offer(23, "Riad Atlas", None)));
    h.state
        .application_service
        .submit(&Principal::Anonymous, form(21, "Nora"), Some(resume()))
        .await
        .unwrap();

    h.files.fail_deletes(true);
    h.store.fail_on("delete_notifications_for_offer");

    let report = h
        .state
        .user_service
        .delete_user(&root, employer.id)
        .await
        .unwrap();
    assert!(!report.is_clean());
    assert!(h.store.find_user(employer.id).await.unwrap().is_none());

    assert!(h.state.offer_service.get(21).await.is_err());
    assert!(h.state.offer_service.get(22).await.is_err());
    assert!(h.state.offer_service.get(23).await.is_ok());
    let orphans = h
        .store
        .list_applications(&ApplicationScope::Offers(vec![21, 22]), None)
        .await
        .unwrap();
    assert!(orphans.is_empty());
    assert!(h
        .store
        .list_applications(&ApplicationScope::All, None)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn status_can_move_back_to_pending() {
    let h = harness(OfferOwnership::EmployerKey);
    let employer = signup(&h, "Ibis", "hr@ibis.test", Role::Employer).await;
    let trainee = signup(&h, "Salma", "salma@mail.test", Role::Trainee).await;
    assert_ok!(h.store.seed_offer(offer(5, "Ibis", Some(employer.id))));
    let application = h
        .state
        .application_service
        .submit(&as_principal(&trainee), form(5, "Salma"), None)
        .await
        .unwrap();

    let reviewer = as_principal(&employer);
    let approved = h
        .state
        .application_service
        .update_status(&reviewer, application.id, ApplicationStatus::Approved)
        .await
        .unwrap();
    assert_eq!(approved.status, ApplicationStatus::Approved);
    let pending = h
        .state
        .application_service
        .update_status(&reviewer, application.id, ApplicationStatus::Pending)
        .await
        .unwrap();
    assert_eq!(pending.status, ApplicationStatus::Pending);

    let page = h
        .state
        .notification_service
        .list(trainee.id, None, None)
        .await
        .unwrap();
    assert_eq!(page.items.len(), 2);
    assert!(page.items.iter().all(|n| n.kind == "application_status"));

    let own = h
        .state
        .application_service
        .update_status(&as_principal(&trainee), application.id, ApplicationStatus::Approved)
        .await
        .unwrap_err();
    assert!(matches!(own, Error::Forbidden(_)));
}

#[tokio::test]
async fn legacy_policy_lets_anonymous_callers_review() {
    let h = harness_with(
        MemoryStore::new(),
        OfferOwnership::EmployerKey,
        AccessPolicy::Legacy,
    );
    assert_ok!(h.store.seed_offer(offer(9, "Atlas", None)));
    let application = h
        .state
        .application_service
        .submit(&Principal::Anonymous, form(9, "Hamza"), None)
        .await
        .unwrap();

    let updated = h
        .state
        .application_service
        .update_status(&Principal::Anonymous, application.id, ApplicationStatus::Rejected)
        .await
        .unwrap();
    assert_eq!(updated.status, ApplicationStatus::Rejected);
}

#[tokio::test]
async fn bulk_delete_partitions_ids() {
    let h = harness(OfferOwnership::EmployerKey);
    let employer = signup(&h, "Kenzi", "hr@kenzi.test", Role::Employer).await;
    let rival = signup(&h, "Barcelo", "hr@barcelo.test", Role::Employer).await;
    assert_ok!(h.store.seed_offer(offer(31, "Kenzi", Some(employer.id))));
    assert_ok!(h.store.seed_offer(offer(32, "Barcelo", Some(rival.id))));

    let mine = h
        .state
        .application_service
        .submit(&Principal::Anonymous, form(31, "Rania"), Some(resume()))
        .await
        .unwrap();
    let foreign = h
        .state
        .application_service
        .submit(&Principal::Anonymous, form(32, "Adam"), None)
        .await
        .unwrap();

    let outcome = h
        .state
        .application_service
        .bulk_delete(&as_principal(&employer), &[mine.id, foreign.id, 9_999, -4])
        .await
        .unwrap();
    assert_eq!(outcome.deleted_ids, vec![mine.id]);
    assert_eq!(outcome.failed_ids, vec![foreign.id, 9_999, -4]);
    assert!(h.store.find_application(foreign.id).await.unwrap().is_some());
    assert!(h.files.is_empty());
}

#[tokio::test]
async fn resume_is_dropped_when_the_store_has_no_resume_column() {
    let h = harness_with(
        MemoryStore::without_resume_column(),
        OfferOwnership::EmployerKey,
        AccessPolicy::Strict,
    );
    assert_ok!(h.store.seed_offer(offer(41, "Mogador", None)));

    let application = h
        .state
        .application_service
        .submit(&Principal::Anonymous, form(41, "Ilyas"), Some(resume()))
        .await
        .unwrap();
    assert!(application.resume_path.is_none());
    assert!(h.files.is_empty());
}

#[tokio::test]
async fn notifications_survive_a_failing_fan_out() {
    let h = harness(OfferOwnership::EmployerKey);
    let employer = signup(&h, "Palmeraie", "hr@palmeraie.test", Role::Employer).await;
    assert_ok!(h.store.seed_offer(offer(51, "Palmeraie", Some(employer.id))));
    h.store.fail_on("insert_notification");

    let application = h
        .state
        .application_service
        .submit(&Principal::Anonymous, form(51, "Zineb"), None)
        .await
        .unwrap();
    assert!(h.store.find_application(application.id).await.unwrap().is_some());
    assert_eq!(h.store.count_unread(employer.id).await.unwrap(), 0);
}

fn titled(title: &str) -> OfferFields {
    OfferFields {
        title: Localized {
            en: Some(title.into()),
            ..Localized::default()
        },
        ..OfferFields::default()
    }
}

async fn login(h: &Harness, email: &str, password: &str) -> Result<(User, String), Error> {
    h.state
        .identity_service
        .login(LoginPayload {
            email: email.into(),
            password: password.into(),
        })
        .await
}

#[tokio::test]
async fn offer_bulk_delete_is_admin_only_and_counts_what_went() {
    let h = harness(OfferOwnership::EmployerKey);
    let employer = signup(&h, "Kenzi", "hr@kenzi.test", Role::Employer).await;
    assert_ok!(h.store.seed_offer(offer(61, "Kenzi", Some(employer.id))));
    assert_ok!(h.store.seed_offer(offer(62, "Kenzi", Some(employer.id))));

    let err = h
        .state
        .offer_service
        .bulk_delete(&as_principal(&employer), &[61, 62])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));
    assert!(matches!(
        h.state.offer_service.bulk_delete(&Principal::Anonymous, &[61]).await,
        Err(Error::Unauthorized(_))
    ));

    let root = admin(&h).await;
    let deleted = h
        .state
        .offer_service
        .bulk_delete(&root, &[61, 9_999, 62, 61])
        .await
        .unwrap();
    assert_eq!(deleted, 2);
    assert!(h.store.find_offer(61).await.unwrap().is_none());
    assert!(h.store.find_offer(62).await.unwrap().is_none());
}

#[tokio::test]
async fn delete_mine_follows_employer_key_ownership() {
    let h = harness(OfferOwnership::EmployerKey);
    let employer = signup(&h, "Hyatt", "hr@hyatt.test", Role::Employer).await;
    assert_ok!(h.store.seed_offer(offer(71, "Hyatt", Some(employer.id))));
    // Same hotel name but no employer key: not theirs in this mode.
    assert_ok!(h.store.seed_offer(offer(72, "Hyatt", None)));

    let deleted = h
        .state
        .offer_service
        .delete_mine(&as_principal(&employer))
        .await
        .unwrap();
    assert_eq!(deleted, 1);
    assert!(h.store.find_offer(71).await.unwrap().is_none());
    assert!(h.store.find_offer(72).await.unwrap().is_some());
}

#[tokio::test]
async fn delete_mine_follows_hotel_name_ownership() {
    let h = harness(OfferOwnership::HotelName);
    let employer = signup(&h, "Hyatt", "hr@hyatt.test", Role::Employer).await;
    assert_ok!(h.store.seed_offer(offer(81, "Hyatt", None)));
    assert_ok!(h.store.seed_offer(offer(82, "Hyatt", None)));
    assert_ok!(h.store.seed_offer(offer(83, "Sofitel", None)));

    let deleted = h
        .state
        .offer_service
        .delete_mine(&as_principal(&employer))
        .await
        .unwrap();
    assert_eq!(deleted, 2);
    assert!(h.store.find_offer(83).await.unwrap().is_some());

    let trainee = signup(&h, "Amina", "amina@mail.test", Role::Trainee).await;
    let err = h
        .state
        .offer_service
        .delete_mine(&as_principal(&trainee))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));
    assert!(h.store.find_offer(83).await.unwrap().is_some());
}

#[tokio::test]
async fn offer_edit_checks_existence_and_ownership() {
    let h = harness(OfferOwnership::EmployerKey);
    let owner = signup(&h, "Hyatt", "hr@hyatt.test", Role::Employer).await;
    let rival = signup(&h, "Sofitel", "hr@sofitel.test", Role::Employer).await;
    assert_ok!(h.store.seed_offer(offer(91, "Hyatt", Some(owner.id))));

    let err = h
        .state
        .offer_service
        .edit(&as_principal(&rival), 91, titled("Hijacked"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));

    let err = h
        .state
        .offer_service
        .edit(&as_principal(&owner), 9_999, titled("Ghost"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    let unchanged = h.state.offer_service.get(91).await.unwrap();
    assert_eq!(unchanged.title_en.as_deref(), Some("Front desk internship"));
}

#[tokio::test]
async fn offer_images_must_have_an_allowed_extension() {
    let h = harness(OfferOwnership::EmployerKey);
    let employer = signup(&h, "Hyatt", "hr@hyatt.test", Role::Employer).await;
    let bitmap = Upload::new("image_file", "lobby.bmp", Bytes::from_static(b"BM\x00\x00"));

    let err = h
        .state
        .offer_service
        .create(&as_principal(&employer), titled("Front desk"), Some(bitmap))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::BadRequest(_)));
    assert!(h.files.is_empty());
    assert!(h
        .store
        .list_offers(&Default::default())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn admin_edit_changes_only_given_fields_and_guards_email() {
    let h = harness(OfferOwnership::EmployerKey);
    let root = admin(&h).await;
    let amina = signup(&h, "Amina", "amina@mail.test", Role::Trainee).await;
    signup(&h, "Karim", "karim@mail.test", Role::Trainee).await;

    let err = h
        .state
        .user_service
        .admin_update(&root, amina.id, AdminUserEdit::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::BadRequest(_)));

    let err = h
        .state
        .user_service
        .admin_update(
            &root,
            amina.id,
            AdminUserEdit {
                email: Some("KARIM@mail.test".into()),
                ..AdminUserEdit::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));

    let err = h
        .state
        .user_service
        .admin_update(
            &as_principal(&amina),
            amina.id,
            AdminUserEdit {
                is_admin: Some(true),
                ..AdminUserEdit::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));

    let err = h
        .state
        .user_service
        .admin_update(
            &root,
            9_999,
            AdminUserEdit {
                name: Some("Ghost".into()),
                ..AdminUserEdit::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    let updated = h
        .state
        .user_service
        .admin_update(
            &root,
            amina.id,
            AdminUserEdit {
                role: Some(Role::Employer),
                email: Some("amina@mail.test".into()),
                ..AdminUserEdit::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.role, Role::Employer);
    assert_eq!(updated.name, "Amina");
    assert!(!updated.is_admin);
}

#[tokio::test]
async fn admin_password_changes_revoke_sessions() {
    let h = harness(OfferOwnership::EmployerKey);
    let root = admin(&h).await;
    let amina = signup(&h, "Amina", "amina@mail.test", Role::Trainee).await;
    let (_, token) = login(&h, "amina@mail.test", "secret-password").await.unwrap();
    let resolved = h.state.identity_service.resolve(Some(&token)).await;
    assert_eq!(resolved.user_id(), Some(amina.id));

    let temporary = h
        .state
        .user_service
        .reset_password(&root, amina.id, None)
        .await
        .unwrap();
    assert_eq!(temporary.len(), 10);
    assert!(temporary.chars().all(|c| c.is_ascii_alphanumeric()));
    let resolved = h.state.identity_service.resolve(Some(&token)).await;
    assert!(resolved.user_id().is_none());
    assert!(login(&h, "amina@mail.test", "secret-password").await.is_err());
    assert_ok!(login(&h, "amina@mail.test", &temporary).await);

    h.state
        .user_service
        .admin_update(
            &root,
            amina.id,
            AdminUserEdit {
                password: Some("chosen-by-admin".into()),
                ..AdminUserEdit::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(h.store.delete_sessions_for_user(amina.id).await.unwrap(), 0);
    assert_ok!(login(&h, "amina@mail.test", "chosen-by-admin").await);

    assert!(matches!(
        h.state.user_service.reset_password(&root, 9_999, None).await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn offer_image_follows_the_offer_and_failed_writes_create_nothing() {
    let h = harness(OfferOwnership::EmployerKey);
    let employer = signup(&h, "Hyatt", "hr@hyatt.test", Role::Employer).await;
    let png = || {
        Upload::new(
            "image_file",
            "lobby.png",
            Bytes::from_static(&[0x89, 0x50, 0x4E, 0x47, 0x0D]),
        )
    };

    let created = h
        .state
        .offer_service
        .create(&as_principal(&employer), titled("Front desk"), Some(png()))
        .await
        .unwrap();
    let image = created.image.clone().unwrap();
    assert!(h.files.contains(&image));

    h.state
        .offer_service
        .delete(&as_principal(&employer), created.id)
        .await
        .unwrap();
    assert!(!h.files.contains(&image));

    h.files.fail_stores(true);
    let err = h
        .state
        .offer_service
        .create(&as_principal(&employer), titled("Concierge"), Some(png()))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Upstream(_)));
    assert!(h
        .store
        .list_offers(&Default::default())
        .await
        .unwrap()
        .is_empty());
}
