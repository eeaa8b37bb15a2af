pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod storage;
pub mod utils;

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::{AccessPolicy, Config};
use crate::database::{PgStore, Store};
use crate::services::{
    application_service::ApplicationService, identity_service::IdentityService,
    notification_service::NotificationService, offer_service::OfferService,
    ownership::{OfferOwnership, OwnershipResolver}, search_service::SearchService,
    social_service::SocialService, user_service::UserService,
};
use crate::storage::{FileStore, LocalFileStore};

/// Deployment decisions the services need, detached from the global config
/// so tests can build state directly.
#[derive(Debug, Clone, Copy)]
pub struct Settings {
    pub ownership: OfferOwnership,
    pub access: AccessPolicy,
    pub session_ttl_hours: i64,
    pub cookie_secure: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ownership: OfferOwnership::EmployerKey,
            access: AccessPolicy::Strict,
            session_ttl_hours: 168,
            cookie_secure: false,
        }
    }
}

impl Settings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            ownership: config.offer_ownership,
            access: config.access_policy,
            session_ttl_hours: config.session_ttl_hours,
            cookie_secure: config.session_cookie_secure,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub files: Arc<dyn FileStore>,
    pub settings: Settings,
    pub identity_service: IdentityService,
    pub ownership: OwnershipResolver,
    pub notification_service: NotificationService,
    pub offer_service: OfferService,
    pub application_service: ApplicationService,
    pub user_service: UserService,
    pub social_service: SocialService,
    pub search_service: SearchService,
}

impl AppState {
    pub fn new(pool: PgPool, config: &Config) -> Self {
        Self::from_parts(
            Arc::new(PgStore::new(pool)),
            Arc::new(LocalFileStore::new(&config.uploads_dir)),
            Settings::from_config(config),
        )
    }

    pub fn from_parts(
        store: Arc<dyn Store>,
        files: Arc<dyn FileStore>,
        settings: Settings,
    ) -> Self {
        let identity_service = IdentityService::new(store.clone(), settings.session_ttl_hours);
        let ownership = OwnershipResolver::new(settings.ownership, store.clone());
        let notification_service = NotificationService::new(store.clone());
        let offer_service = OfferService::new(
            store.clone(),
            files.clone(),
            ownership.clone(),
            settings.access,
        );
        let application_service = ApplicationService::new(
            store.clone(),
            files.clone(),
            ownership.clone(),
            notification_service.clone(),
            settings.access,
        );
        let user_service = UserService::new(store.clone(), files.clone(), offer_service.clone());
        let social_service = SocialService::new(store.clone(), files.clone());
        let search_service = SearchService::new(store.clone());

        Self {
            store,
            files,
            settings,
            identity_service,
            ownership,
            notification_service,
            offer_service,
            application_service,
            user_service,
            social_service,
            search_service,
        }
    }
}
