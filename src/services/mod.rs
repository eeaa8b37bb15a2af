pub mod application_service;
pub mod cascade;
pub mod identity_service;
pub mod notification_service;
pub mod offer_service;
pub mod ownership;
pub mod search_service;
pub mod social_service;
pub mod user_service;
