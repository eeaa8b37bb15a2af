pub mod application;
pub mod follow;
pub mod notification;
pub mod offer;
pub mod post;
pub mod rating;
pub mod search;
pub mod session;
pub mod user;
