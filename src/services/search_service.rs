use std::sync::Arc;

use crate::database::Store;
use crate::error::{Error, Result};
use crate::models::{
    offer::OfferQuery,
    search::{SearchResults, SearchScope, SearchTerm},
};
use crate::services::identity_service::Principal;

pub const RESULT_LIMIT: i64 = 50;

/// Site-wide search across posts, internships, hotels and people.
#[derive(Clone)]
pub struct SearchService {
    store: Arc<dyn Store>,
}

impl SearchService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Emails in user hits are only shown to signed-in callers.
    pub async fn search(
        &self,
        principal: &Principal,
        q: Option<String>,
        scope: Option<String>,
    ) -> Result<(SearchTerm, SearchScope, SearchResults)> {
        let term = q
            .as_deref()
            .and_then(SearchTerm::parse)
            .ok_or_else(|| Error::BadRequest("Missing query".into()))?;
        let scope = match scope.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => raw
                .to_lowercase()
                .parse::<SearchScope>()
                .map_err(Error::BadRequest)?,
            None => SearchScope::All,
        };
        let viewer = principal.user_id();

        let mut results = SearchResults::default();
        if scope.includes(SearchScope::Posts) {
            results.posts = Some(self.store.search_posts(&term, viewer, RESULT_LIMIT).await?);
        }
        if scope.includes(SearchScope::Offers) {
            let query = OfferQuery {
                search: Some(term.clone()),
                limit: Some(RESULT_LIMIT),
                ..OfferQuery::default()
            };
            results.offers = Some(self.store.list_offers(&query).await?);
            results.hotels = Some(self.store.search_hotels(&term, RESULT_LIMIT).await?);
        }
        if scope.includes(SearchScope::Users) {
            let mut users = self.store.search_users(&term, RESULT_LIMIT).await?;
            if viewer.is_none() {
                for user in &mut users {
                    user.email = None;
                }
            }
            results.users = Some(users);
        }

        tracing::debug!(q = %term.as_text(), scope = %scope, "search served");
        Ok((term, scope, results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{MemoryStore, OfferRepository, SocialRepository, UserRepository};
    use crate::models::offer::{Localized, NewOffer, OfferFields};
    use crate::models::user::{NewUser, Role};
    use crate::services::identity_service::Actor;

    async fn seeded() -> (Arc<MemoryStore>, Principal) {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .insert_user(NewUser {
                name: "Hyatt Regency".into(),
                email: "jobs@hyatt.ma".into(),
                password_hash: "x".into(),
                role: Role::Employer,
                is_admin: false,
            })
            .await
            .unwrap();
        for title in ["Front desk intern", "Kitchen assistant"] {
            store
                .insert_offer(NewOffer {
                    hotel: "Hyatt Regency".into(),
                    employer_id: Some(user.id),
                    fields: OfferFields {
                        title: Localized {
                            en: Some(title.into()),
                            ..Localized::default()
                        },
                        ..OfferFields::default()
                    },
                })
                .await
                .unwrap();
        }
        let post = store
            .insert_post(user.id, "Hiring at the Hyatt front desk", None)
            .await
            .unwrap();
        store.toggle_like(post.id, user.id).await.unwrap();
        (store, Principal::User(Actor::from(&user)))
    }

    #[tokio::test]
    async fn blank_or_missing_query_is_rejected() {
        let (store, viewer) = seeded().await;
        let search = SearchService::new(store);
        for q in [None, Some("   ".to_string())] {
            assert!(matches!(
                search.search(&viewer, q, None).await,
                Err(Error::BadRequest(_))
            ));
        }
        assert!(matches!(
            search.search(&viewer, Some("hyatt".into()), Some("hotels".into())).await,
            Err(Error::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn all_scope_fills_every_section() {
        let (store, viewer) = seeded().await;
        let search = SearchService::new(store);
        let (_, scope, results) = search
            .search(&viewer, Some("HYATT".into()), None)
            .await
            .unwrap();
        assert_eq!(scope, SearchScope::All);

        let posts = results.posts.unwrap();
        assert_eq!(posts.len(), 1);
        assert!(posts[0].liked_by_me);
        assert_eq!(posts[0].post.like_count, 1);
        assert_eq!(results.offers.unwrap().len(), 2);
        assert_eq!(results.hotels.unwrap(), vec!["Hyatt Regency".to_string()]);
        let users = results.users.unwrap();
        assert_eq!(users[0].email.as_deref(), Some("jobs@hyatt.ma"));
    }

    #[tokio::test]
    async fn anonymous_callers_get_no_emails_or_likes() {
        let (store, _) = seeded().await;
        let search = SearchService::new(store);
        let (_, _, results) = search
            .search(&Principal::Anonymous, Some("hyatt".into()), Some("Users".into()))
            .await
            .unwrap();
        assert!(results.posts.is_none());
        assert!(results.offers.is_none());
        let users = results.users.unwrap();
        assert_eq!(users.len(), 1);
        assert!(users[0].email.is_none());

        let (_, _, results) = search
            .search(&Principal::Anonymous, Some("front desk".into()), Some("posts".into()))
            .await
            .unwrap();
        assert!(!results.posts.unwrap()[0].liked_by_me);
    }
}
