use serde_json::Value as JsonValue;
use std::sync::Arc;

use crate::database::Store;
use crate::error::{Error, Result};
use crate::models::notification::{NewNotification, Notification};

pub const DEFAULT_PAGE_SIZE: i64 = 30;
pub const MAX_PAGE_SIZE: i64 = 100;
/// Deepest page served; anything past it reads as that page.
pub const MAX_PAGE: i64 = 10_000;

#[derive(Debug, Clone)]
pub struct NotificationPayload {
    pub kind: String,
    pub title: Option<String>,
    pub body: Option<String>,
    pub data: Option<JsonValue>,
}

#[derive(Debug, Clone)]
pub struct NotificationPage {
    pub items: Vec<Notification>,
    pub unread: i64,
    pub page: i64,
    pub limit: i64,
}

#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn Store>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// One row per recipient. Recipients are not checked; a store-level
    /// foreign key violation is returned to the caller.
    pub async fn notify(
        &self,
        recipients: &[i64],
        payload: &NotificationPayload,
        actor_id: Option<i64>,
    ) -> Result<Vec<i64>> {
        let mut created = Vec::with_capacity(recipients.len());
        for &recipient_id in recipients {
            let row = self
                .store
                .insert_notification(NewNotification {
                    recipient_id,
                    actor_id,
                    kind: payload.kind.clone(),
                    title: payload.title.clone(),
                    body: payload.body.clone(),
                    data: payload.data.clone(),
                })
                .await?;
            created.push(row.id);
        }
        Ok(created)
    }

    /// Like [`notify`](Self::notify) but never fails the caller.
    pub async fn notify_best_effort(
        &self,
        recipients: &[i64],
        payload: &NotificationPayload,
        actor_id: Option<i64>,
    ) -> Vec<i64> {
        match self.notify(recipients, payload, actor_id).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(
                    kind = %payload.kind,
                    recipients = ?recipients,
                    error = %e,
                    "notification fan-out failed"
                );
                Vec::new()
            }
        }
    }

    pub async fn list(
        &self,
        recipient_id: i64,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> Result<NotificationPage> {
        let page = page.unwrap_or(1).clamp(1, MAX_PAGE);
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let offset = (page - 1) * limit;

        let items = self
            .store
            .list_notifications(recipient_id, limit, offset)
            .await?;
        let unread = self.store.count_unread(recipient_id).await?;
        Ok(NotificationPage {
            items,
            unread,
            page,
            limit,
        })
    }

    pub async fn mark_read(&self, recipient_id: i64, id: i64) -> Result<()> {
        if !self.store.mark_read(id, recipient_id).await? {
            return Err(Error::NotFound("Notification not found".into()));
        }
        Ok(())
    }

    pub async fn mark_all_read(&self, recipient_id: i64) -> Result<u64> {
        self.store.mark_all_read(recipient_id).await
    }

    pub async fn delete(&self, recipient_id: i64, id: i64) -> Result<()> {
        if !self.store.soft_delete_notification(id, recipient_id).await? {
            return Err(Error::NotFound("Notification not found".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{MemoryStore, UserRepository};
    use crate::models::user::{NewUser, Role};
    use serde_json::json;

    async fn setup() -> (Arc<MemoryStore>, NotificationService, i64) {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .insert_user(NewUser {
                name: "Ali".into(),
                email: "ali@x.com".into(),
                password_hash: "x".into(),
                role: Role::Trainee,
                is_admin: false,
            })
            .await
            .unwrap();
        let service = NotificationService::new(store.clone());
        (store, service, user.id)
    }

    fn payload() -> NotificationPayload {
        NotificationPayload {
            kind: "application_status".into(),
            title: Some("Application status updated".into()),
            body: None,
            data: Some(json!({ "internship_id": 7 })),
        }
    }

    #[tokio::test]
    async fn notify_returns_one_id_per_recipient() {
        let (_, service, user_id) = setup().await;
        let ids = service
            .notify(&[user_id, user_id], &payload(), None)
            .await
            .unwrap();
        assert_eq!(ids.len(), 2);

        let page = service.list(user_id, None, None).await.unwrap();
        assert_eq!(page.unread, 2);
        assert_eq!(page.limit, DEFAULT_PAGE_SIZE);
    }

    #[tokio::test]
    async fn huge_page_numbers_are_clamped_not_overflowed() {
        let (_, service, user_id) = setup().await;
        service.notify(&[user_id], &payload(), None).await.unwrap();

        let page = service
            .list(user_id, Some(i64::MAX), Some(i64::MAX))
            .await
            .unwrap();
        assert_eq!(page.page, MAX_PAGE);
        assert_eq!(page.limit, MAX_PAGE_SIZE);
        assert!(page.items.is_empty());
        assert_eq!(page.unread, 1);

        let first = service.list(user_id, Some(i64::MIN), None).await.unwrap();
        assert_eq!(first.page, 1);
        assert_eq!(first.items.len(), 1);
    }

    #[tokio::test]
    async fn best_effort_swallows_unknown_recipients() {
        let (_, service, _) = setup().await;
        assert!(service.notify(&[999], &payload(), None).await.is_err());
        assert!(service
            .notify_best_effort(&[999], &payload(), None)
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn read_and_delete_are_scoped_to_the_recipient() {
        let (_, service, user_id) = setup().await;
        let ids = service.notify(&[user_id], &payload(), None).await.unwrap();

        assert!(matches!(
            service.mark_read(user_id + 1, ids[0]).await,
            Err(Error::NotFound(_))
        ));
        service.mark_read(user_id, ids[0]).await.unwrap();
        assert_eq!(service.list(user_id, None, None).await.unwrap().unread, 0);

        service.delete(user_id, ids[0]).await.unwrap();
        assert!(service.list(user_id, None, None).await.unwrap().items.is_empty());
        assert!(service.delete(user_id, ids[0]).await.is_err());
    }
}
