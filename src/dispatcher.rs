use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};

use crate::errors::{PushError, StoreError};
use crate::models::{
    Budget, NotificationEvent, NotificationRecord, NotificationType, PushData, PushNotification,
};

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn create(&self, event: &NotificationEvent) -> Result<NotificationRecord, StoreError>;
    async fn unread_count_for_user(&self, user_id: &str) -> Result<i64, StoreError>;
}

#[async_trait]
pub trait PushService: Send + Sync {
    async fn schedule_local(&self, notification: PushNotification) -> Result<(), PushError>;
}

#[async_trait]
pub trait BudgetSource: Send + Sync {
    async fn budgets(&self) -> Result<Vec<Budget>, StoreError>;
}

pub fn should_push(notification_type: NotificationType) -> bool {
    match notification_type {
        NotificationType::BudgetAlert => true,
        NotificationType::Transaction => true,
        NotificationType::System => false,
    }
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    store: Arc<dyn NotificationStore>,
    push: Arc<dyn PushService>,
}

impl NotificationDispatcher {
    pub fn new(store: Arc<dyn NotificationStore>, push: Arc<dyn PushService>) -> Self {
        NotificationDispatcher { store, push }
    }

    // Store failures abort before any push; push failures are only logged.
    pub async fn dispatch(
        &self,
        event: NotificationEvent,
    ) -> Result<NotificationRecord, StoreError> {
        let record = self.store.create(&event).await?;
        debug!(
            "Persisted notification {} ({}) for budget {:?}",
            record.id, record.notification_type, record.budget_id
        );

        if !should_push(record.notification_type) {
            return Ok(record);
        }

        let badge = self.badge_for(record.user_id.as_deref()).await;
        let notification = PushNotification {
            title: record.title.clone(),
            body: record.body.clone(),
            data: PushData {
                notification_id: record.id,
                notification_type: record.notification_type,
            },
            badge,
        };

        match self.push.schedule_local(notification).await {
            Ok(()) => info!("Scheduled push for notification {}", record.id),
            Err(err) => warn!("Push for notification {} failed: {}", record.id, err),
        }

        Ok(record)
    }

    async fn badge_for(&self, user_id: Option<&str>) -> Option<i64> {
        let user_id = user_id?;
        match self.store.unread_count_for_user(user_id).await {
            Ok(count) => Some(count),
            Err(err) => {
                warn!("Unread count for user {} unavailable: {}", user_id, err);
                None
            }
        }
    }
}
