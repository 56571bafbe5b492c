use std::path::PathBuf;

use async_trait::async_trait;
use log::info;
use tokio::io::AsyncWriteExt;

use crate::dispatcher::PushService;
use crate::errors::PushError;
use crate::models::PushNotification;

#[derive(Debug, Clone, Default)]
pub struct ConsolePushService;

#[async_trait]
impl PushService for ConsolePushService {
    async fn schedule_local(&self, notification: PushNotification) -> Result<(), PushError> {
        let badge = notification
            .badge
            .map(|count| format!(" [{count} unread]"))
            .unwrap_or_default();
        println!("{} - {}{}", notification.title, notification.body, badge);
        info!(
            "Local alert delivered for notification {}",
            notification.data.notification_id
        );
        Ok(())
    }
}

// One JSON line per alert, consumed by the device notification agent.
#[derive(Debug, Clone)]
pub struct SpoolPushService {
    path: PathBuf,
}

impl SpoolPushService {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SpoolPushService { path: path.into() }
    }
}

#[async_trait]
impl PushService for SpoolPushService {
    async fn schedule_local(&self, notification: PushNotification) -> Result<(), PushError> {
        let mut line = serde_json::to_string(&notification)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        info!(
            "Queued alert for notification {} in {}",
            notification.data.notification_id,
            self.path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NotificationType, PushData};
    use uuid::Uuid;

    fn notification(title: &str, badge: Option<i64>) -> PushNotification {
        PushNotification {
            title: title.to_string(),
            body: "You have used 85% of your Travel budget".to_string(),
            data: PushData {
                notification_id: Uuid::new_v4(),
                notification_type: NotificationType::BudgetAlert,
            },
            badge,
        }
    }

    #[tokio::test]
    async fn spool_appends_one_line_per_alert() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("push.jsonl");
        let service = SpoolPushService::new(&path);

        service
            .schedule_local(notification("Budget Warning", Some(3)))
            .await
            .unwrap();
        service
            .schedule_local(notification("Budget Exceeded", None))
            .await
            .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<PushNotification> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].title, "Budget Warning");
        assert_eq!(lines[0].badge, Some(3));
        assert_eq!(lines[1].title, "Budget Exceeded");
        assert!(contents.contains("\"BUDGET_ALERT\""));
    }

    #[tokio::test]
    async fn spool_reports_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let service = SpoolPushService::new(dir.path().join("missing").join("push.jsonl"));

        let result = service
            .schedule_local(notification("Budget Warning", None))
            .await;
        assert!(matches!(result, Err(PushError::Delivery(_))));
    }
}
