use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub id: String,
    pub user_id: Option<String>,
    pub name: String,
    pub total: Decimal,
    pub spent: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    BudgetAlert,
    Transaction,
    System,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::BudgetAlert => "BUDGET_ALERT",
            NotificationType::Transaction => "TRANSACTION",
            NotificationType::System => "SYSTEM",
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "BUDGET_ALERT" => Ok(NotificationType::BudgetAlert),
            "TRANSACTION" => Ok(NotificationType::Transaction),
            "SYSTEM" => Ok(NotificationType::System),
            other => Err(format!("unknown notification type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Low,
    Normal,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Normal => "NORMAL",
            Priority::High => "HIGH",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "LOW" => Ok(Priority::Low),
            "NORMAL" => Ok(Priority::Normal),
            "HIGH" => Ok(Priority::High),
            other => Err(format!("unknown priority '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BudgetState {
    WithinLimit,
    NearLimit,
    OverBudget,
}

impl BudgetState {
    pub fn label(&self) -> &'static str {
        match self {
            BudgetState::WithinLimit => "within limit",
            BudgetState::NearLimit => "near limit",
            BudgetState::OverBudget => "over budget",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub title: String,
    pub body: String,
    pub description: String,
    pub notification_type: NotificationType,
    pub priority: Priority,
    pub user_id: Option<String>,
    pub budget_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub description: String,
    pub notification_type: NotificationType,
    pub priority: Priority,
    pub user_id: Option<String>,
    pub budget_id: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl NotificationRecord {
    pub fn from_event(id: Uuid, event: &NotificationEvent, created_at: DateTime<Utc>) -> Self {
        NotificationRecord {
            id,
            title: event.title.clone(),
            body: event.body.clone(),
            description: event.description.clone(),
            notification_type: event.notification_type,
            priority: event.priority,
            user_id: event.user_id.clone(),
            budget_id: event.budget_id.clone(),
            is_read: false,
            created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushData {
    pub notification_id: Uuid,
    pub notification_type: NotificationType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushNotification {
    pub title: String,
    pub body: String,
    pub data: PushData,
    pub badge: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct BudgetStateSummary {
    pub state: BudgetState,
    pub count: usize,
    pub total_spent: Decimal,
}
