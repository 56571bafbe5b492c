use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::warn;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::dispatcher::{BudgetSource, NotificationStore};
use crate::errors::StoreError;
use crate::models::{Budget, NotificationEvent, NotificationRecord};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[derive(Clone)]
pub struct PgNotificationStore {
    pool: PgPool,
}

impl PgNotificationStore {
    pub fn new(pool: PgPool) -> Self {
        PgNotificationStore { pool }
    }

    pub async fn seed(&self) -> anyhow::Result<()> {
        let budgets = vec![
            Budget {
                id: "seed-groceries".to_string(),
                user_id: Some("avery".to_string()),
                name: "Groceries".to_string(),
                total: dec!(600),
                spent: dec!(512.4),
            },
            Budget {
                id: "seed-dining".to_string(),
                user_id: Some("avery".to_string()),
                name: "Dining Out".to_string(),
                total: dec!(250),
                spent: dec!(301.15),
            },
            Budget {
                id: "seed-transport".to_string(),
                user_id: Some("jules".to_string()),
                name: "Transport".to_string(),
                total: dec!(180),
                spent: dec!(42),
            },
            Budget {
                id: "seed-household".to_string(),
                user_id: Some("jules".to_string()),
                name: "Household".to_string(),
                total: dec!(10000),
                spent: dec!(9900),
            },
        ];

        for budget in budgets.iter() {
            self.upsert_budget(budget).await?;
        }

        Ok(())
    }

    pub async fn upsert_budget(&self, budget: &Budget) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO budget_alerts.budgets (id, user_id, name, total, spent, updated_at)
            VALUES ($1, $2, $3, $4, $5, now())
            ON CONFLICT (id) DO UPDATE
            SET user_id = EXCLUDED.user_id,
                name = EXCLUDED.name,
                total = EXCLUDED.total,
                spent = EXCLUDED.spent,
                updated_at = now()
            "#,
        )
        .bind(&budget.id)
        .bind(&budget.user_id)
        .bind(&budget.name)
        .bind(budget.total)
        .bind(budget.spent)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn import_csv(&self, csv_path: &Path) -> anyhow::Result<usize> {
        let budgets = read_budgets_csv(csv_path)?;
        let mut upserted = 0usize;

        for budget in budgets.iter() {
            if self.upsert_budget(budget).await? > 0 {
                upserted += 1;
            }
        }

        Ok(upserted)
    }

    pub async fn fetch_budgets(&self, user_id: Option<&str>) -> Result<Vec<Budget>, StoreError> {
        let mut query = String::from(
            "SELECT id, user_id, name, total, spent \
             FROM budget_alerts.budgets",
        );
        if user_id.is_some() {
            query.push_str(" WHERE user_id = $1");
        }
        query.push_str(" ORDER BY id");

        let mut rows = sqlx::query(&query);
        if let Some(value) = user_id {
            rows = rows.bind(value);
        }

        let records = rows.fetch_all(&self.pool).await?;
        let mut budgets = Vec::with_capacity(records.len());

        for row in records {
            budgets.push(Budget {
                id: row.try_get("id")?,
                user_id: row.try_get("user_id")?,
                name: row.try_get("name")?,
                total: row.try_get("total")?,
                spent: row.try_get("spent")?,
            });
        }

        Ok(budgets)
    }

    pub async fn list_notifications(
        &self,
        user_id: Option<&str>,
        unread_only: bool,
        limit: i64,
    ) -> Result<Vec<NotificationRecord>, StoreError> {
        let mut query = String::from(
            "SELECT id, user_id, budget_id, title, body, description, \
             notification_type, priority, is_read, created_at \
             FROM budget_alerts.notifications \
             WHERE ($1::TEXT IS NULL OR user_id = $1)",
        );
        if unread_only {
            query.push_str(" AND NOT is_read");
        }
        query.push_str(" ORDER BY created_at DESC LIMIT $2");

        let rows = sqlx::query(&query)
            .bind(user_id)
            .bind(limit.max(1))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(notification_from_row).collect()
    }
}

pub struct UserBudgets {
    pub store: PgNotificationStore,
    pub user_id: Option<String>,
}

#[async_trait]
impl BudgetSource for UserBudgets {
    async fn budgets(&self) -> Result<Vec<Budget>, StoreError> {
        self.store.fetch_budgets(self.user_id.as_deref()).await
    }
}

#[async_trait]
impl NotificationStore for PgNotificationStore {
    async fn create(&self, event: &NotificationEvent) -> Result<NotificationRecord, StoreError> {
        let id = Uuid::new_v4();
        let created_at: DateTime<Utc> = sqlx::query(
            r#"
            INSERT INTO budget_alerts.notifications
            (id, user_id, budget_id, title, body, description, notification_type, priority)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING created_at
            "#,
        )
        .bind(id)
        .bind(&event.user_id)
        .bind(&event.budget_id)
        .bind(&event.title)
        .bind(&event.body)
        .bind(&event.description)
        .bind(event.notification_type.as_str())
        .bind(event.priority.as_str())
        .fetch_one(&self.pool)
        .await?
        .try_get("created_at")?;

        Ok(NotificationRecord::from_event(id, event, created_at))
    }

    async fn unread_count_for_user(&self, user_id: &str) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query(
            "SELECT COUNT(*) AS unread FROM budget_alerts.notifications \
             WHERE user_id = $1 AND NOT is_read",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?
        .try_get("unread")?;

        Ok(count)
    }
}

fn notification_from_row(row: &PgRow) -> Result<NotificationRecord, StoreError> {
    let notification_type: String = row.try_get("notification_type")?;
    let priority: String = row.try_get("priority")?;

    Ok(NotificationRecord {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        body: row.try_get("body")?,
        description: row.try_get("description")?,
        notification_type: notification_type.parse().map_err(StoreError::Validation)?,
        priority: priority.parse().map_err(StoreError::Validation)?,
        user_id: row.try_get("user_id")?,
        budget_id: row.try_get("budget_id")?,
        is_read: row.try_get("is_read")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Reads budgets from a CSV with `id,user_id,name,total,spent` columns.
/// Rows with NaN or infinite amounts are skipped.
pub fn read_budgets_csv(csv_path: &Path) -> anyhow::Result<Vec<Budget>> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        id: String,
        user_id: Option<String>,
        name: String,
        total: String,
        spent: String,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut budgets = Vec::new();

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let (Some(total), Some(spent)) = (parse_amount(&row.total)?, parse_amount(&row.spent)?)
        else {
            warn!("Skipping budget {} with a non-finite amount", row.id);
            continue;
        };

        budgets.push(Budget {
            id: row.id,
            user_id: row.user_id.filter(|value| !value.trim().is_empty()),
            name: row.name,
            total,
            spent,
        });
    }

    Ok(budgets)
}

fn parse_amount(value: &str) -> anyhow::Result<Option<Decimal>> {
    let value = value.trim();
    if let Ok(amount) = Decimal::from_str(value) {
        return Ok(Some(amount));
    }
    match value.parse::<f64>() {
        Ok(float) if !float.is_finite() => Ok(None),
        _ => Decimal::from_scientific(value)
            .map(Some)
            .with_context(|| format!("invalid amount '{value}'")),
    }
}
