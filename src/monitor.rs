use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use log::{error, info, warn};

use crate::dispatcher::{BudgetSource, NotificationDispatcher, NotificationStore};
use crate::errors::StoreError;
use crate::evaluator;
use crate::models::{Budget, BudgetState, NotificationRecord};

#[derive(Debug, Clone, Default)]
pub struct UnreadBadge {
    count: Arc<AtomicI64>,
}

impl UnreadBadge {
    pub fn get(&self) -> i64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn set(&self, count: i64) {
        self.count.store(count, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepeatPolicy {
    #[default]
    EveryEvaluation,
    /// Notify only when a budget moves into a different band.
    OnTransition,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub evaluated: usize,
    pub notified: usize,
    pub failed: usize,
}

pub struct BudgetMonitor {
    dispatcher: NotificationDispatcher,
    store: Arc<dyn NotificationStore>,
    policy: RepeatPolicy,
    badge: UnreadBadge,
    badge_user: Option<String>,
    last_notified: HashMap<String, BudgetState>,
}

impl BudgetMonitor {
    pub fn new(
        dispatcher: NotificationDispatcher,
        store: Arc<dyn NotificationStore>,
        policy: RepeatPolicy,
    ) -> Self {
        BudgetMonitor {
            dispatcher,
            store,
            policy,
            badge: UnreadBadge::default(),
            badge_user: None,
            last_notified: HashMap::new(),
        }
    }

    pub fn with_badge_user(mut self, user_id: impl Into<String>) -> Self {
        self.badge_user = Some(user_id.into());
        self
    }

    pub fn badge(&self) -> UnreadBadge {
        self.badge.clone()
    }

    pub async fn on_budget_update(
        &mut self,
        budget: &Budget,
    ) -> Result<Option<NotificationRecord>, StoreError> {
        let state = evaluator::budget_state(budget);

        if self.policy == RepeatPolicy::OnTransition {
            if state == BudgetState::WithinLimit {
                self.last_notified.remove(&budget.id);
            } else if self.last_notified.get(&budget.id) == Some(&state) {
                return Ok(None);
            }
        }

        let Some(event) = evaluator::evaluate(budget) else {
            return Ok(None);
        };

        let record = self.dispatcher.dispatch(event).await?;
        if self.policy == RepeatPolicy::OnTransition {
            self.last_notified.insert(budget.id.clone(), state);
        }
        self.refresh_badge(record.user_id.as_deref()).await;

        Ok(Some(record))
    }

    pub async fn sweep(&mut self, source: &dyn BudgetSource) -> Result<SweepSummary, StoreError> {
        let budgets = source.budgets().await?;
        let mut summary = SweepSummary::default();

        for budget in budgets.iter() {
            summary.evaluated += 1;
            match self.on_budget_update(budget).await {
                Ok(Some(record)) => {
                    summary.notified += 1;
                    info!(
                        "{} for budget {} ({})",
                        record.title, budget.id, record.priority
                    );
                }
                Ok(None) => {}
                Err(err) => {
                    summary.failed += 1;
                    error!("Failed to notify for budget {}: {}", budget.id, err);
                }
            }
        }

        Ok(summary)
    }

    // A failed load is logged and skipped so a long-running poller keeps going.
    pub async fn poll(&mut self, source: &dyn BudgetSource) -> Option<SweepSummary> {
        match self.sweep(source).await {
            Ok(summary) => Some(summary),
            Err(err) => {
                error!("Budget sweep skipped: {}", err);
                None
            }
        }
    }

    async fn refresh_badge(&self, user_id: Option<&str>) {
        let Some(tracked) = self.badge_user.as_deref() else {
            return;
        };
        if user_id != Some(tracked) {
            return;
        }

        match self.store.unread_count_for_user(tracked).await {
            Ok(count) => self.badge.set(count),
            Err(err) => warn!("Could not refresh unread badge for {}: {}", tracked, err),
        }
    }
}
